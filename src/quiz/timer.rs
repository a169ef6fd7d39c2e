use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_QUIZ_DURATION_SECS: u32 = 900;
pub const WARNING_THRESHOLD_SECS: u32 = 60;
pub const CRITICAL_THRESHOLD_SECS: u32 = 30;
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Visual urgency of the countdown. Presentation only.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerLevel {
    Normal,
    Warning,
    Critical,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Counting down; seconds left after this tick.
    Running { remaining: u32 },
    /// This tick reached zero. Reported exactly once per timer.
    Expired,
    /// Nothing to count: the timer already expired or no quiz is running.
    Idle,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TimerState {
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub elapsed_seconds: u32,
    pub level: TimerLevel,
    pub expired: bool,
    pub display: String,
}

/// Tick-driven countdown for one quiz attempt. The owner feeds it one tick per
/// second; it never schedules anything itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizTimer {
    duration: u32,
    remaining: u32,
    expired: bool,
}

impl QuizTimer {
    pub fn new(duration_seconds: u32) -> Self {
        info!("⏱️ Quiz timer armed for {}s", duration_seconds);
        Self {
            duration: duration_seconds,
            remaining: duration_seconds,
            expired: false,
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.expired {
            return TickOutcome::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            warn!("⏰ Quiz time is up after {}s", self.duration);
            return TickOutcome::Expired;
        }

        TickOutcome::Running { remaining: self.remaining }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn level(&self) -> TimerLevel {
        if self.remaining <= CRITICAL_THRESHOLD_SECS {
            TimerLevel::Critical
        } else if self.remaining <= WARNING_THRESHOLD_SECS {
            TimerLevel::Warning
        } else {
            TimerLevel::Normal
        }
    }

    /// `MM:SS` rendering of the remaining time.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }

    pub fn get_current_state(&self) -> TimerState {
        TimerState {
            duration_seconds: self.duration,
            remaining_seconds: self.remaining,
            elapsed_seconds: self.duration - self.remaining,
            level: self.level(),
            expired: self.expired,
            display: self.display(),
        }
    }
}
