use std::fmt;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    normalize_questions, AnswerSheet, AnswerValue, GradingResult, Question, QuestionType, QuizTimer,
    ReviewItem, TickOutcome, DEFAULT_QUIZ_DURATION_SECS,
};
use crate::json_extract::{self, ExtractError};
use crate::webhook::{AssistantGateway, AssistantRequest, GatewayError};

pub const DEFAULT_QUESTION_COUNT: u32 = 10;
pub const MAX_QUESTION_COUNT: u32 = 50;

pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate quiz. Please try again.";
pub const GRADING_FAILED_MESSAGE: &str = "Failed to grade quiz. Please try again.";
pub const NO_TYPES_MESSAGE: &str = "Select at least one question type.";

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("At least one question type must be enabled")]
    NoQuestionTypes,
    #[error("Cannot {action} while the quiz is in the {phase} phase")]
    InvalidTransition { phase: QuizPhase, action: &'static str },
    #[error("Question {index} does not exist (quiz has {count} questions)")]
    QuestionOutOfRange { index: usize, count: usize },
    #[error("Option {option} does not exist for question {index}")]
    OptionOutOfRange { index: usize, option: usize },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("AI response could not be parsed: {0}")]
    Extract(#[from] ExtractError),
    #[error("AI response was rejected: {0}")]
    InvalidPayload(String),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuestionTypeSet {
    pub multiple_choice: bool,
    pub true_false: bool,
    pub short_answer: bool,
}

impl Default for QuestionTypeSet {
    fn default() -> Self {
        Self { multiple_choice: true, true_false: false, short_answer: false }
    }
}

impl QuestionTypeSet {
    fn flag_mut(&mut self, question_type: QuestionType) -> &mut bool {
        match question_type {
            QuestionType::MultipleChoice => &mut self.multiple_choice,
            QuestionType::TrueFalse => &mut self.true_false,
            QuestionType::ShortAnswer => &mut self.short_answer,
        }
    }

    pub fn contains(&self, question_type: QuestionType) -> bool {
        match question_type {
            QuestionType::MultipleChoice => self.multiple_choice,
            QuestionType::TrueFalse => self.true_false,
            QuestionType::ShortAnswer => self.short_answer,
        }
    }

    pub fn toggle(&mut self, question_type: QuestionType) -> bool {
        let flag = self.flag_mut(question_type);
        *flag = !*flag;
        *flag
    }

    pub fn set(&mut self, question_type: QuestionType, enabled: bool) {
        *self.flag_mut(question_type) = enabled;
    }

    pub fn enabled(&self) -> Vec<QuestionType> {
        QuestionType::ALL.into_iter().filter(|t| self.contains(*t)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled().is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct QuizSettings {
    pub question_count: u32,
    pub difficulty: Difficulty,
    pub types: QuestionTypeSet,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_count: DEFAULT_QUESTION_COUNT,
            difficulty: Difficulty::default(),
            types: QuestionTypeSet::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizPhase {
    Config,
    Generating,
    Preview,
    Grading,
    Results,
}

impl fmt::Display for QuizPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuizPhase::Config => "config",
            QuizPhase::Generating => "generating",
            QuizPhase::Preview => "preview",
            QuizPhase::Grading => "grading",
            QuizPhase::Results => "results",
        };
        f.write_str(label)
    }
}

/// Questions, answers and countdown of the attempt in progress.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub questions: Vec<Question>,
    pub answers: AnswerSheet,
    pub timer: QuizTimer,
}

/// While a request is in flight the attempt lives in the pending future, so
/// `Generating` and `Grading` carry no data.
#[derive(Debug, Clone)]
enum QuizState {
    Config,
    Generating,
    Preview(Attempt),
    Grading,
    Results { attempt: Attempt, result: GradingResult },
}

impl QuizState {
    fn phase(&self) -> QuizPhase {
        match self {
            QuizState::Config => QuizPhase::Config,
            QuizState::Generating => QuizPhase::Generating,
            QuizState::Preview(_) => QuizPhase::Preview,
            QuizState::Grading => QuizPhase::Grading,
            QuizState::Results { .. } => QuizPhase::Results,
        }
    }
}

/// Drives one quiz at a time through
/// `config -> generating -> preview -> grading -> results`.
///
/// Failed generation returns to `config`; failed grading returns to
/// `preview` with the timer untouched. Dropping a `generate`/`submit` future
/// before it completes leaves the engine in its in-flight phase; `reset`
/// recovers from that.
pub struct QuizEngine<G> {
    gateway: G,
    subject: String,
    duration_secs: u32,
    settings: QuizSettings,
    state: QuizState,
    last_error: Option<String>,
}

impl<G: AssistantGateway> QuizEngine<G> {
    pub fn new(gateway: G, subject: impl Into<String>) -> Self {
        Self::with_duration(gateway, subject, DEFAULT_QUIZ_DURATION_SECS)
    }

    pub fn with_duration(gateway: G, subject: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            gateway,
            subject: subject.into(),
            duration_secs,
            settings: QuizSettings::default(),
            state: QuizState::Config,
            last_error: None,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn phase(&self) -> QuizPhase {
        self.state.phase()
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn attempt(&self) -> Option<&Attempt> {
        match &self.state {
            QuizState::Preview(attempt) | QuizState::Results { attempt, .. } => Some(attempt),
            _ => None,
        }
    }

    pub fn questions(&self) -> &[Question] {
        self.attempt().map(|a| a.questions.as_slice()).unwrap_or(&[])
    }

    pub fn answers(&self) -> Option<&AnswerSheet> {
        self.attempt().map(|a| &a.answers)
    }

    pub fn timer(&self) -> Option<&QuizTimer> {
        match &self.state {
            QuizState::Preview(attempt) => Some(&attempt.timer),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&GradingResult> {
        match &self.state {
            QuizState::Results { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn can_generate(&self) -> bool {
        self.phase() == QuizPhase::Config && !self.settings.types.is_empty()
    }

    fn require_config(&self, action: &'static str) -> Result<(), QuizError> {
        match self.phase() {
            QuizPhase::Config => Ok(()),
            phase => Err(QuizError::InvalidTransition { phase, action }),
        }
    }

    pub fn set_question_count(&mut self, count: u32) -> Result<u32, QuizError> {
        self.require_config("change the question count")?;
        self.settings.question_count = count.clamp(1, MAX_QUESTION_COUNT);
        Ok(self.settings.question_count)
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<(), QuizError> {
        self.require_config("change the difficulty")?;
        self.settings.difficulty = difficulty;
        Ok(())
    }

    pub fn toggle_type(&mut self, question_type: QuestionType) -> Result<bool, QuizError> {
        self.require_config("change question types")?;
        Ok(self.settings.types.toggle(question_type))
    }

    pub fn set_type(&mut self, question_type: QuestionType, enabled: bool) -> Result<(), QuizError> {
        self.require_config("change question types")?;
        self.settings.types.set(question_type, enabled);
        Ok(())
    }

    /// Asks the assistant for a quiz and enters `preview` with a fresh timer.
    pub async fn generate(&mut self) -> Result<(), QuizError> {
        self.require_config("generate a quiz")?;
        if self.settings.types.is_empty() {
            self.last_error = Some(NO_TYPES_MESSAGE.to_string());
            return Err(QuizError::NoQuestionTypes);
        }

        info!(
            "🎯 Generating {} {} questions for '{}'",
            self.settings.question_count, self.settings.difficulty, self.subject
        );
        self.last_error = None;
        self.state = QuizState::Generating;

        let prompt = build_generation_prompt(&self.subject, &self.settings);
        match self.request_questions(prompt).await {
            Ok(questions) => {
                info!("✅ Quiz ready with {} questions", questions.len());
                self.state = QuizState::Preview(Attempt {
                    questions,
                    answers: AnswerSheet::new(),
                    timer: QuizTimer::new(self.duration_secs),
                });
                Ok(())
            }
            Err(e) => {
                error!("Quiz generation failed: {}", e);
                self.last_error = Some(GENERATION_FAILED_MESSAGE.to_string());
                self.state = QuizState::Config;
                Err(e)
            }
        }
    }

    async fn request_questions(&self, prompt: String) -> Result<Vec<Question>, QuizError> {
        let reply = self.gateway.send(AssistantRequest::GenerateQuiz { prompt }).await?;
        let questions: Vec<Question> = json_extract::extract_array(&reply.text)?;
        let questions = normalize_questions(questions).map_err(QuizError::InvalidPayload)?;

        let stray = questions
            .iter()
            .filter(|q| !self.settings.types.contains(q.question_type))
            .count();
        if stray > 0 {
            warn!("{} generated questions use a type that was not requested", stray);
        }
        Ok(questions)
    }

    pub fn record_answer(&mut self, question_index: usize, value: AnswerValue) -> Result<(), QuizError> {
        let attempt = match &mut self.state {
            QuizState::Preview(attempt) => attempt,
            other => {
                return Err(QuizError::InvalidTransition { phase: other.phase(), action: "record an answer" })
            }
        };

        let count = attempt.questions.len();
        let question = attempt
            .questions
            .get(question_index)
            .ok_or(QuizError::QuestionOutOfRange { index: question_index, count })?;

        if let AnswerValue::Choice(option) = value {
            if !question.has_options() || option >= question.options.len() {
                return Err(QuizError::OptionOutOfRange { index: question_index, option });
            }
        }

        attempt.answers.record(question_index, value);
        Ok(())
    }

    /// Advances the countdown by one second. The tick that reaches zero
    /// submits the quiz; every later tick is a no-op.
    pub async fn tick(&mut self) -> Result<TickOutcome, QuizError> {
        let outcome = match &mut self.state {
            QuizState::Preview(attempt) => attempt.timer.tick(),
            _ => return Ok(TickOutcome::Idle),
        };

        if outcome == TickOutcome::Expired {
            info!("⏰ Auto-submitting quiz for '{}'", self.subject);
            self.submit().await?;
        }
        Ok(outcome)
    }

    /// Sends every question, its canonical answer and the recorded answer
    /// for grading and enters `results`.
    pub async fn submit(&mut self) -> Result<(), QuizError> {
        let attempt = match std::mem::replace(&mut self.state, QuizState::Grading) {
            QuizState::Preview(attempt) => attempt,
            other => {
                let phase = other.phase();
                self.state = other;
                return Err(QuizError::InvalidTransition { phase, action: "submit" });
            }
        };

        info!(
            "📝 Submitting {}/{} answers for grading",
            attempt.answers.len(),
            attempt.questions.len()
        );
        self.last_error = None;

        let prompt = build_grading_prompt(&self.subject, &attempt);
        match self.request_grading(prompt).await {
            Ok(result) => {
                info!("✅ Quiz graded: {}% ({})", result.score, result.grade);
                self.state = QuizState::Results { attempt, result };
                Ok(())
            }
            Err(e) => {
                error!("Quiz grading failed: {}", e);
                self.last_error = Some(GRADING_FAILED_MESSAGE.to_string());
                self.state = QuizState::Preview(attempt);
                Err(e)
            }
        }
    }

    async fn request_grading(&self, prompt: String) -> Result<GradingResult, QuizError> {
        let reply = self.gateway.send(AssistantRequest::GradeQuiz { prompt }).await?;
        let result: GradingResult = json_extract::extract_object(&reply.text)?;
        result.validate().map_err(QuizError::InvalidPayload)?;
        Ok(result)
    }

    /// Submitted answers next to the grader's verdicts. Empty outside `results`.
    pub fn review(&self) -> Vec<ReviewItem> {
        let QuizState::Results { attempt, result } = &self.state else {
            return Vec::new();
        };

        attempt
            .questions
            .iter()
            .enumerate()
            .map(|(idx, question)| {
                let verdict = result.result_for(idx, question);
                ReviewItem {
                    question: question.question.clone(),
                    your_answer: attempt.answers.label_for(idx, question),
                    correct_answer: question.correct_answer_label(),
                    is_correct: verdict.map(|v| v.is_correct),
                    feedback: verdict.map(|v| v.feedback.clone()).unwrap_or_default(),
                }
            })
            .collect()
    }

    /// Discards the current attempt and returns to `config`. Settings are kept.
    pub fn reset(&mut self) {
        if self.phase() != QuizPhase::Config {
            info!("🔄 Starting a new quiz for '{}'", self.subject);
        }
        self.state = QuizState::Config;
        self.last_error = None;
    }
}

pub fn build_generation_prompt(subject: &str, settings: &QuizSettings) -> String {
    let types = settings
        .types
        .enabled()
        .iter()
        .map(|t| format!("\"{}\" ({})", t.as_str(), t.label()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Generate a quiz of exactly {count} questions for the university subject \"{subject}\".
Difficulty: {difficulty}.
Allowed question types: {types}.

Return ONLY a JSON array. Each element must be an object with these fields:
- \"id\": question number starting at 1
- \"question\": the question text
- \"type\": one of the allowed question types
- \"options\": array of answer options (4 options for multiple-choice, [\"True\", \"False\"] for true-false, empty for short-answer)
- \"correctAnswer\": the 0-based index of the correct option, or the expected answer text for short-answer

Do not add explanations before or after the array.",
        count = settings.question_count,
        subject = subject,
        difficulty = settings.difficulty,
        types = types,
    )
}

pub fn build_grading_prompt(subject: &str, attempt: &Attempt) -> String {
    let mut prompt = format!(
        "Grade this quiz for the university subject \"{}\". Be fair with short answers that are correct in meaning.\n\n",
        subject
    );

    for (idx, question) in attempt.questions.iter().enumerate() {
        prompt.push_str(&format!("Question {} (id {}, {}): {}\n", idx + 1, question.id, question.question_type, question.question));
        if question.has_options() {
            for (opt_idx, option) in question.options.iter().enumerate() {
                prompt.push_str(&format!("  {}. {}\n", opt_idx, option));
            }
        }
        prompt.push_str(&format!("Correct answer: {}\n", question.correct_answer_label()));
        prompt.push_str(&format!("Student answer: {}\n\n", attempt.answers.label_for(idx, question)));
    }

    prompt.push_str(
        "Return ONLY a JSON object with these fields:
- \"totalQuestions\": number of questions
- \"correctAnswers\": number answered correctly
- \"score\": percentage from 0 to 100
- \"grade\": letter grade (A, B, C, D or F)
- \"feedback\": overall feedback for the student
- \"questionResults\": array of {\"questionId\": id, \"isCorrect\": true/false, \"feedback\": short explanation}",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_set_toggles_and_reports_empty() {
        let mut types = QuestionTypeSet::default();
        assert_eq!(types.enabled(), vec![QuestionType::MultipleChoice]);
        assert!(!types.toggle(QuestionType::MultipleChoice));
        assert!(types.is_empty());
        assert!(types.toggle(QuestionType::ShortAnswer));
        assert_eq!(types.enabled(), vec![QuestionType::ShortAnswer]);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn generation_prompt_embeds_configuration() {
        let mut settings = QuizSettings::default();
        settings.question_count = 7;
        settings.difficulty = Difficulty::Hard;
        settings.types.set(QuestionType::TrueFalse, true);
        let prompt = build_generation_prompt("Compiler", &settings);
        assert!(prompt.contains("exactly 7 questions"));
        assert!(prompt.contains("\"Compiler\""));
        assert!(prompt.contains("Difficulty: Hard"));
        assert!(prompt.contains("\"multiple-choice\""));
        assert!(prompt.contains("\"true-false\""));
        assert!(!prompt.contains("\"short-answer\" ("));
    }
}
