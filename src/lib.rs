use log::{info, warn};

pub mod auth;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod database;
pub mod json_extract;
pub mod lectures;
pub mod quiz;
pub mod session;
pub mod storage;
pub mod viewer;
pub mod webhook;

use crate::config::AppConfig;

/// Starts `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}

fn preview_secret(secret: &str) -> String {
    let chars = secret.chars().collect::<Vec<_>>();
    if chars.len() > 8 {
        let head = chars[..4].iter().collect::<String>();
        let tail = chars[chars.len() - 4..].iter().collect::<String>();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

/// Reports which backends are configured, without printing secrets.
pub fn log_environment_status(config: &AppConfig) {
    info!("🔧 UniMate configuration status:");

    let db = &config.database;
    info!("✅ Database: {}@{}:{}/{}", db.user, db.host, db.port, db.name);
    if db.password.is_empty() {
        warn!("❌ Database password: not set");
    }

    info!("✅ Storage: {} (bucket '{}')", config.storage.url, config.storage.bucket);
    if config.storage.api_key.is_empty() {
        warn!("❌ Storage API key: not set");
    } else {
        let key = &config.storage.api_key;
        info!("✅ Storage API key: {} (length: {})", preview_secret(key), key.len());
    }

    info!("✅ AI webhook: {}", config.webhook.url);
    match config.webhook.timeout_secs {
        Some(secs) => info!("⏱️ AI webhook timeout: {}s", secs),
        None => info!("⏱️ AI webhook timeout: transport default"),
    }

    info!("💾 Session file: {}", config.session.path);
    info!("📝 Quiz: {}s for '{}'", config.quiz.duration_secs, config.quiz.subject);

    warn!("⚠️ Passwords are stored and compared in plaintext by the hosted user table");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        assert_eq!(preview_secret("short"), "***");
        assert_eq!(preview_secret("abcd1234efgh5678"), "abcd...5678");
        assert_eq!(preview_secret("aключ-секрет-1234"), "aклю...1234");
        assert_eq!(preview_secret("ключключ"), "***");
    }
}
