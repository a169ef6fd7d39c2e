pub mod postgres;
pub mod models;

pub use postgres::DatabaseManager;
pub use models::{Course, Lesson, NewUser, Progress, ProgressStatus, Role, User, UserUpdate};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Unexpected column value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Row-level access to the `users` table. Every call is a single attempt.
#[allow(async_fn_in_trait)]
pub trait UserStore {
    /// The user row whose email and stored password both match.
    async fn find_user_by_credentials(&self, email: &str, password: &str) -> Result<Option<User>>;
    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
    async fn insert_user(&self, user: &NewUser) -> Result<User>;
    async fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<User>;
}
