use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::database::{DatabaseError, NewUser, Role, User, UserStore, UserUpdate};

pub const DEFAULT_YEAR: i32 = 1;
pub const DEFAULT_DEPARTMENT: &str = "IT";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Please fill in all fields")]
    MissingLoginFields,
    #[error("Please fill in all required fields")]
    MissingRegistrationFields,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already exists")]
    EmailTaken,
    #[error("Nothing to update")]
    EmptyUpdate,
    #[error("Request failed: {0}")]
    Database(#[from] DatabaseError),
}

impl AuthError {
    /// Validation failures are caught before any remote call is made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AuthError::MissingLoginFields
                | AuthError::MissingRegistrationFields
                | AuthError::InvalidEmail
                | AuthError::EmptyUpdate
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub year: Option<i32>,
    pub department: Option<String>,
}

impl RegistrationForm {
    fn missing_required(&self) -> bool {
        [&self.first_name, &self.last_name, &self.email, &self.password]
            .iter()
            .any(|field| field.trim().is_empty())
    }

    fn into_new_user(self) -> NewUser {
        NewUser {
            name: format!("{} {}", self.first_name.trim(), self.last_name.trim()),
            email: self.email.trim().to_string(),
            password: self.password,
            role: Role::Student,
            year: self.year.unwrap_or(DEFAULT_YEAR),
            department: self
                .department
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
        }
    }
}

/// Login, registration and profile operations over a [`UserStore`].
pub struct AuthService<S> {
    store: S,
}

impl<S: UserStore> AuthService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// A wrong password and an unknown email fail identically.
    pub async fn login(&self, form: &LoginForm) -> Result<User, AuthError> {
        if form.email.trim().is_empty() || form.password.is_empty() {
            return Err(AuthError::MissingLoginFields);
        }

        match self.store.find_user_by_credentials(form.email.trim(), &form.password).await {
            Ok(Some(user)) => {
                info!("✅ {} signed in", user.email);
                Ok(user)
            }
            Ok(None) => {
                warn!("Rejected sign-in attempt");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                error!("Login error: {}", e);
                Err(AuthError::Database(e))
            }
        }
    }

    pub async fn register(&self, form: RegistrationForm) -> Result<User, AuthError> {
        if form.missing_required() {
            return Err(AuthError::MissingRegistrationFields);
        }
        form.validate().map_err(|_| AuthError::InvalidEmail)?;

        if self.store.email_exists(form.email.trim()).await? {
            return Err(AuthError::EmailTaken);
        }

        let user = self.store.insert_user(&form.into_new_user()).await.map_err(|e| {
            error!("Registration error: {}", e);
            AuthError::Database(e)
        })?;

        info!("✅ Registered {} (year {}, {})", user.email, user.year, user.department);
        Ok(user)
    }

    pub async fn update_profile(&self, user_id: i64, update: &UserUpdate) -> Result<User, AuthError> {
        if update.is_empty() {
            return Err(AuthError::EmptyUpdate);
        }
        Ok(self.store.update_user(user_id, update).await?)
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_id(user_id).await?)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.store.email_exists(email.trim()).await?)
    }
}
