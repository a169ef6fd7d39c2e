mod common;

use common::MemoryUserStore;
use unimate_lib::auth::{AuthError, AuthService, LoginForm, RegistrationForm};
use unimate_lib::database::UserUpdate;

fn login_form(email: &str, password: &str) -> LoginForm {
    LoginForm {
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn registration(email: &str) -> RegistrationForm {
    RegistrationForm {
        first_name: "Mona".to_string(),
        last_name: "Ibrahim".to_string(),
        email: email.to_string(),
        password: "hunter2".to_string(),
        year: None,
        department: None,
    }
}

#[tokio::test]
async fn correct_credentials_return_the_user() {
    let auth = AuthService::new(MemoryUserStore::new().with_user("ali@uni.edu", "pw123"));
    let user = auth.login(&login_form("ali@uni.edu", "pw123")).await.unwrap();
    assert_eq!(user.email, "ali@uni.edu");
}

#[tokio::test]
async fn wrong_password_and_unknown_email_fail_identically() {
    let auth = AuthService::new(MemoryUserStore::new().with_user("ali@uni.edu", "pw123"));

    let wrong_password = auth.login(&login_form("ali@uni.edu", "nope")).await.unwrap_err();
    let unknown_email = auth.login(&login_form("ghost@uni.edu", "pw123")).await.unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(wrong_password.to_string(), "Invalid email or password");
}

#[tokio::test]
async fn missing_fields_never_reach_the_store() {
    let auth = AuthService::new(MemoryUserStore::new());

    let err = auth.login(&login_form("", "pw")).await.unwrap_err();
    assert!(err.is_validation());

    let mut form = registration("new@uni.edu");
    form.first_name.clear();
    let err = auth.register(form).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingRegistrationFields));

    let err = auth.register(registration("not-an-email")).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidEmail));

    assert_eq!(auth.store().lookups(), 0);
}

#[tokio::test]
async fn registration_applies_defaults_and_rejects_duplicates() {
    let auth = AuthService::new(MemoryUserStore::new());

    let user = auth.register(registration("mona@uni.edu")).await.unwrap();
    assert_eq!(user.name, "Mona Ibrahim");
    assert_eq!(user.year, 1);
    assert_eq!(user.department, "IT");
    assert_eq!(user.role.as_str(), "student");
    assert!(auth.email_exists("mona@uni.edu").await.unwrap());

    let err = auth.register(registration("mona@uni.edu")).await.unwrap_err();
    assert!(matches!(err, AuthError::EmailTaken));
    assert_eq!(err.to_string(), "Email already exists");

    let logged_in = auth.login(&login_form("mona@uni.edu", "hunter2")).await.unwrap();
    assert_eq!(logged_in.user_id, user.user_id);
}

#[tokio::test]
async fn profile_updates_return_the_new_row() {
    let auth = AuthService::new(MemoryUserStore::new().with_user("ali@uni.edu", "pw123"));

    let update = UserUpdate {
        year: Some(4),
        department: Some("CS & Math".to_string()),
        ..UserUpdate::default()
    };
    let updated = auth.update_profile(1, &update).await.unwrap();
    assert_eq!(updated.year, 4);
    assert_eq!(updated.department, "CS & Math");
    assert_eq!(updated.email, "ali@uni.edu");

    let fetched = auth.get_user_by_id(1).await.unwrap().unwrap();
    assert_eq!(fetched.year, 4);
    assert!(auth.get_user_by_id(99).await.unwrap().is_none());

    assert!(matches!(
        auth.update_profile(1, &UserUpdate::default()).await,
        Err(AuthError::EmptyUpdate)
    ));
    assert!(matches!(auth.update_profile(42, &update).await, Err(AuthError::Database(_))));
}
