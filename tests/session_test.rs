use chrono::{Duration, Utc};
use unimate_lib::database::{Role, User};
use unimate_lib::session::{FileSessionStore, MemorySessionStore, Page, PersistedSession, SessionStore, Shell, SESSION_TTL_MS};

fn user() -> User {
    User {
        user_id: 11,
        name: "Reem Yousif".to_string(),
        email: "reem@uni.edu".to_string(),
        password: String::new(),
        role: Role::Student,
        created_at: Utc::now(),
        year: 3,
        department: "General Departments".to_string(),
    }
}

fn stored_at(timestamp: i64) -> MemorySessionStore {
    MemorySessionStore::with_session(PersistedSession { user: user(), timestamp })
}

#[test]
fn ttl_is_seven_days_in_milliseconds() {
    assert_eq!(SESSION_TTL_MS, 7 * 24 * 60 * 60 * 1000);
}

#[test]
fn fresh_session_restores_to_home() {
    let now = Utc::now().timestamp_millis();
    let store = stored_at(now - Duration::days(6).num_milliseconds());
    let mut shell = Shell::new(&store);

    let restored = shell.restore_at(now).map(|u| u.email.clone());
    assert_eq!(restored.as_deref(), Some("reem@uni.edu"));
    assert_eq!(shell.page(), &Page::Home);
}

#[test]
fn session_older_than_seven_days_forces_login() {
    let now = Utc::now().timestamp_millis();
    let store = stored_at(now - SESSION_TTL_MS - 1);
    let mut shell = Shell::new(&store);

    assert!(shell.restore_at(now).is_none());
    assert_eq!(shell.page(), &Page::Login);
    assert!(store.load().unwrap().is_none());
    assert_eq!(shell.navigate(Page::Dashboard), &Page::Login);
}

#[test]
fn session_exactly_at_ttl_is_still_valid() {
    let now = 1_700_000_000_000;
    let store = stored_at(now - SESSION_TTL_MS);
    let mut shell = Shell::new(&store);
    assert!(shell.restore_at(now).is_some());
}

#[test]
fn empty_store_starts_on_login() {
    let mut shell = Shell::new(MemorySessionStore::new());
    assert!(shell.restore().is_none());
    assert_eq!(shell.page(), &Page::Login);
}

#[test]
fn sign_in_then_restart_restores_the_user() {
    let store = MemorySessionStore::new();
    {
        let mut shell = Shell::new(&store);
        shell.sign_in(user()).unwrap();
        shell.navigate(Page::Courses);
    }

    let mut restarted = Shell::new(&store);
    assert_eq!(restarted.restore().map(|u| u.user_id), Some(11));
    assert_eq!(restarted.page(), &Page::Home);

    restarted.sign_out().unwrap();
    assert!(store.load().unwrap().is_none());
}

#[test]
fn unreadable_session_file_is_cleared_and_forces_login() {
    let path = std::env::temp_dir().join(format!("unimate_session_corrupt_{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, "{not json").unwrap();
    let store = FileSessionStore::new(&path);
    let mut shell = Shell::new(&store);

    assert!(shell.restore_at(Utc::now().timestamp_millis()).is_none());
    assert_eq!(shell.page(), &Page::Login);
    assert!(!path.exists());
}
