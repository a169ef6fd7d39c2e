use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use log::{error, info};
use tokio_postgres::{NoTls, Row};

use super::models::*;
use super::{DatabaseError, Result, UserStore};
use crate::config::DatabaseConfig;

const USER_COLUMNS: &str = "user_id, name, email, password, role, created_at, year, department";

#[derive(Debug)]
pub struct DatabaseManager {
    pool: Pool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database: {}@{}:{}/{}", config.user, config.host, config.port, config.name);

        let mut cfg = Config::new();
        cfg.url = Some(config.connection_url());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Pool creation failed: {}", e)))?;

        let _client = pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Connection test failed: {}", e)))?;

        info!("Database connection established successfully");

        Ok(DatabaseManager { pool })
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        let client = self.client().await?;

        let rows = client
            .query(
                r#"
                SELECT course_id, title, description, created_by, created_at
                FROM courses
                ORDER BY title
                "#,
                &[],
            )
            .await
            .map_err(|e| {
                error!("Failed to list courses: {}", e);
                DatabaseError::QueryFailed(format!("Failed to list courses: {}", e))
            })?;

        rows.iter().map(course_from_row).collect()
    }

    pub async fn create_course(&self, title: &str, description: Option<&str>, created_by: i64) -> Result<Course> {
        let client = self.client().await?;

        let row = client
            .query_one(
                r#"
                INSERT INTO courses (title, description, created_by)
                VALUES ($1, $2, $3)
                RETURNING course_id, title, description, created_by, created_at
                "#,
                &[&title, &description, &created_by],
            )
            .await
            .map_err(|e| {
                error!("Failed to create course '{}': {}", title, e);
                DatabaseError::QueryFailed(format!("Failed to create course: {}", e))
            })?;

        info!("Created course '{}'", title);
        course_from_row(&row)
    }

    pub async fn list_lessons(&self, course_id: i64) -> Result<Vec<Lesson>> {
        let client = self.client().await?;

        let rows = client
            .query(
                r#"
                SELECT lesson_id, course_id, title, content, order_number
                FROM lessons
                WHERE course_id = $1
                ORDER BY order_number
                "#,
                &[&course_id],
            )
            .await
            .map_err(|e| {
                error!("Failed to list lessons for course {}: {}", course_id, e);
                DatabaseError::QueryFailed(format!("Failed to list lessons: {}", e))
            })?;

        rows.iter().map(lesson_from_row).collect()
    }

    pub async fn user_progress(&self, user_id: i64) -> Result<Vec<Progress>> {
        let client = self.client().await?;

        let rows = client
            .query(
                r#"
                SELECT progress_id, user_id, lesson_id, status, score, updated_at
                FROM progress
                WHERE user_id = $1
                "#,
                &[&user_id],
            )
            .await
            .map_err(|e| {
                error!("Failed to load progress for user {}: {}", user_id, e);
                DatabaseError::QueryFailed(format!("Failed to load progress: {}", e))
            })?;

        rows.iter().map(progress_from_row).collect()
    }

    /// Inserts or replaces the progress row for `(user_id, lesson_id)`.
    pub async fn upsert_progress(
        &self,
        user_id: i64,
        lesson_id: i64,
        status: ProgressStatus,
        score: Option<i32>,
    ) -> Result<Progress> {
        let client = self.client().await?;

        let row = client
            .query_one(
                r#"
                INSERT INTO progress (user_id, lesson_id, status, score, updated_at)
                VALUES ($1, $2, $3, $4, NOW())
                ON CONFLICT (user_id, lesson_id)
                DO UPDATE SET status = EXCLUDED.status, score = EXCLUDED.score, updated_at = NOW()
                RETURNING progress_id, user_id, lesson_id, status, score, updated_at
                "#,
                &[&user_id, &lesson_id, &status.as_str(), &score],
            )
            .await
            .map_err(|e| {
                error!("Failed to update progress for user {} lesson {}: {}", user_id, lesson_id, e);
                DatabaseError::QueryFailed(format!("Failed to update progress: {}", e))
            })?;

        info!("Progress for user {} lesson {} set to {}", user_id, lesson_id, status);
        progress_from_row(&row)
    }
}

impl UserStore for DatabaseManager {
    async fn find_user_by_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let client = self.client().await?;

        let row = client
            .query_opt(
                &*format!("SELECT {} FROM users WHERE email = $1 AND password = $2", USER_COLUMNS),
                &[&email, &password],
            )
            .await
            .map_err(|e| {
                error!("Failed to look up user by credentials: {}", e);
                DatabaseError::QueryFailed(format!("Failed to look up user: {}", e))
            })?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let client = self.client().await?;

        let row = client
            .query_opt(&*format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS), &[&user_id])
            .await
            .map_err(|e| {
                error!("Failed to fetch user {}: {}", user_id, e);
                DatabaseError::QueryFailed(format!("Failed to fetch user: {}", e))
            })?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let client = self.client().await?;

        let row = client
            .query_opt("SELECT user_id FROM users WHERE email = $1", &[&email])
            .await
            .map_err(|e| {
                error!("Failed to check email: {}", e);
                DatabaseError::QueryFailed(format!("Failed to check email: {}", e))
            })?;

        Ok(row.is_some())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User> {
        let client = self.client().await?;

        let row = client
            .query_one(
                &*format!(
                    r#"
                    INSERT INTO users (name, email, password, role, year, department)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING {}
                    "#,
                    USER_COLUMNS
                ),
                &[
                    &user.name,
                    &user.email,
                    &user.password,
                    &user.role.as_str(),
                    &user.year,
                    &user.department,
                ],
            )
            .await
            .map_err(|e| {
                error!("Failed to insert user {}: {}", user.email, e);
                DatabaseError::QueryFailed(format!("Failed to create user: {}", e))
            })?;

        info!("Registered user {}", user.email);
        user_from_row(&row)
    }

    async fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<User> {
        let client = self.client().await?;

        let row = client
            .query_opt(
                &*format!(
                    r#"
                    UPDATE users SET
                        name = COALESCE($2, name),
                        email = COALESCE($3, email),
                        password = COALESCE($4, password),
                        year = COALESCE($5, year),
                        department = COALESCE($6, department)
                    WHERE user_id = $1
                    RETURNING {}
                    "#,
                    USER_COLUMNS
                ),
                &[
                    &user_id,
                    &update.name,
                    &update.email,
                    &update.password,
                    &update.year,
                    &update.department,
                ],
            )
            .await
            .map_err(|e| {
                error!("Failed to update user {}: {}", user_id, e);
                DatabaseError::QueryFailed(format!("Failed to update user: {}", e))
            })?;

        match row {
            Some(row) => {
                info!("Updated profile for user {}", user_id);
                user_from_row(&row)
            }
            None => Err(DatabaseError::UserNotFound(user_id.to_string())),
        }
    }
}

fn column<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| DatabaseError::InvalidValue(format!("column '{}': {}", name, e)))
}

fn user_from_row(row: &Row) -> Result<User> {
    let role: String = column(row, "role")?;
    Ok(User {
        user_id: column(row, "user_id")?,
        name: column(row, "name")?,
        email: column(row, "email")?,
        password: column(row, "password")?,
        role: role.parse()?,
        created_at: column(row, "created_at")?,
        year: column(row, "year")?,
        department: column(row, "department")?,
    })
}

fn course_from_row(row: &Row) -> Result<Course> {
    Ok(Course {
        course_id: column(row, "course_id")?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        created_by: column(row, "created_by")?,
        created_at: column(row, "created_at")?,
    })
}

fn lesson_from_row(row: &Row) -> Result<Lesson> {
    Ok(Lesson {
        lesson_id: column(row, "lesson_id")?,
        course_id: column(row, "course_id")?,
        title: column(row, "title")?,
        content: column(row, "content")?,
        order_number: column(row, "order_number")?,
    })
}

fn progress_from_row(row: &Row) -> Result<Progress> {
    let status: String = column(row, "status")?;
    Ok(Progress {
        progress_id: column(row, "progress_id")?,
        user_id: column(row, "user_id")?,
        lesson_id: column(row, "lesson_id")?,
        status: status.parse()?,
        score: column(row, "score")?,
        updated_at: column(row, "updated_at")?,
    })
}
