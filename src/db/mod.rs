//! Store seam. A handler opens one [`Session`] per invocation and hands it back
//! through [`release`] on every exit path.

use async_trait::async_trait;
use sqlx::FromRow;
use time::PrimitiveDateTime;
use tracing::warn;

use crate::config::AppConfig;
use crate::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgConnector;

/// Row returned by the registration insert.
#[derive(Debug, Clone, FromRow)]
pub struct CreatedUserRow {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: PrimitiveDateTime,
}

/// Row used by login. `password_hash` never leaves the handler.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub avatar_url: Option<String>,
}

/// Course listing row. `progress` is `None` unless the listing was made for a user.
#[derive(Debug, Clone, FromRow)]
pub struct CourseRow {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub level: Option<String>,
    pub image_url: Option<String>,
    pub instructor_name: Option<String>,
    pub progress: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub role: &'a str,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &AppConfig) -> Result<Box<dyn Session>, AppError>;
}

/// One exclusive store handle, valid for a single invocation.
#[async_trait]
pub trait Session: Send {
    async fn email_taken(&mut self, email: &str) -> Result<bool, AppError>;

    /// Fails with [`AppError::Conflict`] when the email is already present.
    async fn insert_user(&mut self, user: &NewUser<'_>) -> Result<CreatedUserRow, AppError>;

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRow>, AppError>;

    async fn find_user_by_credentials(
        &mut self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserRow>, AppError>;

    /// Newest first. With `for_user`, every row carries that user's progress (0 if none).
    async fn list_courses(&mut self, for_user: Option<i32>) -> Result<Vec<CourseRow>, AppError>;

    /// Returns whether a new progress row was created.
    async fn enroll(&mut self, user_id: i32, course_id: i32) -> Result<bool, AppError>;

    async fn close(self: Box<Self>) -> Result<(), AppError>;
}

/// Closes the session and passes `result` through. A failed close is logged only:
/// by then the work of the invocation is already committed.
pub async fn release<T>(session: Box<dyn Session>, result: Result<T, AppError>) -> Result<T, AppError> {
    if let Err(e) = session.close().await {
        warn!(error = %e, "closing store session failed");
    }
    result
}
