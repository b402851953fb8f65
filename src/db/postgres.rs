use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use tracing::debug;

use super::{Connector, CourseRow, CreatedUserRow, NewUser, Session, UserRow};
use crate::config::AppConfig;
use crate::error::AppError;

/// Opens a fresh Postgres connection per invocation from `DATABASE_URL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, config: &AppConfig) -> Result<Box<dyn Session>, AppError> {
        let url = config.database_url()?;
        let conn = PgConnection::connect(url)
            .await
            .context("connect to database")?;
        debug!("store session opened");
        Ok(Box::new(PgSession { conn }))
    }
}

pub struct PgSession {
    conn: PgConnection,
}

#[async_trait]
impl Session for PgSession {
    async fn email_taken(&mut self, email: &str) -> Result<bool, AppError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut self.conn)
        .await?;
        Ok(row.is_some())
    }

    async fn insert_user(&mut self, user: &NewUser<'_>) -> Result<CreatedUserRow, AppError> {
        let created = sqlx::query_as::<_, CreatedUserRow>(
            r#"
            INSERT INTO users (email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, full_name, role, created_at::timestamp AS created_at
            "#,
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.full_name)
        .bind(user.role)
        .fetch_one(&mut self.conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict,
            other => AppError::Database(other),
        })?;
        Ok(created)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRow>, AppError> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, full_name, role, avatar_url
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut self.conn)
        .await?;
        Ok(user)
    }

    async fn find_user_by_credentials(
        &mut self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserRow>, AppError> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, full_name, role, avatar_url
            FROM users
            WHERE email = $1 AND password_hash = $2
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&mut self.conn)
        .await?;
        Ok(user)
    }

    async fn list_courses(&mut self, for_user: Option<i32>) -> Result<Vec<CourseRow>, AppError> {
        let rows = match for_user {
            Some(user_id) => {
                sqlx::query_as::<_, CourseRow>(
                    r#"
                    SELECT c.id, c.title, c.description, c.duration, c.level, c.image_url,
                           u.full_name AS instructor_name,
                           COALESCE(up.progress_percent, 0)::int4 AS progress
                    FROM courses c
                    LEFT JOIN users u ON c.instructor_id = u.id
                    LEFT JOIN user_progress up ON c.id = up.course_id AND up.user_id = $1
                    ORDER BY c.created_at DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&mut self.conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, CourseRow>(
                    r#"
                    SELECT c.id, c.title, c.description, c.duration, c.level, c.image_url,
                           u.full_name AS instructor_name,
                           NULL::int4 AS progress
                    FROM courses c
                    LEFT JOIN users u ON c.instructor_id = u.id
                    ORDER BY c.created_at DESC
                    "#,
                )
                .fetch_all(&mut self.conn)
                .await?
            }
        };
        Ok(rows)
    }

    async fn enroll(&mut self, user_id: i32, course_id: i32) -> Result<bool, AppError> {
        let done = sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, course_id, progress_percent)
            VALUES ($1, $2, 0)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .execute(&mut self.conn)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn close(self: Box<Self>) -> Result<(), AppError> {
        self.conn.close().await?;
        debug!("store session closed");
        Ok(())
    }
}
