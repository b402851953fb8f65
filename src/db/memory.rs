use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::{Connector, CourseRow, CreatedUserRow, NewUser, Session, UserRow};
use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Clone)]
struct StoredUser {
    id: i32,
    email: String,
    password_hash: String,
    full_name: String,
    role: String,
    avatar_url: Option<String>,
    created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub struct StoredCourse {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub level: Option<String>,
    pub image_url: Option<String>,
    pub instructor_id: Option<i32>,
    pub created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRow {
    pub user_id: i32,
    pub course_id: i32,
    pub progress_percent: i32,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<StoredUser>,
    courses: Vec<StoredCourse>,
    progress: Vec<ProgressRow>,
    opened: usize,
    closed: usize,
    broken: bool,
}

/// In-process store with the same constraints as the relational schema
/// (unique email, unique user/course progress pair). Used by tests and by the
/// local gateway when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

fn now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another test thread panicked mid-update.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Every query on sessions opened afterwards fails with a store error.
    pub fn break_store(&self) {
        self.lock().broken = true;
    }

    pub fn add_user(&self, email: &str, password_hash: &str, full_name: &str, role: &str) -> i32 {
        let mut st = self.lock();
        let id = st.users.len() as i32 + 1;
        st.users.push(StoredUser {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            full_name: full_name.to_string(),
            role: role.to_string(),
            avatar_url: None,
            created_at: now(),
        });
        id
    }

    pub fn add_course(&self, course: StoredCourse) {
        self.lock().courses.push(course);
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn progress_rows(&self) -> Vec<ProgressRow> {
        self.lock().progress.clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.lock().opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.lock().closed
    }
}

#[async_trait]
impl Connector for MemoryStore {
    async fn connect(&self, _config: &AppConfig) -> Result<Box<dyn Session>, AppError> {
        self.lock().opened += 1;
        Ok(Box::new(MemorySession {
            store: self.clone(),
        }))
    }
}

struct MemorySession {
    store: MemoryStore,
}

impl MemorySession {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        let st = self.store.lock();
        if st.broken {
            return Err(AppError::Internal("store unavailable".into()));
        }
        Ok(st)
    }
}

fn to_user_row(u: &StoredUser) -> UserRow {
    UserRow {
        id: u.id,
        email: u.email.clone(),
        password_hash: u.password_hash.clone(),
        full_name: u.full_name.clone(),
        role: u.role.clone(),
        avatar_url: u.avatar_url.clone(),
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn email_taken(&mut self, email: &str) -> Result<bool, AppError> {
        Ok(self.state()?.users.iter().any(|u| u.email == email))
    }

    async fn insert_user(&mut self, user: &NewUser<'_>) -> Result<CreatedUserRow, AppError> {
        let mut st = self.state()?;
        if st.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict);
        }
        let stored = StoredUser {
            id: st.users.len() as i32 + 1,
            email: user.email.to_string(),
            password_hash: user.password_hash.to_string(),
            full_name: user.full_name.to_string(),
            role: user.role.to_string(),
            avatar_url: None,
            created_at: now(),
        };
        let created = CreatedUserRow {
            id: stored.id,
            email: stored.email.clone(),
            full_name: stored.full_name.clone(),
            role: stored.role.clone(),
            created_at: stored.created_at,
        };
        st.users.push(stored);
        Ok(created)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<UserRow>, AppError> {
        Ok(self.state()?.users.iter().find(|u| u.email == email).map(to_user_row))
    }

    async fn find_user_by_credentials(
        &mut self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserRow>, AppError> {
        Ok(self
            .state()?
            .users
            .iter()
            .find(|u| u.email == email && u.password_hash == password_hash)
            .map(to_user_row))
    }

    async fn list_courses(&mut self, for_user: Option<i32>) -> Result<Vec<CourseRow>, AppError> {
        let st = self.state()?;
        let mut courses: Vec<&StoredCourse> = st.courses.iter().collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let rows = courses
            .into_iter()
            .map(|c| CourseRow {
                id: c.id,
                title: c.title.clone(),
                description: c.description.clone(),
                duration: c.duration.clone(),
                level: c.level.clone(),
                image_url: c.image_url.clone(),
                instructor_name: c
                    .instructor_id
                    .and_then(|iid| st.users.iter().find(|u| u.id == iid))
                    .map(|u| u.full_name.clone()),
                progress: for_user.map(|uid| {
                    st.progress
                        .iter()
                        .find(|p| p.user_id == uid && p.course_id == c.id)
                        .map(|p| p.progress_percent)
                        .unwrap_or(0)
                }),
            })
            .collect();
        Ok(rows)
    }

    async fn enroll(&mut self, user_id: i32, course_id: i32) -> Result<bool, AppError> {
        let mut st = self.state()?;
        if st
            .progress
            .iter()
            .any(|p| p.user_id == user_id && p.course_id == course_id)
        {
            return Ok(false);
        }
        st.progress.push(ProgressRow {
            user_id,
            course_id,
            progress_percent: 0,
        });
        Ok(true)
    }

    async fn close(self: Box<Self>) -> Result<(), AppError> {
        self.store.lock().closed += 1;
        Ok(())
    }
}
