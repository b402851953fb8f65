use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{macros::format_description, PrimitiveDateTime};

use crate::db::{CreatedUserRow, UserRow};
use crate::error::{AppError, ValidationErrors};
use crate::i18n::Messages;

/// Auth function actions, selected by the body's `action` field.
#[derive(Debug)]
pub enum AuthRequest {
    Register(RegisterRequest),
    Login(LoginRequest),
}

impl AuthRequest {
    /// A missing or unknown `action` is an unsupported operation.
    pub fn from_body(body: Value) -> Result<Self, AppError> {
        let action = body.get("action").and_then(Value::as_str).map(str::to_owned);
        let request = match action.as_deref() {
            Some("register") => AuthRequest::Register(decode(body)?),
            Some("login") => AuthRequest::Login(decode(body)?),
            _ => return Err(AppError::MethodNotAllowed),
        };
        Ok(request)
    }
}

pub(crate) fn decode<T: for<'de> Deserialize<'de>>(body: Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Raw registration payload, before validation.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Raw login payload, before validation.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegister {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidLogin {
    pub email: String,
    pub password: String,
}

/// At least 3 characters and an `@`; accepted emails are lower-cased.
fn check_email(email: Option<String>, m: &Messages, errors: &mut ValidationErrors) -> String {
    match email {
        None => {
            errors.push("email", m.field_required);
            String::new()
        }
        Some(e) if e.chars().count() < 3 => {
            errors.push("email", m.email_too_short);
            String::new()
        }
        Some(e) if !e.contains('@') => {
            errors.push("email", m.email_invalid);
            String::new()
        }
        Some(e) => e.to_lowercase(),
    }
}

fn check_min_len(
    field: &'static str,
    value: Option<String>,
    min: usize,
    too_short: &'static str,
    m: &Messages,
    errors: &mut ValidationErrors,
) -> String {
    match value {
        None => {
            errors.push(field, m.field_required);
            String::new()
        }
        Some(v) if v.chars().count() < min => {
            errors.push(field, too_short);
            String::new()
        }
        Some(v) => v,
    }
}

impl RegisterRequest {
    pub fn validate(self, m: &Messages) -> Result<ValidRegister, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = check_email(self.email, m, &mut errors);
        let password = check_min_len("password", self.password, 6, m.password_too_short, m, &mut errors);
        let full_name = check_min_len("full_name", self.full_name, 1, m.full_name_required, m, &mut errors);
        errors.into_result(|| ValidRegister {
            email,
            password,
            full_name,
        })
    }
}

impl LoginRequest {
    pub fn validate(self, m: &Messages) -> Result<ValidLogin, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = check_email(self.email, m, &mut errors);
        let password = check_min_len("password", self.password, 1, m.password_required, m, &mut errors);
        errors.into_result(|| ValidLogin { email, password })
    }
}

/// `YYYY-MM-DD HH:MM:SS`, with `.ffffff` appended only when there is a fractional part.
pub fn format_created_at(ts: PrimitiveDateTime) -> String {
    let whole = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let fractional =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");
    let format = if ts.microsecond() == 0 { whole } else { fractional };
    ts.format(format).unwrap_or_else(|_| ts.to_string())
}

/// User as returned after registration.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: String,
}

impl From<CreatedUserRow> for RegisteredUser {
    fn from(row: CreatedUserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role,
            created_at: format_created_at(row.created_at),
        }
    }
}

/// User as returned after login.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub avatar_url: Option<String>,
}

impl From<UserRow> for PublicUser {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role,
            avatar_url: row.avatar_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope<T: Serialize> {
    pub user: T,
}
