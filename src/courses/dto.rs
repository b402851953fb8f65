use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::dto::decode;
use crate::db::CourseRow;
use crate::error::{AppError, ValidationErrors};
use crate::i18n::Messages;

/// Courses function actions carried in a POST body.
#[derive(Debug)]
pub enum CoursesCommand {
    Enroll(EnrollRequest),
}

impl CoursesCommand {
    pub fn from_body(body: Value) -> Result<Self, AppError> {
        let action = body.get("action").and_then(Value::as_str).map(str::to_owned);
        match action.as_deref() {
            Some("enroll") => Ok(CoursesCommand::Enroll(decode(body)?)),
            _ => Err(AppError::MethodNotAllowed),
        }
    }
}

/// Ids arrive as JSON numbers from the site, but numeric strings are accepted too.
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub course_id: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidEnroll {
    pub user_id: i32,
    pub course_id: i32,
}

fn as_id(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_id(
    field: &'static str,
    value: Option<&Value>,
    invalid: &'static str,
    m: &Messages,
    errors: &mut ValidationErrors,
) -> i32 {
    match value {
        None | Some(Value::Null) => {
            errors.push(field, m.field_required);
            0
        }
        Some(v) => as_id(v).unwrap_or_else(|| {
            errors.push(field, invalid);
            0
        }),
    }
}

impl EnrollRequest {
    pub fn validate(self, m: &Messages) -> Result<ValidEnroll, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let user_id = check_id("user_id", self.user_id.as_ref(), m.user_id_invalid, m, &mut errors);
        let course_id = check_id("course_id", self.course_id.as_ref(), m.course_id_invalid, m, &mut errors);
        errors.into_result(|| ValidEnroll { user_id, course_id })
    }
}

/// Reads the optional `user_id` query parameter. Blank counts as absent.
pub fn parse_user_filter(raw: Option<&str>, m: &Messages) -> Result<Option<i32>, ValidationErrors> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse::<i32>().map(Some).map_err(|_| {
            let mut errors = ValidationErrors::new();
            errors.push("user_id", m.user_id_invalid);
            errors
        }),
    }
}

/// One course in a listing. `progress` is present only for per-user listings.
#[derive(Debug, Serialize)]
pub struct CourseView {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub level: Option<String>,
    pub image_url: Option<String>,
    pub instructor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
}

impl CourseView {
    pub fn from_row(row: CourseRow, for_user: bool) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            duration: row.duration,
            level: row.level,
            image_url: row.image_url,
            instructor_name: row.instructor_name,
            progress: if for_user { Some(row.progress.unwrap_or(0)) } else { None },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CourseList {
    pub courses: Vec<CourseView>,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub success: bool,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Locale;
    use serde_json::json;

    fn m() -> &'static Messages {
        Messages::for_locale(Locale::En)
    }

    fn row(progress: Option<i32>) -> CourseRow {
        CourseRow {
            id: 3,
            title: "Rust".into(),
            description: None,
            duration: Some("6 weeks".into()),
            level: Some("advanced".into()),
            image_url: None,
            instructor_name: None,
            progress,
        }
    }

    #[test]
    fn enroll_accepts_numbers_and_numeric_strings() {
        let valid = EnrollRequest {
            user_id: Some(json!(7)),
            course_id: Some(json!("12")),
        }
        .validate(m())
        .unwrap();
        assert_eq!(valid, ValidEnroll { user_id: 7, course_id: 12 });
    }

    #[test]
    fn enroll_requires_both_ids() {
        let errors = EnrollRequest {
            user_id: None,
            course_id: Some(json!("abc")),
        }
        .validate(m())
        .unwrap_err();
        assert_eq!(errors.fields()[0].message, m().field_required);
        assert_eq!(errors.fields()[1].message, m().course_id_invalid);
    }

    #[test]
    fn command_dispatch_rejects_unknown_action() {
        let err = CoursesCommand::from_body(json!({"action": "unenroll"})).unwrap_err();
        assert!(matches!(err, AppError::MethodNotAllowed));
        assert!(CoursesCommand::from_body(json!({"action": "enroll"})).is_ok());
    }

    #[test]
    fn user_filter_parsing() {
        assert_eq!(parse_user_filter(None, m()).unwrap(), None);
        assert_eq!(parse_user_filter(Some(""), m()).unwrap(), None);
        assert_eq!(parse_user_filter(Some("42"), m()).unwrap(), Some(42));
        assert!(parse_user_filter(Some("4x"), m()).is_err());
    }

    #[test]
    fn progress_key_only_for_user_listings() {
        let anon = serde_json::to_value(CourseView::from_row(row(None), false)).unwrap();
        assert!(anon.get("progress").is_none());
        assert!(anon.get("instructor_name").unwrap().is_null());

        let mine = serde_json::to_value(CourseView::from_row(row(None), true)).unwrap();
        assert_eq!(mine["progress"], 0);
    }
}
