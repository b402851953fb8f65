use tracing::{info, instrument, warn};

use crate::{
    config::AppConfig,
    courses::dto::{parse_user_filter, CourseList, CourseView, CoursesCommand, EnrollResponse, ValidEnroll},
    db::{release, Connector, Session},
    error::{AppError, AppResult},
    gateway::{self, GatewayEvent, GatewayResponse, HttpMethod},
    i18n::Messages,
};

pub const ALLOW_HEADERS: &str = "Content-Type, X-User-Id";

/// Course listing and enrollment function.
#[instrument(skip_all, fields(method = %event.http_method))]
pub async fn handle(
    event: &GatewayEvent,
    config: &AppConfig,
    connector: &dyn Connector,
) -> GatewayResponse {
    let messages = Messages::for_locale(config.locale);
    match dispatch(event, config, connector, messages).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(messages),
    }
}

async fn dispatch(
    event: &GatewayEvent,
    config: &AppConfig,
    connector: &dyn Connector,
    messages: &Messages,
) -> AppResult<GatewayResponse> {
    match event.method() {
        HttpMethod::Options => Ok(gateway::preflight(ALLOW_HEADERS)),
        HttpMethod::Get => {
            let for_user = parse_user_filter(event.query_param("user_id"), messages)?;
            let mut session = connector.connect(config).await?;
            let result = list(session.as_mut(), for_user).await;
            let courses = release(session, result).await?;
            gateway::ok(&CourseList { courses })
        }
        HttpMethod::Post => match CoursesCommand::from_body(event.json_body(messages)?)? {
            CoursesCommand::Enroll(raw) => {
                let req = raw.validate(messages).map_err(|e| {
                    warn!(error = %e, "enroll payload rejected");
                    e
                })?;
                let mut session = connector.connect(config).await?;
                let result = enroll(session.as_mut(), req).await;
                release(session, result).await?;
                gateway::ok(&EnrollResponse {
                    success: true,
                    message: messages.enrolled,
                })
            }
        },
        HttpMethod::Other(_) => Err(AppError::MethodNotAllowed),
    }
}

async fn list(session: &mut dyn Session, for_user: Option<i32>) -> AppResult<Vec<CourseView>> {
    let rows = session.list_courses(for_user).await?;
    info!(count = rows.len(), user_id = ?for_user, "courses listed");
    Ok(rows
        .into_iter()
        .map(|row| CourseView::from_row(row, for_user.is_some()))
        .collect())
}

async fn enroll(session: &mut dyn Session, req: ValidEnroll) -> AppResult<()> {
    let created = session.enroll(req.user_id, req.course_id).await?;
    info!(user_id = req.user_id, course_id = req.course_id, created, "enrollment processed");
    Ok(())
}
