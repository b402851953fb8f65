use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthRequest, PublicUser, RegisteredUser, UserEnvelope, ValidLogin, ValidRegister},
        password::{hash_password, sha256_hex, verify_password, PasswordScheme},
    },
    config::AppConfig,
    db::{release, Connector, NewUser, Session},
    error::{AppError, AppResult},
    gateway::{self, GatewayEvent, GatewayResponse, HttpMethod},
    i18n::Messages,
};

pub const ALLOW_HEADERS: &str = "Content-Type, X-User-Id, X-Auth-Token";

const DEFAULT_ROLE: &str = "student";

/// Registration and login function.
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
        HttpMethod::Post => match AuthRequest::from_body(event.json_body(messages)?)? {
            AuthRequest::Register(raw) => {
                let req = raw.validate(messages).map_err(|e| {
                    warn!(error = %e, "register payload rejected");
                    e
                })?;
                let mut session = connector.connect(config).await?;
                let result = register(session.as_mut(), config.password_scheme, req).await;
                let user = release(session, result).await?;
                gateway::ok(&UserEnvelope { user })
            }
            AuthRequest::Login(raw) => {
                let req = raw.validate(messages).map_err(|e| {
                    warn!(error = %e, "login payload rejected");
                    e
                })?;
                let mut session = connector.connect(config).await?;
                let result = login(session.as_mut(), config.password_scheme, req).await;
                let user = release(session, result).await?;
                gateway::ok(&UserEnvelope { user })
            }
        },
        HttpMethod::Get | HttpMethod::Other(_) => Err(AppError::MethodNotAllowed),
    }
}

async fn register(
    session: &mut dyn Session,
    scheme: PasswordScheme,
    req: ValidRegister,
) -> AppResult<RegisteredUser> {
    let password_hash = hash_password(scheme, &req.password)?;

    if session.email_taken(&req.email).await? {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::Conflict);
    }

    let created = session
        .insert_user(&NewUser {
            email: &req.email,
            password_hash: &password_hash,
            full_name: &req.full_name,
            role: DEFAULT_ROLE,
        })
        .await?;

    info!(user_id = created.id, email = %created.email, "user registered");
    Ok(created.into())
}

async fn login(
    session: &mut dyn Session,
    scheme: PasswordScheme,
    req: ValidLogin,
) -> AppResult<PublicUser> {
    let user = match scheme {
        PasswordScheme::Sha256Hex => {
            session
                .find_user_by_credentials(&req.email, &sha256_hex(&req.password))
                .await?
        }
        PasswordScheme::Argon2 => match session.find_user_by_email(&req.email).await? {
            Some(u) => verify_password(&req.password, &u.password_hash)?.then_some(u),
            None => None,
        },
    };

    let Some(user) = user else {
        warn!(email = %req.email, "login rejected");
        return Err(AppError::InvalidCredentials);
    };

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(user.into())
}
