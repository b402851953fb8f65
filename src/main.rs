use sqlx::{Connection, PgConnection};

use course_functions::{app, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "course_functions=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // Validated once at startup so a bad value fails fast; handlers re-read it per request.
    let config = AppConfig::from_env()?;
    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL is not set; requests that need the store will fail");
    }

    // The schema belongs to the platform; only create it when explicitly asked to.
    let migrate = std::env::var("RUN_MIGRATIONS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if migrate {
        let mut conn = PgConnection::connect(config.database_url()?).await?;
        if let Err(e) = sqlx::migrate!("./migrations").run(&mut conn).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
        conn.close().await?;
    }

    let app = app::build_app(AppState::init());
    app::serve(app, &config.http).await
}
