//! Local invocation gateway: turns plain HTTP requests into gateway events and
//! serves both functions behind one listener.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::HttpConfig;
use crate::error::AppError;
use crate::gateway::{GatewayEvent, GatewayResponse};
use crate::i18n::{Locale, Messages};
use crate::state::AppState;
use crate::{auth, courses};

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(n, v);
            }
        }
        (status, headers, self.body).into_response()
    }
}

fn to_event(
    method: &Method,
    params: HashMap<String, String>,
    headers: &HeaderMap,
    body: String,
) -> GatewayEvent {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    GatewayEvent {
        http_method: method.as_str().to_string(),
        query_string_parameters: (!params.is_empty()).then_some(params),
        headers: Some(headers),
        body: (!body.is_empty()).then_some(body),
        is_base64_encoded: false,
    }
}

fn config_error(e: anyhow::Error) -> GatewayResponse {
    error!(error = %e, "invalid configuration");
    AppError::Internal(e.to_string()).into_response(Messages::for_locale(Locale::default()))
}

async fn auth_function(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> GatewayResponse {
    let event = to_event(&method, params, &headers, body);
    match state.config() {
        Ok(cfg) => auth::handle(&event, &cfg, state.connector.as_ref()).await,
        Err(e) => config_error(e),
    }
}

async fn courses_function(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> GatewayResponse {
    let event = to_event(&method, params, &headers, body);
    match state.config() {
        Ok(cfg) => courses::handle(&event, &cfg, state.connector.as_ref()).await,
        Err(e) => config_error(e),
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/auth", any(auth_function))
        .route("/courses", any(courses_function))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, http: &HttpConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", http.host, http.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
