use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, Request, State},
    http::{StatusCode, header::USER_AGENT},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Instant;

use crate::nav::{NavConfig, NavLink, sidebar_links};
use crate::record::{LogLevel, LogRecord};
use crate::writer::LogWriter;

#[derive(Clone)]
pub struct AppState {
    pub writer: LogWriter,
    pub nav: NavConfig,
}

/// Handler fault carried through response extensions so the instrumentation
/// middleware can log it. The client only ever sees the generic 500 body.
#[derive(Debug, Clone)]
pub struct FaultDetail {
    pub message: String,
    pub trace: String,
}

/// Wrapper turning any handler error into `500 {"error":"Internal server
/// error"}` while stashing the full detail for the error log.
pub struct AppError(pub anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = FaultDetail {
            message: self.0.to_string(),
            trace: format!("{:?}", self.0),
        };
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        )
            .into_response();
        response.extensions_mut().insert(detail);
        response
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/logs", post(ingest))
        .route("/api/nav", get(nav_handler))
        .layer(middleware::from_fn_with_state(state.clone(), access_log))
        .with_state(state)
}

pub async fn serve(listen: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!("log server listening on http://{}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Wraps every route. On completion emits one info record with the request
/// line, status, elapsed time and client identity; when the response carries
/// a [`FaultDetail`] an error record with the fault message and trace is
/// emitted as well.
pub async fn access_log(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let url = req.uri().to_string();
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip().to_string());

    let response = next.run(req).await;
    let duration = format!("{}ms", start.elapsed().as_millis());

    if let Some(fault) = response.extensions().get::<FaultDetail>() {
        let mut meta = BTreeMap::new();
        meta.insert("error".to_string(), json!(fault.message));
        meta.insert("stack".to_string(), json!(fault.trace));
        meta.insert("url".to_string(), json!(url));
        meta.insert("method".to_string(), json!(method));
        state
            .writer
            .error(format!("Error processing request {method} {url}"), meta);
    }

    let mut meta = BTreeMap::new();
    meta.insert("method".to_string(), json!(method));
    meta.insert("url".to_string(), json!(url));
    meta.insert("status".to_string(), json!(response.status().as_u16()));
    meta.insert("duration".to_string(), json!(duration));
    meta.insert("userAgent".to_string(), json!(user_agent));
    if let Some(ip) = ip {
        meta.insert("ip".to_string(), json!(ip));
    }
    state.writer.info(format!("{method} {url}"), meta);

    response
}

async fn health() -> &'static str {
    "ok"
}

/// `POST /api/logs` — frontend record ingestion. Acknowledges success no
/// matter what happens downstream; the client treats delivery as
/// fire-and-forget and there is nothing useful it could do with a failure.
async fn ingest(State(state): State<AppState>, Json(body): Json<Value>) -> Json<Value> {
    state.writer.log(frontend_record(body));
    Json(json!({"success": true}))
}

/// Rebuild a client payload as a server-side record: level coerced by
/// policy, component re-tagged as "frontend" regardless of what the client
/// claimed, remaining top-level fields preserved as metadata. The timestamp
/// is the server's receive time.
fn frontend_record(body: Value) -> LogRecord {
    let mut fields: BTreeMap<String, Value> = match body {
        Value::Object(map) => map.into_iter().collect(),
        other => {
            let mut map = BTreeMap::new();
            map.insert("payload".to_string(), other);
            map
        }
    };

    let level = match fields.remove("level") {
        Some(Value::String(s)) => LogLevel::parse(&s),
        _ => LogLevel::Info,
    };
    let message = match fields.remove("message") {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    fields.remove("component");
    fields.remove("timestamp");

    LogRecord::new(level, "frontend", message).with_metadata(fields)
}

#[derive(Deserialize)]
struct NavQuery {
    id: String,
    name: String,
}

async fn nav_handler(
    State(state): State<AppState>,
    Query(query): Query<NavQuery>,
) -> Json<Vec<NavLink>> {
    Json(sidebar_links(&query.id, &query.name, &state.nav))
}
