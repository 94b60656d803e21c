//! Reference notification endpoint.
//!
//! `POST /api/notify` accepts `{channel, to, subject, message}`, logs it and
//! answers `{ok: true, delivered: false, simulated: true}`. Nothing is
//! actually delivered.

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Route the notification handler is mounted on
pub const NOTIFY_PATH: &str = "/api/notify";

const REQUIRED_FIELDS: [&str; 4] = ["channel", "to", "subject", "message"];

/// Build the router. Non-POST methods on the notify route get 405.
pub fn build_router() -> Router {
    Router::new()
        .route(NOTIFY_PATH, post(notify_handler))
        .route("/health", get(health_handler))
}

/// Bind `addr` and serve until ctrl-c.
pub async fn serve(addr: &str) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "notification server started");

    axum::serve(listener, build_router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("notification server stopped");
    Ok(())
}

async fn notify_handler(body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "rejecting unparsable notification body");
            return bad_request("Body must be JSON");
        }
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !has_field(&payload, field))
        .collect();
    if !missing.is_empty() {
        return bad_request(&format!("Missing fields: {}", missing.join(", ")));
    }

    tracing::info!(
        channel = %payload["channel"],
        to = %payload["to"],
        subject = %payload["subject"],
        "notification received (simulated)"
    );

    (
        StatusCode::OK,
        Json(json!({ "ok": true, "delivered": false, "simulated": true })),
    )
        .into_response()
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}

fn has_field(payload: &Value, field: &str) -> bool {
    match payload.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error": message })),
    )
        .into_response()
}
