//! Probe handlers.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::connections::{Cache, Database, PONG};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json; charset=utf-8";

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, [(header::CONTENT_TYPE, APPLICATION_JSON)], body.to_string()).into_response()
}

/// `GET /`
pub fn root_probe() -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_PLAIN)], "OK").into_response()
}

/// `GET /health`
pub fn health_probe() -> Response {
    json_response(StatusCode::OK, json!({ "status": "ok" }))
}

/// `GET /db`
pub async fn database_probe(database: &dyn Database) -> Response {
    match database.ping().await {
        Ok(()) => json_response(StatusCode::OK, json!({ "db": "ok" })),
        Err(e) => {
            tracing::warn!(error = %e, "Database probe failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({ "db": "fail" }))
        }
    }
}

/// `GET /redis`
pub async fn cache_probe(cache: &dyn Cache) -> Response {
    match cache.ping().await {
        Ok(token) if token == PONG => json_response(StatusCode::OK, json!({ "redis": token })),
        Ok(token) => {
            tracing::warn!(reply = %token, "Cache probe returned unexpected token");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({ "redis": token }))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cache probe failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({ "redis": "fail" }))
        }
    }
}
