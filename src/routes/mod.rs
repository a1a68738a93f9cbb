//! HTTP routes for Stride

pub mod auth_routes;
pub mod challenges;
pub mod checkins;
pub mod health;
pub mod users;

pub use auth_routes::handle_auth_request;
pub use challenges::handle_challenge_request;
pub use checkins::handle_checkin_request;
pub use health::{health_check, readiness_check, version_info};
pub use users::handle_user_request;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::auth::{extract_token_from_header, AuthUser};
use crate::server::AppState;
use crate::types::{ErrorBody, StrideError};

pub(crate) type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

// =============================================================================
// Response Helpers
// =============================================================================

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

pub(crate) fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub(crate) fn not_found() -> Response<BoxBody> {
    json_response(StatusCode::NOT_FOUND, &ErrorBody::new("Not Found"))
}

pub(crate) fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Convert a handler error to its response.
///
/// 5xx detail is logged and replaced with the handler's fixed safe message;
/// everything else reaches the caller verbatim in the
/// `{ "error": { "message" } }` shape.
pub(crate) fn error_response(err: &StrideError, fallback: &str) -> Response<BoxBody> {
    let status = err.status_code();

    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected ({}): {}", status, err);
    }

    let message = if err.is_safe_for_client() {
        err.to_string()
    } else {
        fallback.to_string()
    };

    json_response(status, &ErrorBody::new(message))
}

/// Unwrap a handler result, mapping errors through `error_response`
pub(crate) fn respond(
    result: Result<Response<BoxBody>, StrideError>,
    fallback: &str,
) -> Response<BoxBody> {
    match result {
        Ok(response) => response,
        Err(err) => error_response(&err, fallback),
    }
}

// =============================================================================
// Request Helpers
// =============================================================================

pub(crate) async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, StrideError> {
    let body = req
        .collect()
        .await
        .map_err(|e| StrideError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > 10240 {
        return Err(StrideError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| StrideError::Http(format!("Invalid JSON body: {}", e)))
}

pub(crate) fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Resolve the request's bearer token to a verified identity
pub(crate) fn authenticate(
    state: &AppState,
    req: &Request<hyper::body::Incoming>,
) -> Result<AuthUser, StrideError> {
    let token = extract_token_from_header(get_auth_header(req))
        .ok_or_else(|| StrideError::Unauthorized("No token provided".into()))?;

    let claims = state.jwt.verify_token(token)?;
    Ok(claims.into())
}

/// Parse a path segment as an integer id, with a route-specific message
pub(crate) fn parse_id(raw: &str, message: &str) -> Result<i64, StrideError> {
    raw.parse::<i64>()
        .map_err(|_| StrideError::Validation(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "Invalid challenge ID").unwrap(), 42);
        let err = parse_id("not-a-number", "Invalid challenge ID").unwrap_err();
        match err {
            StrideError::Validation(msg) => assert_eq!(msg, "Invalid challenge ID"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
