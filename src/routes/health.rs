//! Health check endpoints
//!
//! Provides Kubernetes-style health probes:
//! - /health, /healthz - Liveness probe (is the service running?)
//! - /ready            - Readiness probe (is the store reachable?)
//! - /version          - Build metadata
//!
//! Liveness returns 200 whenever the process is up; readiness pings the
//! store and returns 503 if it cannot be reached.

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    /// Current timestamp
    pub timestamp: String,
    /// Node identifier
    pub node_id: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub database: DatabaseHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub git_commit_full: &'static str,
    pub build_timestamp: &'static str,
}

/// GET /health, /healthz
pub async fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            status: "online",
            version: env!("CARGO_PKG_VERSION"),
            uptime: state.started_at.elapsed().as_secs(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            node_id: state.args.node_id.to_string(),
        },
    )
}

/// GET /ready
pub async fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    let connected = state.mongo.ping().await.is_ok();
    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_response(
        status,
        &ReadyResponse {
            ready: connected,
            database: DatabaseHealth { connected },
        },
    )
}

/// GET /version
pub async fn version_info() -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: env!("CARGO_PKG_VERSION"),
            git_commit: env!("GIT_COMMIT_SHORT"),
            git_commit_full: env!("GIT_COMMIT_FULL"),
            build_timestamp: env!("BUILD_TIMESTAMP"),
        },
    )
}
