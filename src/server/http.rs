//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. One connection per
//! task; requests dispatch on (method, path) to the per-prefix route
//! modules.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::auth::JwtValidator;
use crate::clock::{Clock, SystemClock};
use crate::config::Args;
use crate::db::MongoClient;
use crate::routes;
use crate::types::StrideError;

type BoxBody = http_body_util::combinators::BoxBody<bytes::Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    pub jwt: JwtValidator,
    /// Wall-clock capability; the check-in engine derives "today" from it
    pub clock: Arc<dyn Clock>,
    pub started_at: Instant,
}

impl AppState {
    /// Create AppState with the system clock
    pub fn new(args: Args, mongo: MongoClient) -> Self {
        let jwt = JwtValidator::new(args.jwt_secret(), args.jwt_expiry_seconds);
        Self {
            args,
            mongo,
            jwt,
            clock: Arc::new(SystemClock),
            started_at: Instant::now(),
        }
    }

    /// Create AppState with an explicit clock
    pub fn with_clock(args: Args, mongo: MongoClient, clock: Arc<dyn Clock>) -> Self {
        let jwt = JwtValidator::new(args.jwt_secret(), args.jwt_expiry_seconds);
        Self {
            args,
            mongo,
            jwt,
            clock,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), StrideError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Stride listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method.clone(), path.as_str()) {
        // Auth endpoints (register/login)
        _ if path.starts_with("/auth") => routes::handle_auth_request(req, state).await,

        // Probes
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(state).await
        }
        (Method::GET, "/ready") => routes::readiness_check(state).await,
        (Method::GET, "/version") => routes::version_info().await,

        // CORS preflight
        (Method::OPTIONS, _) => routes::cors_preflight(),

        // Authenticated resources
        _ if path.starts_with("/users") => routes::handle_user_request(req, state).await,
        _ if path.starts_with("/challenges") => {
            routes::handle_challenge_request(req, state).await
        }
        _ if path.starts_with("/checkins") => routes::handle_checkin_request(req, state).await,

        _ => routes::not_found(),
    };

    Ok(response)
}
