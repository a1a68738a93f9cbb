//! Configuration for Stride
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Stride - habit-tracking backend for 75-day challenges
#[derive(Parser, Debug, Clone)]
#[command(name = "stride")]
#[command(about = "Habit-tracking backend for 75-day challenges")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "stride")]
    pub mongodb_db: String,

    /// JWT secret for token signing
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (default 7 days)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "604800")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get the configured JWT secret
    ///
    /// Call after `validate()`; the secret is required.
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret
            .as_deref()
            .expect("JWT_SECRET is required; Args::validate enforces this")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.jwt_secret {
            None => Err("JWT_SECRET is required".to_string()),
            Some(s) if s.is_empty() => Err("JWT_SECRET must not be empty".to_string()),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["stride", "--jwt-secret", "test-secret"])
    }

    #[test]
    fn test_defaults() {
        let args = base_args();
        assert_eq!(args.listen.port(), 8080);
        assert_eq!(args.mongodb_db, "stride");
        assert_eq!(args.jwt_expiry_seconds, 604800);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_validate_requires_jwt_secret() {
        let args = Args::parse_from(["stride"]);
        assert!(args.validate().is_err());

        let args = base_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.jwt_secret(), "test-secret");
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let args = Args::parse_from(["stride", "--jwt-secret", ""]);
        assert!(args.validate().is_err());
    }
}
