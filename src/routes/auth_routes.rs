//! HTTP routes for authentication
//!
//! Provides REST API endpoints for account registration and login:
//! - POST /auth/register - Create an account and return its profile
//! - POST /auth/login    - Authenticate and get a JWT token
//!
//! Everything past these two endpoints trusts the verified token identity;
//! no credential checks happen in the resource handlers.

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::routes::{json_response, not_found, parse_json_body, respond, BoxBody};
use crate::server::AppState;
use crate::types::{Result, StrideError};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub expires_at: u64,
    pub user: UserProfile,
}

// =============================================================================
// Registration Validation
// =============================================================================

/// Minimal structural email check: local part, one '@', dotted domain
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if email.chars().any(|c| c.is_whitespace()) || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => {
            !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// Password rule: at least 6 characters with at least one letter and one digit
fn is_valid_password(password: &str) -> bool {
    password.len() >= 6
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_alphabetic())
}

/// Name rule: 1-50 characters, letters/digits/spaces only
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 50
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ')
}

/// Collect all registration failures, worded as the API reports them
fn validate_registration(body: &RegisterRequest) -> Vec<String> {
    let mut errors = Vec::new();

    if !body.email.as_deref().map(is_valid_email).unwrap_or(false) {
        errors.push("Invalid Email".to_string());
    }
    if !body
        .password
        .as_deref()
        .map(is_valid_password)
        .unwrap_or(false)
    {
        errors.push(
            "Password must be at least 6 characters long and contain at least one number"
                .to_string(),
        );
    }
    if !body.name.as_deref().map(is_valid_name).unwrap_or(false) {
        errors.push("Name should be between 1 and 50 characters.".to_string());
    }

    errors
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /auth/register
///
/// Flow:
/// 1. Check the email is not already registered
/// 2. Validate name/email/password
/// 3. Hash the password with argon2
/// 4. Store the user and return its public profile
async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: RegisterRequest = parse_json_body(req).await?;

    let users = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;

    // Check if the email is already taken
    if let Some(email) = body.email.as_deref() {
        if users.find_one(doc! { "email": email }).await?.is_some() {
            return Err(StrideError::Conflict(
                "User with this email already exists".into(),
            ));
        }
    }

    let errors = validate_registration(&body);
    if !errors.is_empty() {
        return Err(StrideError::Validation(errors.join(", ")));
    }

    // Validation passed; the fields are present and well-formed
    let name = body.name.unwrap_or_default();
    let email = body.email.unwrap_or_default();
    let password = body.password.unwrap_or_default();

    let password_hash = hash_password(&password)?;

    let user_id = state.mongo.next_id(USER_COLLECTION).await?;
    let user = UserDoc::new(user_id, name.clone(), email.clone(), password_hash);

    if let Err(e) = users.insert_one(user).await {
        // A registration racing on the same email loses to the unique index
        if let StrideError::Conflict(_) = e {
            return Err(StrideError::Conflict(
                "User with this email already exists".into(),
            ));
        }
        return Err(e);
    }

    info!("Registered new user: {}", email);

    Ok(json_response(
        StatusCode::CREATED,
        &RegisterResponse {
            message: "User registered successfully".into(),
            user: UserProfile {
                id: user_id,
                name,
                email,
            },
        },
    ))
}

/// POST /auth/login
///
/// Flow:
/// 1. Look up the user by email
/// 2. Verify the password hash
/// 3. Issue and return a JWT token
async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let body: LoginRequest = parse_json_body(req).await?;

    let (email, password) = match (body.email.as_deref(), body.password.as_deref()) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => {
            return Err(StrideError::Validation(
                "Email and password are required".into(),
            ))
        }
    };

    let users = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;

    let user = match users.find_one(doc! { "email": email }).await? {
        Some(user) => user,
        None => {
            warn!("Login failed - user not found: {}", email);
            // Generic error to prevent user enumeration
            return Err(StrideError::Unauthorized("Invalid credentials".into()));
        }
    };

    if !verify_password(password, &user.password_hash)? {
        warn!("Login failed - invalid password: {}", email);
        return Err(StrideError::Unauthorized("Invalid credentials".into()));
    }

    let (token, expires_at) = state.jwt.issue_token(user.id, &user.email, &user.name)?;

    info!("Login successful: {}", email);

    Ok(json_response(
        StatusCode::OK,
        &LoginResponse {
            message: "Login successful".into(),
            token,
            expires_at,
            user: UserProfile {
                id: user.id,
                name: user.name,
                email: user.email,
            },
        },
    ))
}

/// Route /auth/* requests
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::POST, "/auth/register") => respond(
            handle_register(req, state).await,
            "An error occurred while registering the user",
        ),
        (Method::POST, "/auth/login") => respond(
            handle_login(req, state).await,
            "An error occurred while logging in",
        ),
        _ => not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alice@hard75.com"));
        assert!(is_valid_email("a.b+c@mail.example.org"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("@hard75.com"));
        assert!(!is_valid_email("alice@hard75"));
        assert!(!is_valid_email("alice @hard75.com"));
        assert!(!is_valid_email("alice@hard75.c0m"));
    }

    #[test]
    fn test_password_validation() {
        assert!(is_valid_password("test1234"));
        assert!(!is_valid_password("short"));
        assert!(!is_valid_password("letters-only"));
        assert!(!is_valid_password("123456"));
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("Alice"));
        assert!(is_valid_name("Alice Smith 2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name(&"x".repeat(51)));
        assert!(!is_valid_name("alice@home"));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let body = RegisterRequest {
            name: None,
            email: Some("bad-email".into()),
            password: Some("short".into()),
        };
        let errors = validate_registration(&body);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], "Invalid Email");
    }

    #[test]
    fn test_validation_passes_well_formed_input() {
        let body = RegisterRequest {
            name: Some("Alice".into()),
            email: Some("alice@hard75.com".into()),
            password: Some("test1234".into()),
        };
        assert!(validate_registration(&body).is_empty());
    }
}
