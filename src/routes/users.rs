//! HTTP routes for user profiles
//!
//! - GET /users/profile - Fetch the authenticated user's profile
//! - PUT /users/profile - Update name and/or email

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::routes::{authenticate, json_response, not_found, parse_json_body, respond, BoxBody};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::server::AppState;
use crate::types::{Result, StrideError};

#[derive(Debug, Serialize)]
struct ProfileBody {
    id: i64,
    name: String,
    email: String,
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    user: ProfileBody,
}

#[derive(Debug, Serialize)]
struct ProfileUpdatedResponse {
    message: String,
    data: ProfileBody,
}

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// GET /users/profile
async fn handle_get_profile(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let requester = authenticate(&state, &req)?;

    let users = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;
    let user = users
        .find_one(doc! { "id": requester.id })
        .await?
        .ok_or_else(|| StrideError::NotFound("User not found".into()))?;

    Ok(json_response(
        StatusCode::OK,
        &ProfileResponse {
            user: ProfileBody {
                id: user.id,
                name: user.name,
                email: user.email,
            },
        },
    ))
}

/// PUT /users/profile
///
/// Only name and email are updatable; absent fields are left unchanged.
async fn handle_update_profile(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let requester = authenticate(&state, &req)?;
    let body: UpdateProfileRequest = parse_json_body(req).await?;

    let users = state.mongo.collection::<UserDoc>(USER_COLLECTION).await?;
    users
        .find_one(doc! { "id": requester.id })
        .await?
        .ok_or_else(|| StrideError::NotFound("User not found".into()))?;

    let mut changes = bson::Document::new();
    if let Some(name) = body.name.as_deref() {
        if !name.is_empty() {
            changes.insert("name", name);
        }
    }
    if let Some(email) = body.email.as_deref() {
        if !email.is_empty() {
            changes.insert("email", email);
        }
    }

    if !changes.is_empty() {
        let update = doc! { "$set": changes };
        if let Err(e) = users.update_one(doc! { "id": requester.id }, update).await {
            // Email collides with another account
            if let StrideError::Conflict(_) = e {
                return Err(StrideError::Conflict(
                    "User with this email already exists".into(),
                ));
            }
            return Err(e);
        }
    }

    let updated = users
        .find_one(doc! { "id": requester.id })
        .await?
        .ok_or_else(|| StrideError::NotFound("User not found".into()))?;

    info!("Updated profile for user {}", requester.id);

    Ok(json_response(
        StatusCode::OK,
        &ProfileUpdatedResponse {
            message: "User profile updated successfully".into(),
            data: ProfileBody {
                id: updated.id,
                name: updated.name,
                email: updated.email,
            },
        },
    ))
}

/// Route /users/* requests
pub async fn handle_user_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::GET, "/users/profile") => respond(
            handle_get_profile(req, state).await,
            "Failed to load user profile",
        ),
        (Method::PUT, "/users/profile") => respond(
            handle_update_profile(req, state).await,
            "Failed to update user profile",
        ),
        _ => not_found(),
    }
}
