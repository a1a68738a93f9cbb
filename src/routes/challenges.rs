//! HTTP routes for the challenge lifecycle
//!
//! - GET  /challenges                          - List the requester's challenges
//! - POST /challenges                          - Create a challenge (one active per user)
//! - GET  /challenges/{id}                     - Fetch one challenge with its habits
//! - POST /challenges/{id}/habits              - Assign the habit roster, exactly once
//! - PUT  /challenges/{id}/habits/{habitId}    - Rename a habit while on day 1
//!
//! Precondition ordering is part of the contract: existence is established
//! before ownership, ownership before lifecycle-stage checks, and the
//! specific validation messages below win in the documented order.

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::auth::ensure_owner;
use crate::challenge::{validate_create, validate_habit_names, validate_habit_rename};
use crate::db::schemas::{
    ChallengeDoc, ChallengeStatus, HabitDoc, CHALLENGE_COLLECTION, HABIT_COLLECTION,
};
use crate::routes::{
    authenticate, json_response, not_found, parse_id, parse_json_body, respond, BoxBody,
};
use crate::server::AppState;
use crate::types::{Result, StrideError};

pub const CHALLENGE_ID_INVALID: &str = "Need to provide a valid challenge id";
pub const HABIT_ID_INVALID: &str = "Need to provide a valid habit id";
pub const CHALLENGE_NOT_FOUND: &str = "Challenge not found";
pub const HABIT_NOT_FOUND: &str = "Habit not found";
pub const HABITS_INACTIVE: &str = "Can't add habits to inactive challenges";
pub const HABITS_COUNT_MISMATCH: &str =
    "Habits provided do not match the total habits from the challenge";
pub const HABITS_ALREADY_ADDED: &str = "Habits already added to the challenge";
pub const RENAME_PAST_DAY_ONE: &str = "Unable to modify habit name beyond day 1";
pub const RENAME_NOT_ACTIVE: &str = "Unable to modify habits for non active challenges";

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateChallengeRequest {
    #[serde(default)]
    pub challenge_name: Option<String>,
    /// Accepted as a number or a numeric string, like the original API
    #[serde(default)]
    pub total_habits: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct HabitInput {
    #[serde(default)]
    pub habit_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameHabitRequest {
    #[serde(default)]
    pub habit_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChallengeSummary {
    pub id: i64,
    pub challenge_name: String,
    pub total_habits: i32,
    pub user_id: i64,
    pub status: ChallengeStatus,
    pub current_day: i32,
}

#[derive(Debug, Serialize)]
pub struct CreatedChallenge {
    pub id: i64,
    pub challenge_name: String,
    pub user_id: i64,
    pub start_date: String,
    pub total_habits: i32,
    pub current_day: i32,
}

#[derive(Debug, Serialize)]
pub struct HabitBody {
    pub id: i64,
    pub challenge_id: i64,
    pub habit_name: String,
    pub habit_order: i32,
}

#[derive(Debug, Serialize)]
pub struct ChallengeDetail {
    pub id: i64,
    pub challenge_name: String,
    pub total_habits: i32,
    pub user_id: i64,
    pub status: ChallengeStatus,
    pub current_day: i32,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub challenge_habits: Vec<HabitBody>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    message: String,
    data: Vec<ChallengeSummary>,
}

#[derive(Debug, Serialize)]
struct CreateResponse {
    data: CreatedChallenge,
}

#[derive(Debug, Serialize)]
struct DetailResponse {
    message: String,
    data: ChallengeDetail,
}

#[derive(Debug, Serialize)]
struct HabitsCreatedResponse {
    message: String,
    data: Vec<HabitBody>,
}

#[derive(Debug, Serialize)]
struct HabitRenamedResponse {
    message: String,
    data: HabitBody,
}

fn iso(dt: bson::DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

fn habit_body(habit: &HabitDoc) -> HabitBody {
    HabitBody {
        id: habit.id,
        challenge_id: habit.challenge_id,
        habit_name: habit.habit_name.clone(),
        habit_order: habit.habit_order,
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /challenges
async fn handle_list(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let requester = authenticate(&state, &req)?;

    let challenges = state
        .mongo
        .collection::<ChallengeDoc>(CHALLENGE_COLLECTION)
        .await?;
    let owned = challenges
        .find_many_sorted(
            doc! { "user_id": requester.id },
            Some(doc! { "metadata.created_at": -1 }),
        )
        .await?;

    let data: Vec<ChallengeSummary> = owned
        .into_iter()
        .map(|c| ChallengeSummary {
            id: c.id,
            challenge_name: c.challenge_name,
            total_habits: c.total_habits,
            user_id: c.user_id,
            status: c.status,
            current_day: c.current_day,
        })
        .collect();

    Ok(json_response(
        StatusCode::OK,
        &ListResponse {
            message: format!("Returned challenges from {}", requester.id),
            data,
        },
    ))
}

/// POST /challenges
///
/// Flow:
/// 1. Reject if the user already has an active challenge
/// 2. Validate name and habit count (missing -> non-numeric -> range)
/// 3. Create the challenge on day 1 with status active
async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<Response<BoxBody>> {
    let requester = authenticate(&state, &req)?;
    let body: CreateChallengeRequest = parse_json_body(req).await?;

    let challenges = state
        .mongo
        .collection::<ChallengeDoc>(CHALLENGE_COLLECTION)
        .await?;

    let already_participating = || {
        StrideError::Conflict(format!(
            "User with id {} is already participating in a challenge",
            requester.id
        ))
    };

    let existing = challenges
        .find_one(doc! { "user_id": requester.id, "status": "active" })
        .await?;
    if existing.is_some() {
        return Err(already_participating());
    }

    let (name, total_habits) =
        validate_create(body.challenge_name.as_deref(), body.total_habits.as_ref())?;

    let challenge_id = state.mongo.next_id(CHALLENGE_COLLECTION).await?;
    let challenge = ChallengeDoc::new(challenge_id, requester.id, name, total_habits);
    let created = CreatedChallenge {
        id: challenge.id,
        challenge_name: challenge.challenge_name.clone(),
        user_id: challenge.user_id,
        start_date: iso(challenge.start_date),
        total_habits: challenge.total_habits,
        // Derived, not read back from the store
        current_day: 1,
    };

    if let Err(e) = challenges.insert_one(challenge).await {
        // Two creates racing on the partial unique index: the loser gets
        // the same conflict as if the read had seen the winner
        if let StrideError::Conflict(_) = e {
            return Err(already_participating());
        }
        return Err(e);
    }

    info!(
        "User {} started challenge {} ({} habits)",
        requester.id, challenge_id, total_habits
    );

    Ok(json_response(
        StatusCode::CREATED,
        &CreateResponse { data: created },
    ))
}

/// GET /challenges/{id}
async fn handle_get(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let challenge_id = parse_id(raw_id, CHALLENGE_ID_INVALID)?;
    let requester = authenticate(&state, &req)?;

    let challenges = state
        .mongo
        .collection::<ChallengeDoc>(CHALLENGE_COLLECTION)
        .await?;
    let challenge = challenges
        .find_one(doc! { "id": challenge_id })
        .await?
        .ok_or_else(|| StrideError::NotFound(CHALLENGE_NOT_FOUND.into()))?;

    ensure_owner(challenge.user_id, &requester)?;

    let habits = state.mongo.collection::<HabitDoc>(HABIT_COLLECTION).await?;
    let roster = habits
        .find_many_sorted(
            doc! { "challenge_id": challenge_id },
            Some(doc! { "habit_order": 1 }),
        )
        .await?;

    Ok(json_response(
        StatusCode::OK,
        &DetailResponse {
            message: format!("Listing challenge with id {}", challenge_id),
            data: ChallengeDetail {
                id: challenge.id,
                challenge_name: challenge.challenge_name,
                total_habits: challenge.total_habits,
                user_id: challenge.user_id,
                status: challenge.status,
                current_day: challenge.current_day,
                start_date: iso(challenge.start_date),
                completed_at: challenge.completed_at.map(iso),
                challenge_habits: roster.iter().map(habit_body).collect(),
            },
        },
    ))
}

/// POST /challenges/{id}/habits
///
/// Preconditions, in order: challenge exists (404), requester owns it
/// (403), challenge active (400), roster non-empty (400), every habit
/// named (400), roster size matches total_habits (400), no roster yet
/// (409). Creation is one atomic batch with habit_order following input
/// order.
async fn handle_assign_habits(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let challenge_id = parse_id(raw_id, CHALLENGE_ID_INVALID)?;
    let requester = authenticate(&state, &req)?;
    let body: Vec<HabitInput> = parse_json_body(req).await?;

    let challenges = state
        .mongo
        .collection::<ChallengeDoc>(CHALLENGE_COLLECTION)
        .await?;
    let challenge = challenges
        .find_one(doc! { "id": challenge_id })
        .await?
        .ok_or_else(|| StrideError::NotFound(CHALLENGE_NOT_FOUND.into()))?;

    ensure_owner(challenge.user_id, &requester)?;

    if !challenge.is_active() {
        return Err(StrideError::State(HABITS_INACTIVE.into()));
    }

    let names: Vec<Option<String>> = body.into_iter().map(|h| h.habit_name).collect();
    validate_habit_names(&names)?;

    if challenge.total_habits as usize != names.len() {
        return Err(StrideError::Validation(HABITS_COUNT_MISMATCH.into()));
    }

    let habits = state.mongo.collection::<HabitDoc>(HABIT_COLLECTION).await?;
    let existing = habits
        .find_many(doc! { "challenge_id": challenge_id })
        .await?;
    if !existing.is_empty() {
        return Err(StrideError::Conflict(HABITS_ALREADY_ADDED.into()));
    }

    let mut roster = Vec::with_capacity(names.len());
    for (index, name) in names.into_iter().enumerate() {
        let habit_id = state.mongo.next_id(HABIT_COLLECTION).await?;
        roster.push(HabitDoc::new(
            habit_id,
            challenge_id,
            name.unwrap_or_default(),
            index as i32 + 1,
        ));
    }
    let data: Vec<HabitBody> = roster.iter().map(habit_body).collect();

    if let Err(e) = habits.insert_many(roster).await {
        // A concurrent assign lost the race on (challenge_id, habit_order)
        if let StrideError::Conflict(_) = e {
            return Err(StrideError::Conflict(HABITS_ALREADY_ADDED.into()));
        }
        return Err(e);
    }

    info!(
        "Assigned {} habits to challenge {}",
        challenge.total_habits, challenge_id
    );

    Ok(json_response(
        StatusCode::CREATED,
        &HabitsCreatedResponse {
            message: format!("Successfully created {} habits", challenge.total_habits),
            data,
        },
    ))
}

/// PUT /challenges/{id}/habits/{habitId}
///
/// Renames a habit. Only the name changes, and only while the challenge is
/// still on day 1. Ownership is established before the day-1 guard so a
/// non-owner cannot learn how far along someone else's challenge is.
async fn handle_rename_habit(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_challenge_id: &str,
    raw_habit_id: &str,
) -> Result<Response<BoxBody>> {
    let challenge_id = parse_id(raw_challenge_id, CHALLENGE_ID_INVALID)?;
    let habit_id = parse_id(raw_habit_id, HABIT_ID_INVALID)?;
    let requester = authenticate(&state, &req)?;
    let body: RenameHabitRequest = parse_json_body(req).await?;

    let new_name = validate_habit_rename(body.habit_name.as_deref())?;

    let challenges = state
        .mongo
        .collection::<ChallengeDoc>(CHALLENGE_COLLECTION)
        .await?;
    let challenge = challenges
        .find_one(doc! { "id": challenge_id })
        .await?
        .ok_or_else(|| StrideError::NotFound(HABIT_NOT_FOUND.into()))?;

    let habits = state.mongo.collection::<HabitDoc>(HABIT_COLLECTION).await?;
    let habit = habits
        .find_one(doc! { "id": habit_id, "challenge_id": challenge_id })
        .await?
        .ok_or_else(|| StrideError::NotFound(HABIT_NOT_FOUND.into()))?;

    ensure_owner(challenge.user_id, &requester)?;

    if !challenge.is_active() {
        return Err(StrideError::State(RENAME_NOT_ACTIVE.into()));
    }

    if challenge.current_day > 1 {
        return Err(StrideError::State(RENAME_PAST_DAY_ONE.into()));
    }

    habits
        .update_one(
            doc! { "id": habit_id },
            doc! { "$set": { "habit_name": new_name.as_str() } },
        )
        .await?;

    info!(
        "Renamed habit {} on challenge {} to '{}'",
        habit_id, challenge_id, new_name
    );

    Ok(json_response(
        StatusCode::OK,
        &HabitRenamedResponse {
            message: "Successfully updated habit name".into(),
            data: HabitBody {
                id: habit.id,
                challenge_id: habit.challenge_id,
                habit_name: new_name,
                habit_order: habit.habit_order,
            },
        },
    ))
}

/// Route /challenges/* requests
pub async fn handle_challenge_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match (method, segments.as_slice()) {
        (Method::GET, ["challenges"]) => respond(
            handle_list(req, state).await,
            "Unable to retrieve challenges",
        ),
        (Method::POST, ["challenges"]) => respond(
            handle_create(req, state).await,
            "Unable to create new challenge",
        ),
        (Method::GET, ["challenges", id]) => {
            let id = id.to_string();
            respond(
                handle_get(req, state, &id).await,
                &format!("Unable to find data for challenge with id: {}", id),
            )
        }
        (Method::POST, ["challenges", id, "habits"]) => {
            let id = id.to_string();
            respond(
                handle_assign_habits(req, state, &id).await,
                "Unable to add habits to the challenge",
            )
        }
        (Method::PUT, ["challenges", id, "habits", habit_id]) => {
            let id = id.to_string();
            let habit_id = habit_id.to_string();
            respond(
                handle_rename_habit(req, state, &id, &habit_id).await,
                "Unable to update habit name",
            )
        }
        _ => not_found(),
    }
}
