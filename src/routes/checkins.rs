//! HTTP routes for daily check-ins
//!
//! - POST /checkins/{challengeId} - Open (or return) today's check-in
//! - PUT  /checkins/{checkinId}   - Toggle a habit's completion
//!
//! Opening is idempotent: the first request of a challenge-day creates the
//! record (201), every later one returns it unchanged (200). Toggling
//! applies the engine transition and, when the day just became fully
//! complete, advances the parent challenge in the same request.

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::auth::ensure_owner;
use crate::checkin::{apply_toggle, ensure_checkin_is_today};
use crate::clock;
use crate::db::schemas::{
    ChallengeDoc, DailyCheckinDoc, HabitDoc, CHALLENGE_COLLECTION, CHECKIN_COLLECTION,
    HABIT_COLLECTION,
};
use crate::routes::{
    authenticate, json_response, not_found, parse_id, parse_json_body, respond, BoxBody,
};
use crate::server::AppState;
use crate::types::{Result, StrideError};

pub const CHALLENGE_ID_INVALID: &str = "Invalid challenge ID";
pub const CHECKIN_ID_INVALID: &str = "Invalid checkin ID";
pub const HABIT_ID_INVALID: &str = "Need to provide valid habitId";
pub const CHALLENGE_MISSING: &str = "Unable to create checkin for non existent challenge";
pub const CHALLENGE_NOT_ACTIVE: &str = "Unable to access checkins for non active challenges";
pub const NO_HABITS_FOR_CREATE: &str =
    "Unable to create checkin: challenge has no habits defined";
pub const CHECKIN_NOT_FOUND: &str = "Checkin not found";
pub const NO_HABITS_FOR_UPDATE: &str =
    "Unable to update checkin: challenge has no habits defined";
pub const HABIT_NOT_ACCESSIBLE: &str = "User does not have access to the given habit";
pub const UPDATE_NOT_ACTIVE: &str = "Unable to update checkin for non active challenges";
pub const CHECKIN_RACE_LOST: &str = "Checkin already exists for the current day";

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ToggleHabitRequest {
    /// Accepted as a number or a numeric string, like the original API
    #[serde(rename = "habitId", default)]
    pub habit_id: Option<Value>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckinHabit {
    pub id: i64,
    pub habit_name: String,
    pub habit_order: i32,
}

#[derive(Debug, Serialize)]
pub struct CheckinBody {
    pub id: i64,
    pub challenge_id: i64,
    pub user_id: i64,
    pub day_number: i32,
    pub checkin_date: String,
    pub completed_habit_ids: Vec<i64>,
    pub all_habits_completed: bool,
    /// Habit roster for client rendering; present on creation and updates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub habits: Option<Vec<CheckinHabit>>,
}

#[derive(Debug, Serialize)]
struct CheckinResponse {
    message: String,
    checkin: CheckinBody,
}

fn iso(dt: bson::DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

fn checkin_body(checkin: &DailyCheckinDoc, habits: Option<&[HabitDoc]>) -> CheckinBody {
    CheckinBody {
        id: checkin.id,
        challenge_id: checkin.challenge_id,
        user_id: checkin.user_id,
        day_number: checkin.day_number,
        checkin_date: iso(checkin.checkin_date),
        completed_habit_ids: checkin.completed_habit_ids.clone(),
        all_habits_completed: checkin.all_habits_completed,
        habits: habits.map(|roster| {
            roster
                .iter()
                .map(|h| CheckinHabit {
                    id: h.id,
                    habit_name: h.habit_name.clone(),
                    habit_order: h.habit_order,
                })
                .collect()
        }),
    }
}

/// Read the habitId field as an integer, whether it came as number or string
fn parse_habit_id(value: Option<&Value>) -> Result<i64> {
    let invalid = || StrideError::Validation(HABIT_ID_INVALID.into());

    let numeric = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match numeric {
        Some(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(invalid()),
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /checkins/{challengeId}
///
/// Flow:
/// 1. Validate the challenge id and load the challenge (404 if absent)
/// 2. Ownership, then active-status guard
/// 3. Return the existing check-in for the challenge's current day, if any
/// 4. Otherwise require a habit roster and open a fresh record with
///    checkin_date = start of the current calendar day
async fn handle_ensure_today(
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
        .ok_or_else(|| StrideError::NotFound(CHALLENGE_MISSING.into()))?;

    ensure_owner(challenge.user_id, &requester)?;

    if !challenge.is_active() {
        return Err(StrideError::State(CHALLENGE_NOT_ACTIVE.into()));
    }

    let current_day = challenge.current_day;
    let checkins = state
        .mongo
        .collection::<DailyCheckinDoc>(CHECKIN_COLLECTION)
        .await?;

    // Idempotent open: one record per challenge-day
    if let Some(existing) = checkins
        .find_one(doc! { "challenge_id": challenge_id, "day_number": current_day })
        .await?
    {
        return Ok(json_response(
            StatusCode::OK,
            &CheckinResponse {
                message: "Daily checkin already created".into(),
                checkin: checkin_body(&existing, None),
            },
        ));
    }

    let habits = state.mongo.collection::<HabitDoc>(HABIT_COLLECTION).await?;
    let roster = habits
        .find_many_sorted(
            doc! { "challenge_id": challenge_id },
            Some(doc! { "habit_order": 1 }),
        )
        .await?;
    if roster.is_empty() {
        return Err(StrideError::State(NO_HABITS_FOR_CREATE.into()));
    }

    let checkin_id = state.mongo.next_id(CHECKIN_COLLECTION).await?;
    let checkin = DailyCheckinDoc::open(
        checkin_id,
        challenge_id,
        requester.id,
        current_day,
        clock::today(state.clock.as_ref()),
    );

    if let Err(e) = checkins.insert_one(checkin.clone()).await {
        // Two opens racing on (challenge_id, day_number): surface the lost
        // race as a conflict rather than a silent duplicate
        if let StrideError::Conflict(_) = e {
            return Err(StrideError::Conflict(CHECKIN_RACE_LOST.into()));
        }
        return Err(e);
    }

    info!(
        "Opened checkin {} for challenge {} day {}",
        checkin_id, challenge_id, current_day
    );

    Ok(json_response(
        StatusCode::CREATED,
        &CheckinResponse {
            message: "Daily checkin created".into(),
            checkin: checkin_body(&checkin, Some(&roster)),
        },
    ))
}

/// PUT /checkins/{checkinId}
///
/// Flow:
/// 1. Validate checkin and habit ids
/// 2. Load the check-in (404), then ownership
/// 3. Date guard: the record is only mutable on the day it was opened
/// 4. Habit roster must exist and contain the habit, then the challenge
///    must still be active
/// 5. Apply the toggle transition and persist; a completing toggle also
///    advances the parent challenge
async fn handle_toggle_habit(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    raw_id: &str,
) -> Result<Response<BoxBody>> {
    let checkin_id = parse_id(raw_id, CHECKIN_ID_INVALID)?;
    let requester = authenticate(&state, &req)?;
    let body: ToggleHabitRequest = parse_json_body(req).await?;

    let habit_id = parse_habit_id(body.habit_id.as_ref())?;

    let checkins = state
        .mongo
        .collection::<DailyCheckinDoc>(CHECKIN_COLLECTION)
        .await?;
    let checkin = checkins
        .find_one(doc! { "id": checkin_id })
        .await?
        .ok_or_else(|| StrideError::NotFound(CHECKIN_NOT_FOUND.into()))?;

    ensure_owner(checkin.user_id, &requester)?;

    ensure_checkin_is_today(&checkin, clock::today(state.clock.as_ref()))?;

    let challenges = state
        .mongo
        .collection::<ChallengeDoc>(CHALLENGE_COLLECTION)
        .await?;
    let challenge = challenges
        .find_one(doc! { "id": checkin.challenge_id })
        .await?
        .ok_or_else(|| {
            StrideError::Database(format!(
                "checkin {} references missing challenge {}",
                checkin_id, checkin.challenge_id
            ))
        })?;

    let habits = state.mongo.collection::<HabitDoc>(HABIT_COLLECTION).await?;
    let roster = habits
        .find_many_sorted(
            doc! { "challenge_id": challenge.id },
            Some(doc! { "habit_order": 1 }),
        )
        .await?;
    if roster.is_empty() {
        return Err(StrideError::State(NO_HABITS_FOR_UPDATE.into()));
    }
    if !roster.iter().any(|h| h.id == habit_id) {
        return Err(StrideError::Forbidden(HABIT_NOT_ACCESSIBLE.into()));
    }

    if !challenge.is_active() {
        return Err(StrideError::State(UPDATE_NOT_ACTIVE.into()));
    }

    let outcome = apply_toggle(&checkin, &challenge, habit_id, body.completed, roster.len());

    checkins
        .update_one(
            doc! { "id": checkin_id },
            doc! { "$set": {
                "completed_habit_ids": outcome.checkin.completed_habit_ids.clone(),
                "all_habits_completed": outcome.checkin.all_habits_completed,
            }},
        )
        .await?;

    // Progression side-effect: the day just became fully complete
    if let Some(progress) = &outcome.progress {
        let mut changes = doc! { "current_day": progress.new_day };
        if progress.completed {
            changes.insert("status", "completed");
            changes.insert("completed_at", bson::DateTime::now());
        }
        challenges
            .update_one(doc! { "id": challenge.id }, doc! { "$set": changes })
            .await?;

        if progress.completed {
            info!(
                "Challenge {} completed after day {}",
                challenge.id, challenge.current_day
            );
        } else {
            info!("Challenge {} advanced to day {}", challenge.id, progress.new_day);
        }
    }

    Ok(json_response(
        StatusCode::OK,
        &CheckinResponse {
            message: "Habit completion status updated".into(),
            checkin: checkin_body(&outcome.checkin, Some(&roster)),
        },
    ))
}

/// Route /checkins/* requests
pub async fn handle_checkin_request(
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
        (Method::POST, ["checkins", id]) => {
            let id = id.to_string();
            respond(
                handle_ensure_today(req, state, &id).await,
                "Unable to create daily checkin",
            )
        }
        (Method::PUT, ["checkins", id]) => {
            let id = id.to_string();
            respond(
                handle_toggle_habit(req, state, &id).await,
                "Unable to update habit status",
            )
        }
        _ => not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_habit_id_accepts_number_and_string() {
        let v = json!(12);
        assert_eq!(parse_habit_id(Some(&v)).unwrap(), 12);
        let v = json!("12");
        assert_eq!(parse_habit_id(Some(&v)).unwrap(), 12);
    }

    #[test]
    fn test_parse_habit_id_rejects_garbage() {
        for value in [json!("twelve"), json!(1.5), json!(null), json!(true)] {
            let err = parse_habit_id(Some(&value)).unwrap_err();
            match err {
                StrideError::Validation(msg) => assert_eq!(msg, HABIT_ID_INVALID),
                other => panic!("unexpected error: {other:?}"),
            }
        }
        assert!(parse_habit_id(None).is_err());
    }

    #[test]
    fn test_checkin_body_includes_roster_when_given() {
        let checkin = DailyCheckinDoc::open(1, 2, 3, 4, bson::DateTime::now());
        let roster = vec![HabitDoc::new(10, 2, "Read".into(), 1)];

        let with = checkin_body(&checkin, Some(&roster));
        let habits = with.habits.expect("roster present");
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].habit_name, "Read");

        let without = checkin_body(&checkin, None);
        assert!(without.habits.is_none());
    }
}
