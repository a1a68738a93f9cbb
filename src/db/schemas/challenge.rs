//! Challenge document schema
//!
//! A challenge is one user's 75-day attempt: a name, a fixed habit count,
//! a day counter driven only by the check-in engine, and a lifecycle
//! status. The partial unique index on owner enforces the one-active-
//! challenge invariant at the store even when two create requests race.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for challenges
pub const CHALLENGE_COLLECTION: &str = "challenges";

/// Number of days a challenge runs
pub const CHALLENGE_LENGTH_DAYS: i32 = 75;

/// Lifecycle status of a challenge
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    #[default]
    Active,
    Failed,
    Completed,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Active => "active",
            ChallengeStatus::Failed => "failed",
            ChallengeStatus::Completed => "completed",
        }
    }
}

/// Challenge document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChallengeDoc {
    /// Application-level id, allocated from the `challenges` counter
    pub id: i64,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user's id
    pub user_id: i64,

    /// Display name of the challenge
    pub challenge_name: String,

    /// Fixed habit count, 1-10; the habit roster must match it exactly
    pub total_habits: i32,

    /// Logical day counter, starts at 1; advanced only by the check-in engine
    pub current_day: i32,

    /// Lifecycle status
    pub status: ChallengeStatus,

    /// Back-reference to a prior attempt, if this is a retry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_challenge_id: Option<i64>,

    /// When the challenge was started
    pub start_date: DateTime,

    /// When the challenge reached completed status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
}

impl Default for ChallengeDoc {
    fn default() -> Self {
        Self {
            id: 0,
            metadata: Metadata::default(),
            user_id: 0,
            challenge_name: String::new(),
            total_habits: 0,
            current_day: 0,
            status: ChallengeStatus::default(),
            previous_challenge_id: None,
            start_date: DateTime::from_millis(0),
            completed_at: None,
        }
    }
}

impl ChallengeDoc {
    /// Create a new active challenge on day 1
    pub fn new(id: i64, user_id: i64, challenge_name: String, total_habits: i32) -> Self {
        Self {
            id,
            metadata: Metadata::new(),
            user_id,
            challenge_name,
            total_habits,
            current_day: 1,
            status: ChallengeStatus::Active,
            previous_challenge_id: None,
            start_date: DateTime::now(),
            completed_at: None,
        }
    }

    /// Whether the challenge still accepts check-ins and habit mutations
    pub fn is_active(&self) -> bool {
        self.status == ChallengeStatus::Active
    }
}

impl IntoIndexes for ChallengeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the application-level id
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("challenge_id_unique".to_string())
                        .build(),
                ),
            ),
            // At most one active challenge per user
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! { "status": "active" })
                        .name("one_active_per_user".to_string())
                        .build(),
                ),
            ),
            // Owner lookups for listings
            (
                doc! { "user_id": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_recency".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ChallengeDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(ChallengeStatus::Active).unwrap();
        assert_eq!(json, "active");
        let json = serde_json::to_value(ChallengeStatus::Completed).unwrap();
        assert_eq!(json, "completed");

        let parsed: ChallengeStatus = serde_json::from_value("failed".into()).unwrap();
        assert_eq!(parsed, ChallengeStatus::Failed);
    }

    #[test]
    fn test_new_challenge_starts_on_day_one() {
        let challenge = ChallengeDoc::new(7, 42, "Hard 75".into(), 4);
        assert_eq!(challenge.current_day, 1);
        assert_eq!(challenge.status, ChallengeStatus::Active);
        assert!(challenge.is_active());
        assert!(challenge.completed_at.is_none());
        assert!(challenge.previous_challenge_id.is_none());
    }
}
