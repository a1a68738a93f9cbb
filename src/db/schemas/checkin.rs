//! Daily check-in document schema
//!
//! One record per (challenge, day_number). The day number tracks the
//! challenge's logical day counter, not the calendar: checkin_date records
//! which calendar day the record was opened on and is what makes a
//! check-in immutable once its day has passed. The compound unique index
//! turns a lost create race into a duplicate-key error instead of a
//! silent second record.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for daily check-ins
pub const CHECKIN_COLLECTION: &str = "daily_checkins";

/// Daily check-in document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DailyCheckinDoc {
    /// Application-level id, allocated from the `daily_checkins` counter
    pub id: i64,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning challenge's id
    pub challenge_id: i64,

    /// Owning user's id (denormalized from the challenge for the guard)
    pub user_id: i64,

    /// Logical challenge day this record tracks
    pub day_number: i32,

    /// Start of the calendar day the record was opened on (local midnight)
    pub checkin_date: DateTime,

    /// Ids of the habits completed so far today; a set, never holds duplicates
    pub completed_habit_ids: Vec<i64>,

    /// Derived: completed set covers every habit in the challenge
    pub all_habits_completed: bool,
}

impl DailyCheckinDoc {
    /// Open a fresh check-in for the given challenge day
    pub fn open(
        id: i64,
        challenge_id: i64,
        user_id: i64,
        day_number: i32,
        checkin_date: DateTime,
    ) -> Self {
        Self {
            id,
            metadata: Metadata::new(),
            challenge_id,
            user_id,
            day_number,
            checkin_date,
            completed_habit_ids: Vec::new(),
            all_habits_completed: false,
        }
    }
}

impl IntoIndexes for DailyCheckinDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the application-level id
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("checkin_id_unique".to_string())
                        .build(),
                ),
            ),
            // At most one check-in per challenge-day
            (
                doc! { "challenge_id": 1, "day_number": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("one_checkin_per_day".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for DailyCheckinDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
