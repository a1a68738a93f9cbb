//! Challenge habit document schema
//!
//! Habits are created exactly once per challenge, in one atomic batch whose
//! size equals the challenge's total_habits. After creation only the name
//! is editable, and only while the challenge is on day 1.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for challenge habits
pub const HABIT_COLLECTION: &str = "challenge_habits";

/// Habit document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct HabitDoc {
    /// Application-level id, allocated from the `challenge_habits` counter
    pub id: i64,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning challenge's id
    pub challenge_id: i64,

    /// Display name of the habit
    pub habit_name: String,

    /// 1-based position within the challenge, unique per challenge
    pub habit_order: i32,
}

impl HabitDoc {
    /// Create a new habit document
    pub fn new(id: i64, challenge_id: i64, habit_name: String, habit_order: i32) -> Self {
        Self {
            id,
            metadata: Metadata::new(),
            challenge_id,
            habit_name,
            habit_order,
        }
    }
}

impl IntoIndexes for HabitDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the application-level id
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("habit_id_unique".to_string())
                        .build(),
                ),
            ),
            // Order is unique within a challenge
            (
                doc! { "challenge_id": 1, "habit_order": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("challenge_order_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for HabitDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
