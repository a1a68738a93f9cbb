//! Database schemas for Stride
//!
//! Defines MongoDB document structures for users, challenges, habits, and
//! daily check-ins.

mod challenge;
mod checkin;
mod habit;
mod metadata;
mod user;

pub use challenge::{ChallengeDoc, ChallengeStatus, CHALLENGE_COLLECTION, CHALLENGE_LENGTH_DAYS};
pub use checkin::{DailyCheckinDoc, CHECKIN_COLLECTION};
pub use habit::{HabitDoc, HABIT_COLLECTION};
pub use metadata::Metadata;
pub use user::{UserDoc, USER_COLLECTION};
