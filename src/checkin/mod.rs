//! Daily check-in engine
//!
//! One check-in record exists per challenge-day, opened lazily on the
//! first request of the day and mutated by habit toggles until the
//! calendar day rolls over. Completing every habit advances the parent
//! challenge; reaching day 75 completes it. The state transition itself
//! is a pure function in `engine`, kept separate from persistence so the
//! progression rules are testable without a store.

pub mod engine;

pub use engine::{apply_toggle, ensure_checkin_is_today, ChallengeProgress, ToggleOutcome};
