//! Check-in state transitions
//!
//! `apply_toggle` is the single place where habit completion and challenge
//! progression meet: it mutates the completed set, recomputes
//! `all_habits_completed`, and decides whether the parent challenge
//! advances. The two persistence writes stay logically coupled in the
//! handler, but the decision is made here.
//!
//! Progression fires only on the false-to-true transition of
//! `all_habits_completed`. Re-toggling a habit on an already-complete day
//! is a no-op for the challenge; the check-in update still succeeds.

use bson::DateTime as BsonDateTime;

use crate::db::schemas::{ChallengeDoc, DailyCheckinDoc, CHALLENGE_LENGTH_DAYS};
use crate::types::{Result, StrideError};

pub const CHECKIN_NOT_TODAY: &str = "Can only update checkins for the current day";

/// Challenge mutation produced by a completing toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeProgress {
    /// Day counter after the advance
    pub new_day: i32,
    /// Whether the advance pushed the challenge to completed status
    pub completed: bool,
}

/// Result of applying a toggle to a check-in
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    /// The check-in with its completed set and derived flag updated
    pub checkin: DailyCheckinDoc,
    /// Challenge mutation to persist, if the day just became complete
    pub progress: Option<ChallengeProgress>,
}

/// A check-in is only mutable on the calendar day it was opened
pub fn ensure_checkin_is_today(
    checkin: &DailyCheckinDoc,
    today: BsonDateTime,
) -> Result<()> {
    if checkin.checkin_date != today {
        return Err(StrideError::State(CHECKIN_NOT_TODAY.into()));
    }
    Ok(())
}

/// Apply a habit toggle to a check-in and derive the challenge progression.
///
/// The completed set is mutated idempotently: adding a present id or
/// removing an absent one leaves it unchanged. `habit_count` is the size
/// of the challenge's habit roster, which by invariant equals
/// `challenge.total_habits`.
pub fn apply_toggle(
    checkin: &DailyCheckinDoc,
    challenge: &ChallengeDoc,
    habit_id: i64,
    completed: bool,
    habit_count: usize,
) -> ToggleOutcome {
    let was_complete = checkin.all_habits_completed;

    let mut updated = checkin.clone();
    if completed {
        if !updated.completed_habit_ids.contains(&habit_id) {
            updated.completed_habit_ids.push(habit_id);
        }
    } else {
        updated.completed_habit_ids.retain(|id| *id != habit_id);
    }

    let now_complete =
        habit_count > 0 && updated.completed_habit_ids.len() == habit_count;
    updated.all_habits_completed = now_complete;

    // Advance only on the false-to-true transition
    let progress = if now_complete && !was_complete {
        let new_day = challenge.current_day + 1;
        Some(ChallengeProgress {
            new_day,
            completed: new_day >= CHALLENGE_LENGTH_DAYS,
        })
    } else {
        None
    };

    ToggleOutcome {
        checkin: updated,
        progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ChallengeStatus;

    fn challenge_on_day(day: i32, total_habits: i32) -> ChallengeDoc {
        let mut challenge = ChallengeDoc::new(5, 1, "Hard 75".into(), total_habits);
        challenge.current_day = day;
        challenge
    }

    fn checkin_with(completed: Vec<i64>, all_complete: bool) -> DailyCheckinDoc {
        let mut checkin = DailyCheckinDoc::open(9, 5, 1, 10, BsonDateTime::now());
        checkin.completed_habit_ids = completed;
        checkin.all_habits_completed = all_complete;
        checkin
    }

    #[test]
    fn test_marking_habit_complete_adds_to_set() {
        let challenge = challenge_on_day(10, 4);
        let checkin = checkin_with(vec![11], false);

        let outcome = apply_toggle(&checkin, &challenge, 12, true, 4);
        assert_eq!(outcome.checkin.completed_habit_ids, vec![11, 12]);
        assert!(!outcome.checkin.all_habits_completed);
        assert!(outcome.progress.is_none());
    }

    #[test]
    fn test_completing_twice_is_idempotent_on_the_set() {
        let challenge = challenge_on_day(10, 4);
        let checkin = checkin_with(vec![11], false);

        let first = apply_toggle(&checkin, &challenge, 11, true, 4);
        assert_eq!(first.checkin.completed_habit_ids, vec![11]);

        let second = apply_toggle(&first.checkin, &challenge, 11, true, 4);
        assert_eq!(second.checkin.completed_habit_ids, vec![11]);
    }

    #[test]
    fn test_unmarking_absent_habit_is_a_noop() {
        let challenge = challenge_on_day(10, 4);
        let checkin = checkin_with(vec![11, 12], false);

        let outcome = apply_toggle(&checkin, &challenge, 99, false, 4);
        assert_eq!(outcome.checkin.completed_habit_ids, vec![11, 12]);
        assert!(outcome.progress.is_none());
    }

    #[test]
    fn test_unmarking_removes_from_set() {
        let challenge = challenge_on_day(10, 4);
        let checkin = checkin_with(vec![11, 12], false);

        let outcome = apply_toggle(&checkin, &challenge, 11, false, 4);
        assert_eq!(outcome.checkin.completed_habit_ids, vec![12]);
    }

    #[test]
    fn test_completion_is_insertion_order_independent() {
        let challenge = challenge_on_day(10, 3);
        let habit_ids = [31, 32, 33];

        // Complete in reverse order; the flag flips only on the last one
        let mut checkin = checkin_with(vec![], false);
        for (i, id) in habit_ids.iter().rev().enumerate() {
            let outcome = apply_toggle(&checkin, &challenge, *id, true, 3);
            checkin = outcome.checkin;
            let expect_complete = i == habit_ids.len() - 1;
            assert_eq!(checkin.all_habits_completed, expect_complete);
            assert_eq!(outcome.progress.is_some(), expect_complete);
        }
    }

    #[test]
    fn test_last_habit_advances_the_day() {
        let challenge = challenge_on_day(10, 4);
        let checkin = checkin_with(vec![11, 12, 13], false);

        let outcome = apply_toggle(&checkin, &challenge, 14, true, 4);
        assert!(outcome.checkin.all_habits_completed);

        let progress = outcome.progress.expect("day should advance");
        assert_eq!(progress.new_day, 11);
        assert!(!progress.completed);
    }

    #[test]
    fn test_day_74_completion_finishes_the_challenge() {
        let challenge = challenge_on_day(74, 4);
        let checkin = checkin_with(vec![11, 12, 13], false);

        let outcome = apply_toggle(&checkin, &challenge, 14, true, 4);
        let progress = outcome.progress.expect("day should advance");
        assert_eq!(progress.new_day, 75);
        assert!(progress.completed);
    }

    #[test]
    fn test_redundant_toggle_on_complete_day_does_not_advance() {
        let challenge = challenge_on_day(12, 4);
        let checkin = checkin_with(vec![11, 12, 13, 14], true);

        // Re-marking an already-completed habit keeps the day complete but
        // must not advance the challenge again
        let outcome = apply_toggle(&checkin, &challenge, 11, true, 4);
        assert!(outcome.checkin.all_habits_completed);
        assert!(outcome.progress.is_none());
    }

    #[test]
    fn test_unmarking_reopens_the_day_without_rollback() {
        let challenge = challenge_on_day(12, 4);
        let checkin = checkin_with(vec![11, 12, 13, 14], true);

        let outcome = apply_toggle(&checkin, &challenge, 11, false, 4);
        assert!(!outcome.checkin.all_habits_completed);
        assert_eq!(outcome.checkin.completed_habit_ids, vec![12, 13, 14]);
        // The earlier advance is not undone
        assert!(outcome.progress.is_none());
    }

    #[test]
    fn test_date_guard_rejects_stale_checkin() {
        let today = BsonDateTime::from_millis(1_700_000_000_000);
        let yesterday = BsonDateTime::from_millis(1_700_000_000_000 - 86_400_000);

        let mut checkin = checkin_with(vec![], false);
        checkin.checkin_date = yesterday;

        let err = ensure_checkin_is_today(&checkin, today).unwrap_err();
        match err {
            StrideError::State(msg) => assert_eq!(msg, CHECKIN_NOT_TODAY),
            other => panic!("unexpected error: {other:?}"),
        }

        checkin.checkin_date = today;
        assert!(ensure_checkin_is_today(&checkin, today).is_ok());
    }

    #[test]
    fn test_progress_leaves_status_decision_explicit() {
        // Day 10 advance stays active, used by the handler to decide the
        // update document
        let challenge = challenge_on_day(10, 1);
        assert_eq!(challenge.status, ChallengeStatus::Active);
        let checkin = checkin_with(vec![], false);

        let outcome = apply_toggle(&checkin, &challenge, 11, true, 1);
        let progress = outcome.progress.expect("single habit completes the day");
        assert_eq!(progress.new_day, 11);
        assert!(!progress.completed);
    }
}
