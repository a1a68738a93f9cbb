//! Input validation for the challenge lifecycle
//!
//! The error ordering is part of the API contract: the missing-field check
//! fires before the numeric-type check, which fires before the range
//! check. `total_habits` arrives as JSON and may legitimately be a number
//! or a numeric string; anything non-integer-valued is rejected.

use serde_json::Value;

use crate::types::{Result, StrideError};

pub const NAME_AND_HABITS_REQUIRED: &str = "Challenge Name and Total Habits are required";
pub const HABITS_NOT_INTEGER: &str = "total Habits should be an integer";
pub const HABITS_OUT_OF_RANGE: &str = "Total habits should be between 1 and 10";
pub const HABITS_LIST_REQUIRED: &str = "Need to provide habits for the challenge";
pub const HABIT_NAME_MISSING: &str = "Missing or empty habit name found";
pub const HABIT_RENAME_INVALID: &str = "Need to provide a valid habit name";

/// Empty strings, zero, null, and absent values all count as "not provided"
fn is_provided(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric reading of a JSON value: numbers as-is, strings parsed in full
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Validate create-challenge inputs, returning (name, total_habits)
pub fn validate_create(
    challenge_name: Option<&str>,
    total_habits: Option<&Value>,
) -> Result<(String, i32)> {
    let name_provided = challenge_name.map(|n| !n.is_empty()).unwrap_or(false);
    let habits_provided = total_habits.map(is_provided).unwrap_or(false);

    if !habits_provided || !name_provided {
        return Err(StrideError::Validation(NAME_AND_HABITS_REQUIRED.into()));
    }

    let habits = total_habits.and_then(numeric_value);
    let habits = match habits {
        Some(v) if v.is_finite() && v.fract() == 0.0 => v,
        _ => return Err(StrideError::Validation(HABITS_NOT_INTEGER.into())),
    };

    if !(1.0..=10.0).contains(&habits) {
        return Err(StrideError::Validation(HABITS_OUT_OF_RANGE.into()));
    }

    // challenge_name is Some and non-empty here
    Ok((challenge_name.unwrap_or_default().to_string(), habits as i32))
}

/// Validate an incoming habit roster: non-empty, every habit named
pub fn validate_habit_names(habit_names: &[Option<String>]) -> Result<()> {
    if habit_names.is_empty() {
        return Err(StrideError::Validation(HABITS_LIST_REQUIRED.into()));
    }

    let all_named = habit_names
        .iter()
        .all(|name| name.as_deref().map(|n| !n.trim().is_empty()).unwrap_or(false));
    if !all_named {
        return Err(StrideError::Validation(HABIT_NAME_MISSING.into()));
    }

    Ok(())
}

/// Validate a habit rename payload, returning the trimmed-checked name
pub fn validate_habit_rename(habit_name: Option<&str>) -> Result<String> {
    match habit_name {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        _ => Err(StrideError::Validation(HABIT_RENAME_INVALID.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: StrideError) -> String {
        match err {
            StrideError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_inputs_pass() {
        let habits = json!(4);
        let (name, count) = validate_create(Some("Hard 75"), Some(&habits)).unwrap();
        assert_eq!(name, "Hard 75");
        assert_eq!(count, 4);
    }

    #[test]
    fn test_numeric_string_accepted() {
        let habits = json!("7");
        let (_, count) = validate_create(Some("Hard 75"), Some(&habits)).unwrap();
        assert_eq!(count, 7);
    }

    #[test]
    fn test_missing_name_reported_first() {
        // Even with a broken habit count, the missing-field message wins
        let habits = json!("not-a-number");
        let err = validate_create(None, Some(&habits));
        assert_eq!(message(err.unwrap_err()), NAME_AND_HABITS_REQUIRED);

        let err = validate_create(Some(""), Some(&json!(5)));
        assert_eq!(message(err.unwrap_err()), NAME_AND_HABITS_REQUIRED);
    }

    #[test]
    fn test_missing_habits_reported_first() {
        let err = validate_create(Some("Hard 75"), None);
        assert_eq!(message(err.unwrap_err()), NAME_AND_HABITS_REQUIRED);

        // Zero is "not provided", not out-of-range
        let err = validate_create(Some("Hard 75"), Some(&json!(0)));
        assert_eq!(message(err.unwrap_err()), NAME_AND_HABITS_REQUIRED);
    }

    #[test]
    fn test_non_numeric_habits() {
        let err = validate_create(Some("Hard 75"), Some(&json!("four")));
        assert_eq!(message(err.unwrap_err()), HABITS_NOT_INTEGER);

        let err = validate_create(Some("Hard 75"), Some(&json!(true)));
        assert_eq!(message(err.unwrap_err()), HABITS_NOT_INTEGER);

        // Integer-valued means no fractional part
        let err = validate_create(Some("Hard 75"), Some(&json!(4.5)));
        assert_eq!(message(err.unwrap_err()), HABITS_NOT_INTEGER);
    }

    #[test]
    fn test_range_check_fires_last() {
        let err = validate_create(Some("Hard 75"), Some(&json!(11)));
        assert_eq!(message(err.unwrap_err()), HABITS_OUT_OF_RANGE);

        let err = validate_create(Some("Hard 75"), Some(&json!("-3")));
        assert_eq!(message(err.unwrap_err()), HABITS_OUT_OF_RANGE);

        // Boundaries are inclusive
        assert!(validate_create(Some("Hard 75"), Some(&json!(1))).is_ok());
        assert!(validate_create(Some("Hard 75"), Some(&json!(10))).is_ok());
    }

    #[test]
    fn test_habit_roster_must_be_non_empty() {
        let err = validate_habit_names(&[]);
        assert_eq!(message(err.unwrap_err()), HABITS_LIST_REQUIRED);
    }

    #[test]
    fn test_every_habit_needs_a_name() {
        let names = vec![Some("Read".to_string()), Some("  ".to_string())];
        let err = validate_habit_names(&names);
        assert_eq!(message(err.unwrap_err()), HABIT_NAME_MISSING);

        let names = vec![Some("Read".to_string()), None];
        let err = validate_habit_names(&names);
        assert_eq!(message(err.unwrap_err()), HABIT_NAME_MISSING);

        let names = vec![Some("Read".to_string()), Some("Run".to_string())];
        assert!(validate_habit_names(&names).is_ok());
    }

    #[test]
    fn test_rename_requires_a_name() {
        assert_eq!(
            message(validate_habit_rename(None).unwrap_err()),
            HABIT_RENAME_INVALID
        );
        assert_eq!(
            message(validate_habit_rename(Some("   ")).unwrap_err()),
            HABIT_RENAME_INVALID
        );
        assert_eq!(validate_habit_rename(Some("Read more")).unwrap(), "Read more");
    }
}
