//! Challenge lifecycle
//!
//! Creation of a user's single active challenge and its fixed habit
//! roster. Input validation lives here as pure functions so the ordering
//! contract (missing fields before type errors before range errors) is
//! testable without a store; the handlers in `routes::challenges` do the
//! loading and persistence around them.

pub mod validate;

pub use validate::{validate_create, validate_habit_names, validate_habit_rename};
