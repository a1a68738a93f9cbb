//! Ownership guard
//!
//! Challenges and check-ins are exclusively owned by one user. Every
//! handler that has loaded a resource runs this same check before touching
//! it, so existence (404) is always established before authorization (403).

use crate::auth::AuthUser;
use crate::types::StrideError;

/// Message returned whenever a caller touches another user's resource
pub const NOT_AUTHORIZED_MESSAGE: &str =
    "User is not authorized to access given challenge data";

/// Reject the request unless the resource belongs to the requester
pub fn ensure_owner(owner_id: i64, requester: &AuthUser) -> Result<(), StrideError> {
    if owner_id != requester.id {
        return Err(StrideError::Forbidden(NOT_AUTHORIZED_MESSAGE.into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> AuthUser {
        AuthUser {
            id,
            email: format!("user{id}@hard75.com"),
            name: format!("User {id}"),
        }
    }

    #[test]
    fn test_owner_passes() {
        assert!(ensure_owner(7, &user(7)).is_ok());
    }

    #[test]
    fn test_non_owner_is_forbidden() {
        let err = ensure_owner(7, &user(8)).unwrap_err();
        match err {
            StrideError::Forbidden(msg) => assert_eq!(msg, NOT_AUTHORIZED_MESSAGE),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
