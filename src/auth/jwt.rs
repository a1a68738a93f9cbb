//! JWT token generation and validation
//!
//! Tokens are stateless HS256 bearer tokens carrying the user's id, name,
//! and email. The check-in and challenge handlers trust the verified
//! identity completely; no credential checks happen past this point.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::StrideError;

/// Claims carried in every Stride token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    /// User email
    pub email: String,
    /// Display name
    pub name: String,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Verified identity attached to a request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

/// Issues and verifies Stride tokens
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Issue a token for the given user
    ///
    /// Returns the encoded token and its expiry (unix seconds).
    pub fn issue_token(
        &self,
        user_id: i64,
        email: &str,
        name: &str,
    ) -> Result<(String, u64), StrideError> {
        let iat = Self::now();
        let exp = iat + self.expiry_seconds;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            name: name.to_string(),
            iat,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| StrideError::Internal(format!("Failed to sign token: {e}")))?;

        Ok((token, exp))
    }

    /// Verify a token and return its claims
    ///
    /// Failure messages match the original middleware: expired tokens,
    /// malformed tokens, and everything else each get their own message.
    pub fn verify_token(&self, token: &str) -> Result<Claims, StrideError> {
        let validation = Validation::default();

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => {
                    Err(StrideError::Unauthorized("Expired token".into()))
                }
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => Err(StrideError::Unauthorized("Invalid token".into())),
                _ => Err(StrideError::Unauthorized("Authentication failed".into())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret", 3600)
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let jwt = validator();
        let (token, exp) = jwt.issue_token(42, "alice@hard75.com", "Alice").unwrap();

        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "alice@hard75.com");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.exp, exp);

        let user = AuthUser::from(claims);
        assert_eq!(user.id, 42);
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let jwt = validator();
        let err = jwt.verify_token("not-a-jwt").unwrap_err();
        match err {
            StrideError::Unauthorized(msg) => assert_eq!(msg, "Invalid token"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (token, _) = validator().issue_token(1, "a@b.com", "A").unwrap();
        let other = JwtValidator::new("different-secret", 3600);
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_message() {
        // Hand-craft a token that expired an hour ago
        let now = JwtValidator::now();
        let claims = Claims {
            sub: 1,
            email: "a@b.com".into(),
            name: "A".into(),
            iat: now.saturating_sub(7200),
            exp: now.saturating_sub(3600),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret".as_bytes()),
        )
        .unwrap();

        let err = validator().verify_token(&token).unwrap_err();
        match err {
            StrideError::Unauthorized(msg) => assert_eq!(msg, "Expired token"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic abc")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
