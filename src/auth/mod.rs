//! Authentication and authorization for Stride
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - The ownership guard shared by every resource handler

pub mod jwt;
pub mod ownership;
pub mod password;

pub use jwt::{extract_token_from_header, AuthUser, Claims, JwtValidator};
pub use ownership::ensure_owner;
pub use password::{hash_password, verify_password};
