//! Authentication primitives.
//!
//! - [`jwt`] -- access-token generation and validation, and the
//!   [`JwtIdentityVerifier`](jwt::JwtIdentityVerifier) handed to the realtime
//!   registry and the HTTP extractors.

pub mod jwt;
