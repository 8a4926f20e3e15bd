//! Identity collaborator seam.
//!
//! The realtime layer never parses bearer tokens itself. It calls an
//! injected [`IdentityVerifier`] once per connection handshake and treats
//! any error as a rejection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// A verified actor, as handed over by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: DbId,
    pub username: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

/// Reasons a handshake token is refused.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),
}

/// Verifies an opaque bearer token and returns the identity behind it.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
