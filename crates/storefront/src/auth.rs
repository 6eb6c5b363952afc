//! Authentication status collaborator.
//!
//! The cart core never talks to the auth provider directly; it only
//! needs one bit ("is this visitor signed in") at initialization time.
//! The probe is injected so tests and shells can swap the hosted auth
//! client for a double. A probe failure is fail-open: the service falls
//! back to guest behavior rather than locking the visitor out of their
//! cart.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the authentication status probe.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The auth provider could not be reached or answered abnormally.
    #[error("auth status unavailable: {0}")]
    Unavailable(String),
}

/// Reports whether the current visitor is authenticated.
#[async_trait]
pub trait AuthProbe: Send + Sync {
    /// Check the visitor's authentication status.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unavailable`] when the provider cannot
    /// answer; callers treat that as "guest".
    async fn is_authenticated(&self) -> Result<bool, AuthError>;
}

/// Probe with a fixed answer, for tests and offline shells.
#[derive(Debug, Clone, Copy)]
pub struct FixedAuth {
    authenticated: bool,
}

impl FixedAuth {
    /// Create a probe that always reports the given status.
    #[must_use]
    pub const fn new(authenticated: bool) -> Self {
        Self { authenticated }
    }
}

#[async_trait]
impl AuthProbe for FixedAuth {
    async fn is_authenticated(&self) -> Result<bool, AuthError> {
        Ok(self.authenticated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_auth_reports_configured_status() {
        assert!(FixedAuth::new(true).is_authenticated().await.unwrap());
        assert!(!FixedAuth::new(false).is_authenticated().await.unwrap());
    }
}
