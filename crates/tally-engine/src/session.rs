//! # Session Boundary
//!
//! The engine never renders login UI or manages sessions itself; an
//! injected [`SessionProvider`] resolves the caller's identity, and
//! every primitive starts by requiring one. A provider that cannot
//! produce an identity fails the call with `AuthenticationRequired`
//! before anything is read or written.

use tally_core::{CoreError, CoreResult};

/// A resolved, authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthedUser {
    /// Tenant whose data the call is scoped to.
    pub tenant_id: String,

    /// Owner of the affected data (usually the tenant's user).
    pub user_id: String,

    /// The acting user when different from the owner (support/admin
    /// acting on behalf of a tenant); recorded in the activity log.
    pub actor_id: Option<String>,
}

/// Contract with the authentication/session collaborator.
///
/// Implementations typically read a request-scoped session; the engine
/// only ever calls [`SessionProvider::require_user`].
pub trait SessionProvider: Send + Sync {
    /// Returns the authenticated caller, or fails with
    /// `AuthenticationRequired` when no valid session exists.
    fn require_user(&self) -> CoreResult<AuthedUser>;
}

/// A provider with a fixed identity.
///
/// Useful for single-tenant embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticSession {
    user: AuthedUser,
}

impl StaticSession {
    /// Creates a provider that always resolves to the given identity.
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        StaticSession {
            user: AuthedUser {
                tenant_id: tenant_id.into(),
                user_id: user_id.into(),
                actor_id: None,
            },
        }
    }
}

impl SessionProvider for StaticSession {
    fn require_user(&self) -> CoreResult<AuthedUser> {
        Ok(self.user.clone())
    }
}

/// A provider with no session at all; every call fails.
///
/// Used in tests to pin the unauthenticated path.
#[derive(Debug, Clone, Default)]
pub struct NoSession;

impl SessionProvider for NoSession {
    fn require_user(&self) -> CoreResult<AuthedUser> {
        Err(CoreError::AuthenticationRequired)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_session_resolves() {
        let provider = StaticSession::new("tenant-1", "user-1");
        let user = provider.require_user().unwrap();
        assert_eq!(user.tenant_id, "tenant-1");
        assert_eq!(user.user_id, "user-1");
        assert!(user.actor_id.is_none());
    }

    #[test]
    fn test_no_session_fails() {
        let provider = NoSession;
        assert!(matches!(
            provider.require_user(),
            Err(CoreError::AuthenticationRequired)
        ));
    }
}
