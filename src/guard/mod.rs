//! Gate decisions for protected surfaces.
//!
//! A pure function of the current session snapshot and a required role.
//! The caller renders whatever each decision asks for; no navigation is
//! performed here.

use crate::auth::{AuthSnapshot, Role};

/// What a protected surface should render right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Startup reconciliation still running: show a neutral loading
    /// indicator — never the protected content, never the login fallback.
    Loading,
    /// No session, or the held role does not satisfy the requirement:
    /// substitute a login surface in place of the content.
    Fallback,
    /// Render the protected content unchanged.
    Allow,
}

/// Evaluate the gate for `required` against the given snapshot.
pub fn evaluate(snapshot: &AuthSnapshot, required: Role) -> GateDecision {
    if snapshot.loading {
        return GateDecision::Loading;
    }
    match &snapshot.user {
        Some(user) if user.role.satisfies(required) => GateDecision::Allow,
        _ => GateDecision::Fallback,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;

    fn user_with(role: Role) -> User {
        User {
            id: "u-1".into(),
            name: "Grace".into(),
            role,
            email: None,
        }
    }

    #[test]
    fn loading_wins_over_everything() {
        // Even with an (optimistically adopted) admin user present, the
        // guard holds at Loading until reconciliation concludes.
        let snapshot = AuthSnapshot {
            user: Some(user_with(Role::Admin)),
            loading: true,
        };
        assert_eq!(evaluate(&snapshot, Role::Admin), GateDecision::Loading);

        let empty = AuthSnapshot {
            user: None,
            loading: true,
        };
        assert_eq!(evaluate(&empty, Role::Guest), GateDecision::Loading);
    }

    #[test]
    fn anonymous_falls_back_for_every_requirement() {
        let snapshot = AuthSnapshot {
            user: None,
            loading: false,
        };
        for required in [Role::Guest, Role::User, Role::Admin] {
            assert_eq!(evaluate(&snapshot, required), GateDecision::Fallback);
        }
    }

    #[test]
    fn sufficient_role_allows_and_insufficient_falls_back() {
        let snapshot = AuthSnapshot {
            user: Some(user_with(Role::User)),
            loading: false,
        };
        assert_eq!(evaluate(&snapshot, Role::Guest), GateDecision::Allow);
        assert_eq!(evaluate(&snapshot, Role::User), GateDecision::Allow);
        assert_eq!(evaluate(&snapshot, Role::Admin), GateDecision::Fallback);
    }

    #[test]
    fn unknown_role_never_passes_the_gate() {
        let snapshot = AuthSnapshot {
            user: Some(user_with(Role::Unknown)),
            loading: false,
        };
        for required in [Role::Guest, Role::User, Role::Admin] {
            assert_eq!(evaluate(&snapshot, required), GateDecision::Fallback);
        }
    }
}
