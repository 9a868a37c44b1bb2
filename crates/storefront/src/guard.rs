//! Access control for protected views.
//!
//! The guard is a pure function of the current [`SessionState`] and the
//! view's [`Requirement`]. It holds no state and is re-evaluated on every
//! navigation.

use tracing::debug;

use crate::navigation::{Navigator, locations};
use crate::session::SessionState;

/// What a protected view demands of the current identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Any signed-in user.
    Authenticated,
    /// A signed-in buyer.
    Buyer,
    /// An approved seller.
    Seller,
    /// A platform administrator.
    SuperAdmin,
}

/// Outcome of evaluating a requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session restore still in flight; show a neutral placeholder.
    Loading,
    /// Nobody is signed in. `return_to` is where to resume after login.
    RedirectToLogin { return_to: String },
    /// Signed in, but without the required capability.
    RedirectToHome,
    /// Render the view.
    Authorized,
}

impl GuardDecision {
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// Stateless gatekeeper for protected views.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    /// Decide whether `requested` may be shown.
    #[must_use]
    pub fn evaluate(
        state: &SessionState,
        requirement: Requirement,
        requested: &str,
    ) -> GuardDecision {
        match state {
            SessionState::Pending | SessionState::Tentative(_) => GuardDecision::Loading,
            SessionState::SignedOut => GuardDecision::RedirectToLogin {
                return_to: requested.to_string(),
            },
            SessionState::Confirmed(_) => {
                if state.capabilities().satisfies(requirement) {
                    GuardDecision::Authorized
                } else {
                    GuardDecision::RedirectToHome
                }
            }
        }
    }

    /// Evaluate and carry out any redirect through `navigator`.
    pub fn enforce(
        state: &SessionState,
        requirement: Requirement,
        requested: &str,
        navigator: &dyn Navigator,
    ) -> GuardDecision {
        let decision = Self::evaluate(state, requirement, requested);
        match &decision {
            GuardDecision::RedirectToLogin { return_to } => {
                debug!(?requirement, %return_to, "Protected view requires login");
                navigator.navigate(&login_location(return_to));
            }
            GuardDecision::RedirectToHome => {
                debug!(?requirement, requested, "Insufficient role for view");
                navigator.navigate(locations::HOME);
            }
            GuardDecision::Loading | GuardDecision::Authorized => {}
        }
        decision
    }
}

/// Login location carrying the view to resume afterwards.
#[must_use]
pub fn login_location(return_to: &str) -> String {
    if return_to.is_empty() || return_to == locations::HOME {
        return locations::LOGIN.to_string();
    }
    let encoded: String = url::form_urlencoded::byte_serialize(return_to.as_bytes()).collect();
    format!("{}?next={encoded}", locations::LOGIN)
}

/// Extract the resume location from a login location, if any.
#[must_use]
pub fn return_location(login: &str) -> Option<String> {
    let (_, query) = login.split_once('?')?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "next")
        .map(|(_, value)| value.into_owned())
        .filter(|v| v.starts_with('/'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::types::Identity;
    use crate::navigation::MemoryNavigator;
    use planet_price_core::{Email, Role, UserId};

    fn identity(role: Role, seller_approved: bool, is_superuser: bool) -> Identity {
        Identity {
            id: UserId::new(1),
            username: "user".to_string(),
            email: Email::parse("user@example.com").unwrap(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            seller_approved,
            is_superuser,
            phone_number: None,
            address: None,
            profile_image: None,
            created_at: None,
        }
    }

    #[test]
    fn test_pending_and_tentative_are_loading() {
        let buyer = identity(Role::Buyer, false, false);
        assert_eq!(
            AccessGuard::evaluate(&SessionState::Pending, Requirement::Authenticated, "/cart"),
            GuardDecision::Loading
        );
        assert_eq!(
            AccessGuard::evaluate(
                &SessionState::Tentative(buyer),
                Requirement::Authenticated,
                "/cart"
            ),
            GuardDecision::Loading
        );
    }

    #[test]
    fn test_signed_out_redirects_to_login_with_return() {
        let nav = MemoryNavigator::new("/cart");
        let decision = AccessGuard::enforce(
            &SessionState::SignedOut,
            Requirement::Buyer,
            "/cart",
            &nav,
        );

        assert_eq!(
            decision,
            GuardDecision::RedirectToLogin {
                return_to: "/cart".to_string()
            }
        );
        assert_eq!(nav.current_location(), "/login?next=%2Fcart");
        assert_eq!(
            return_location(&nav.current_location()).as_deref(),
            Some("/cart")
        );
    }

    #[test]
    fn test_unapproved_seller_is_sent_home() {
        let nav = MemoryNavigator::new("/seller/dashboard");
        let state = SessionState::Confirmed(identity(Role::Seller, false, false));

        let decision = AccessGuard::enforce(&state, Requirement::Seller, "/seller/dashboard", &nav);

        assert_eq!(decision, GuardDecision::RedirectToHome);
        assert_eq!(nav.current_location(), "/");
    }

    #[test]
    fn test_authorized_does_not_navigate() {
        let nav = MemoryNavigator::new("/admin");
        let state = SessionState::Confirmed(identity(Role::Buyer, false, true));

        let decision = AccessGuard::enforce(&state, Requirement::SuperAdmin, "/admin", &nav);

        assert!(decision.is_authorized());
        assert_eq!(nav.history(), vec!["/admin".to_string()]);
    }

    #[test]
    fn test_login_location_for_home_has_no_query() {
        assert_eq!(login_location("/"), "/login");
        assert_eq!(return_location("/login"), None);
        assert_eq!(return_location("/login?next=https%3A%2F%2Fevil.example"), None);
    }
}
