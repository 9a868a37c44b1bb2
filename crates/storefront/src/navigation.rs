//! Navigation between views.
//!
//! The gateway and the access guard decide *where* the user should go; the
//! view layer owns *how* to get there. [`Navigator`] is the seam between them.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// Well-known locations.
pub mod locations {
    /// Default entry point.
    pub const HOME: &str = "/";
    /// Login entry point.
    pub const LOGIN: &str = "/login";
    /// Registration entry point.
    pub const REGISTER: &str = "/register";
    /// Product listing; the fallback for missing products.
    pub const PRODUCTS: &str = "/products";
    /// Cart view.
    pub const CART: &str = "/cart";
    /// Buyer order history.
    pub const ORDERS: &str = "/orders";
}

/// Returns true for views reachable without a session.
///
/// A forced logout never redirects away from these, which prevents the
/// login page from bouncing onto itself.
#[must_use]
pub fn is_unauthenticated_entry(location: &str) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    let path = path.trim_end_matches('/');
    path == locations::LOGIN || path == locations::REGISTER
}

/// Location of one order's detail view.
#[must_use]
pub fn order_location(order_id: impl std::fmt::Display) -> String {
    format!("{}/{order_id}", locations::ORDERS)
}

/// Something that can report and change the current view.
pub trait Navigator: Send + Sync {
    /// The location currently displayed.
    fn current_location(&self) -> String;

    /// Replace the current location.
    fn navigate(&self, to: &str);
}

/// In-memory navigator that records every navigation.
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    /// Start at `initial`.
    #[must_use]
    pub fn new(initial: &str) -> Self {
        Self {
            history: Mutex::new(vec![initial.to_string()]),
        }
    }

    /// Every location visited, starting with the initial one.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of navigations that landed on `location`, excluding the start.
    #[must_use]
    pub fn visits(&self, location: &str) -> usize {
        self.history().iter().skip(1).filter(|l| *l == location).count()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(locations::HOME)
    }
}

impl Navigator for MemoryNavigator {
    fn current_location(&self) -> String {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_else(|| locations::HOME.to_string())
    }

    fn navigate(&self, to: &str) {
        debug!(to, "Navigating");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(to.to_string());
    }
}
