//! Planet Price storefront client library.
//!
//! Keeps the session and the buyer's cart in step with the marketplace API:
//!
//! - [`api::ApiClient`] is the single gateway for every request
//! - [`session::SessionStore`] owns the authenticated identity
//! - [`cart::CartStore`] mirrors the server-side cart
//! - [`guard::AccessGuard`] decides whether a view may render
//!
//! [`state::AppState`] wires them together for a running application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod flows;
pub mod guard;
pub mod navigation;
pub mod notify;
pub mod session;
pub mod state;
pub mod storage;
