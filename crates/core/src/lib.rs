//! Planet Price Core - Shared domain types.
//!
//! This crate provides the types shared by every Planet Price component:
//! - `storefront` - API gateway, session and cart stores, access guard
//! - `cli` - Terminal front end driving the stores
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no runtime.
//! The remote marketplace API owns all business rules; these types only give
//! its values a checked, strongly-typed shape on the client.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email addresses, money amounts, roles and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
