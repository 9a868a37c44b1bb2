//! Core types for Planet Price.
//!
//! This module provides type-safe wrappers for common marketplace concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use status::*;
