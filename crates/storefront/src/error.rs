//! Store-boundary failures with Sentry integration.
//!
//! Store operations never hand transport or decoding errors to the view.
//! They return [`ActionFailure`], which carries a classification and a
//! message that is safe to show the user as-is.

use thiserror::Error;

use crate::api::types::Identity;
use crate::api::{ApiError, ErrorBody};

/// Broad classification of a failed store action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Input rejected, locally or by the API.
    Validation,
    /// No session, or the session was revoked.
    Unauthorized,
    /// Authenticated but not allowed.
    Forbidden,
    /// The resource does not exist.
    NotFound,
    /// Network, server or storage trouble. Retrying may help.
    Transient,
}

impl From<&ApiError> for FailureKind {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Unauthorized => Self::Unauthorized,
            ApiError::NotFound(_) => Self::NotFound,
            ApiError::Rejected { status, .. } if *status == reqwest::StatusCode::FORBIDDEN => {
                Self::Forbidden
            }
            ApiError::Rejected { .. } => Self::Validation,
            ApiError::Http(_)
            | ApiError::Server { .. }
            | ApiError::Parse(_)
            | ApiError::Storage(_)
            | ApiError::InvalidUrl(_) => Self::Transient,
        }
    }
}

/// A failed store action, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ActionFailure {
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Input rejected before any request was made.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    /// Classify `err` and pick the message with `extract`, falling back to
    /// `fallback` when the response carries nothing usable.
    #[must_use]
    pub fn from_api<F>(err: &ApiError, extract: F, fallback: &str) -> Self
    where
        F: FnOnce(&ErrorBody) -> Option<String>,
    {
        let message = err
            .body()
            .and_then(extract)
            .unwrap_or_else(|| fallback.to_string());
        Self::new(FailureKind::from(err), message)
    }
}

// ===== Sentry context =====

/// Attach the signed-in account to Sentry events, or detach it with `None`.
pub fn scope_sentry_user(identity: Option<&Identity>) {
    let user = identity.map(|identity| sentry::User {
        id: Some(identity.id.to_string()),
        username: Some(identity.username.clone()),
        email: (!identity.email.is_blank()).then(|| identity.email.to_string()),
        ..Default::default()
    });
    sentry::configure_scope(|scope| scope.set_user(user));
}

/// Record a store action so error reports show what led up to them.
pub fn add_breadcrumb(category: &str, action: &str, fields: &[(&str, &str)]) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(action.to_owned()),
        data: fields
            .iter()
            .map(|(key, value)| ((*key).to_owned(), serde_json::Value::from(*value)))
            .collect(),
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn test_action_failure_display_is_message() {
        let failure = ActionFailure::validation("Passwords do not match");
        assert_eq!(failure.to_string(), "Passwords do not match");
        assert_eq!(failure.kind, FailureKind::Validation);
    }

    #[test]
    fn test_failure_kind_classification() {
        let forbidden = ApiError::Rejected {
            status: StatusCode::FORBIDDEN,
            body: ErrorBody::default(),
        };
        let invalid = ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody::default(),
        };
        let server = ApiError::Server {
            status: StatusCode::BAD_GATEWAY,
            body: ErrorBody::default(),
        };

        assert_eq!(FailureKind::from(&forbidden), FailureKind::Forbidden);
        assert_eq!(FailureKind::from(&invalid), FailureKind::Validation);
        assert_eq!(FailureKind::from(&server), FailureKind::Transient);
        assert_eq!(
            FailureKind::from(&ApiError::Unauthorized),
            FailureKind::Unauthorized
        );
    }

    #[test]
    fn test_from_api_prefers_extracted_message() {
        let err = ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody::from_value(json!({"error": "Only 2 left in stock"})),
        };
        let failure =
            ActionFailure::from_api(&err, |b| b.error().map(String::from), "Failed to add to cart");
        assert_eq!(failure.message, "Only 2 left in stock");
    }

    #[test]
    fn test_from_api_falls_back() {
        let failure = ActionFailure::from_api(
            &ApiError::Unauthorized,
            |b| b.error().map(String::from),
            "Failed to add to cart",
        );
        assert_eq!(failure.message, "Failed to add to cart");
        assert_eq!(failure.kind, FailureKind::Unauthorized);
    }
}
