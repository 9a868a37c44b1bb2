//! Account email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address typed by a user was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {} characters", Email::MAX_LENGTH)]
    TooLong,
    #[error("'{0}' is not an email address")]
    Malformed(String),
}

/// Email on an account.
///
/// Addresses a user types go through [`Email::parse`]. Addresses the
/// marketplace returns deserialize as-is, and may be blank for accounts an
/// administrator created.
///
/// ```
/// use planet_price_core::Email;
///
/// assert!(Email::parse(" buyer@planetprice.test ").is_ok());
/// assert!(Email::parse("seller.planetprice.test").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate an address entered on a registration form.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, or lacks a
    /// non-empty mailbox and domain around a single `@`.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong);
        }
        match trimmed.split_once('@') {
            Some((mailbox, domain))
                if !mailbox.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(trimmed.to_owned()))
            }
            _ => Err(EmailError::Malformed(trimmed.to_owned())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the account has no address on file.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_blank() {
            f.write_str("(no email)")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_registration_input() {
        let email = Email::parse("  ada@planetprice.test\n").unwrap();
        assert_eq!(email.as_str(), "ada@planetprice.test");
        assert_eq!(String::from(email), "ada@planetprice.test");
    }

    #[test]
    fn test_parse_refusals() {
        assert_eq!(Email::parse("  "), Err(EmailError::Empty));
        assert_eq!(
            Email::parse(&format!("{}@planetprice.test", "a".repeat(250))),
            Err(EmailError::TooLong)
        );
        for bad in ["ada", "@planetprice.test", "ada@", "ada@shop@test"] {
            assert!(matches!(Email::parse(bad), Err(EmailError::Malformed(_))), "{bad}");
        }
    }

    #[test]
    fn test_blank_address_from_api() {
        let email: Email = serde_json::from_str("\"\"").unwrap();
        assert!(email.is_blank());
        assert_eq!(email.to_string(), "(no email)");
    }
}
