//! A validated and normalised email address.

use std::fmt::Display;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The error returned when a string is not a valid email address.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0} is not a valid email address")]
pub struct EmailAddressError(pub String);

/// An email address that has been trimmed, lower-cased and checked for valid syntax.
///
/// Normalising on construction means two spellings of the same address, e.g.
/// `Foo@Bar.com` and `foo@bar.com`, always refer to the same account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Normalise and validate an email address.
    ///
    /// # Errors
    ///
    /// This function will return an error if `raw_email` is not a valid email address.
    pub fn new(raw_email: &str) -> Result<Self, EmailAddressError> {
        let normalised = raw_email.trim().to_lowercase();

        if EmailAddress::is_valid(&normalised) {
            Ok(Self(normalised))
        } else {
            Err(EmailAddressError(raw_email.to_owned()))
        }
    }

    /// Create a new `Email` without any validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted, normalised email address.
    /// For emails coming from the user (e.g., via the REST API), this function should **not** be used, instead use the checked version.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if an incorrectly formatted email is provided it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(raw_email: String) -> Self {
        Self(raw_email)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
