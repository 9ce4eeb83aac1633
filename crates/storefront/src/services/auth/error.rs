//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;

/// A form failed client-side validation. No backend call was made.
///
/// The `Display` text is the message shown next to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please, enter all the fields.")]
    MissingFields,

    #[error("Please, enter a valid email address.")]
    InvalidEmail,

    #[error("Please, enter a valid password.")]
    EmptyPassword,

    #[error("Please complete the reCAPTCHA.")]
    MissingVerification,

    #[error("Password must be at least {min} characters.")]
    PasswordTooShort { min: usize },

    #[error("Passwords do not match.")]
    PasswordMismatch,
}

/// Which input a validation error belongs to, for highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
}

impl ValidationError {
    /// The input to highlight, if the error is about a single field.
    #[must_use]
    pub const fn field(self) -> Option<Field> {
        match self {
            Self::InvalidEmail => Some(Field::Email),
            Self::EmptyPassword | Self::PasswordTooShort { .. } | Self::PasswordMismatch => {
                Some(Field::Password)
            }
            Self::MissingFields | Self::MissingVerification => None,
        }
    }
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Input rejected before any network call.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The backend rejected the request or could not be reached.
    #[error("backend error: {0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Message for the visitor: the validation text, the backend's message,
    /// or `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Api(err) => err.user_message(fallback),
        }
    }
}
