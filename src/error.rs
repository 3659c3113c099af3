//! Error types shared by the form handlers
//!
//! Every failure of a submission is a [`SubmissionError`]. Its [`ErrorKind`]
//! alone decides the HTTP status and the message the caller gets to see.

use hyper::StatusCode;
use thiserror::Error;

use crate::config::SettingsError;
use crate::form::FormError;

/// Broad category of a submission failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Body could not be decoded as a multipart form
    InvalidForm,
    /// A required field is missing or blank
    Validation,
    /// Operator-side configuration is missing or malformed
    Config,
    /// The mail could not be composed or handed to the SMTP server
    Dispatch,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("invalid form data: {0}")]
    InvalidForm(#[from] FormError),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("configuration error: {0}")]
    Config(#[from] SettingsError),

    #[error("failed to send: {0}")]
    Dispatch(String),
}

impl SubmissionError {
    pub fn missing_field(key: &str) -> Self {
        Self::MissingField(key.to_string())
    }

    pub fn dispatch(detail: impl std::fmt::Display) -> Self {
        Self::Dispatch(detail.to_string())
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidForm(_) => ErrorKind::InvalidForm,
            Self::MissingField(_) => ErrorKind::Validation,
            Self::Config(_) => ErrorKind::Config,
            Self::Dispatch(_) => ErrorKind::Dispatch,
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidForm | ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Config | ErrorKind::Dispatch => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the submitter.
    ///
    /// Server-side failures collapse into `failure_message`; the detail only
    /// goes to the log.
    pub fn public_message(&self, failure_message: &str) -> String {
        match self.kind() {
            ErrorKind::InvalidForm => "Invalid form data".to_string(),
            ErrorKind::Validation => self.to_string(),
            ErrorKind::Config | ErrorKind::Dispatch => failure_message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_echoes_field() {
        let err = SubmissionError::missing_field("phone");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.public_message("Failed to send application"),
            "Missing required field: phone"
        );
    }

    #[test]
    fn test_invalid_form_is_generic() {
        let err = SubmissionError::from(FormError::FileTooLarge {
            field: "attachment".to_string(),
            limit: 10,
        });
        assert_eq!(err.kind(), ErrorKind::InvalidForm);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message("Failed to send message"), "Invalid form data");
    }

    #[test]
    fn test_server_side_errors_hide_detail() {
        let config = SubmissionError::from(SettingsError::Missing("CONTACT_TO"));
        assert_eq!(config.kind(), ErrorKind::Config);
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(config.public_message("Failed to send message"), "Failed to send message");

        let dispatch = SubmissionError::dispatch("535 authentication failed");
        assert_eq!(dispatch.kind(), ErrorKind::Dispatch);
        assert_eq!(dispatch.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!dispatch
            .public_message("Failed to send message")
            .contains("535"));
    }
}
