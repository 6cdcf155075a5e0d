#![forbid(unsafe_code)]

//! Error types shared across the controller core.
//!
//! None of these reach the page as exceptions. Transport and HTTP failures
//! are reported by the host inside [`Msg`](crate::app::Msg)s and surfaced
//! through the overlay as `Error: <display>`. Malformed payloads degrade to
//! "no data", refused submissions are logged, and storage failures are logged
//! and swallowed by the settings store.

use std::fmt;

use crate::settings::StorageError;
use crate::submit::SubmitError;

/// Errors produced by the controller core or reported to it by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiError {
    /// The request never completed (network down, CORS, aborted, body read
    /// failure). Carries the host's error text as-is.
    Transport(String),
    /// The server answered with a non-2xx status.
    Http {
        /// Response status code.
        status: u16,
    },
    /// A response body did not have the expected shape.
    Malformed(String),
    /// A submission was refused: another one holds the overlay, or the form
    /// is not intercepted.
    Submit(SubmitError),
    /// The persistent key-value slot failed.
    Storage(StorageError),
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "{reason}"),
            Self::Http { status } => write!(f, "HTTP {status}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
            Self::Submit(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for UiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Submit(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Transport(_) | Self::Http { .. } | Self::Malformed(_) => None,
        }
    }
}

impl From<StorageError> for UiError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<SubmitError> for UiError {
    fn from(e: SubmitError) -> Self {
        Self::Submit(e)
    }
}

impl From<serde_json::Error> for UiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Result alias for fallible core operations.
pub type UiResult<T> = Result<T, UiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_is_human_readable() {
        assert_eq!(
            UiError::Transport("TypeError: Failed to fetch".into()).to_string(),
            "TypeError: Failed to fetch"
        );
        assert_eq!(UiError::Http { status: 502 }.to_string(), "HTTP 502");
    }

    #[test]
    fn busy_submission_converts_and_chains() {
        use crate::submit::Ticket;
        use std::error::Error;
        let err: UiError = SubmitError::Busy {
            active_form: "clean-form".into(),
            active: Ticket(3),
        }
        .into();
        assert_eq!(err.to_string(), "submission #3 for clean-form is still in flight");
        assert!(err.source().is_some());
    }

    #[test]
    fn json_errors_become_malformed() {
        let err: UiError = serde_json::from_str::<serde_json::Value>("{nope")
            .unwrap_err()
            .into();
        assert!(matches!(err, UiError::Malformed(_)));
    }

    #[test]
    fn storage_error_is_source() {
        use std::error::Error;
        let err = UiError::from(StorageError::Unavailable("localStorage".into()));
        assert!(err.source().is_some());
    }
}
