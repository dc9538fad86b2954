//! Error types for stscreds-core.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for stscreds-core.
#[derive(Debug, Error)]
pub enum Error {
    // ── Lifecycle ────────────────────────────────────────────────────────────
    /// The bootstrap store has never been written.
    #[error("no credentials found at {path}, please run init first")]
    NotInitialised { path: PathBuf },

    /// The session credentials for a profile have passed their expiry marker.
    #[error("session credentials for [{profile}] have expired")]
    ExpiredCredentials { profile: String },

    /// The session still looked expired straight after a fresh re-authentication.
    #[error("session credentials for [{profile}] still expired after re-authenticating")]
    ExpiredAfterReauth { profile: String },

    // ── Stores ───────────────────────────────────────────────────────────────
    /// Requested section is absent from a store.
    #[error("couldn't read [{section}] section from {path}")]
    SectionNotFound { section: String, path: PathBuf },

    /// Requested key is absent from a section.
    #[error("{key} not found in [{section}] of {path}")]
    KeyNotFound {
        section: String,
        key: String,
        path: PathBuf,
    },

    /// Store I/O error.
    #[error("credentials store I/O error at {path}: {message}")]
    StorageIo { path: PathBuf, message: String },

    /// Store exists but is not valid section/key/value text.
    #[error("couldn't parse credentials store {path}: {message}")]
    StoreParse { path: PathBuf, message: String },

    /// Store path points at something other than a regular file.
    #[error("credentials path is not a regular file: {path}")]
    NotARegularFile { path: PathBuf },

    /// A field name that the session store does not hold.
    #[error("unknown key {key:?}, expected one of {expected}")]
    UnknownField { key: String, expected: String },

    // ── Issuer ───────────────────────────────────────────────────────────────
    /// Bootstrap keys were rejected by the identity check.
    #[error("error with aws credentials: {0}")]
    Validation(String),

    /// The account has no MFA device.
    #[error("no mfa device registered for {user}")]
    NoMfaDevice { user: String },

    /// The account has more than one MFA device.
    #[error("unexpected number of mfa devices found for {user}, expected 1 was {count}")]
    MultipleMfaDevices { user: String, count: usize },

    /// The issuer rejected the MFA code.
    #[error("invalid mfa token: {0}")]
    InvalidToken(String),

    /// Any other failure reported by the remote services.
    #[error("remote error: {0}")]
    Remote(String),

    /// Reading the MFA code failed.
    #[error("error reading token: {0}")]
    TokenInput(String),

    // ── Infrastructure ───────────────────────────────────────────────────────
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for the one kind that drives a re-authentication.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Error::ExpiredCredentials { .. })
    }

    /// Returns true when a section or key is missing from a store.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::SectionNotFound { .. } | Error::KeyNotFound { .. }
        )
    }

    /// Creates a storage I/O error.
    #[must_use]
    pub fn storage_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StorageIo {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired_only_for_expired_kind() {
        assert!(Error::ExpiredCredentials { profile: "default".into() }.is_expired());

        assert!(!Error::ExpiredAfterReauth { profile: "default".into() }.is_expired());
        assert!(!Error::InvalidToken("bad".into()).is_expired());
        assert!(!Error::NotInitialised { path: "/tmp/x".into() }.is_expired());
    }

    #[test]
    fn test_is_not_found() {
        let err = Error::KeyNotFound {
            section: "default".into(),
            key: "aws_session_token".into(),
            path: "/tmp/credentials".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_expired());

        let err = Error::SectionNotFound {
            section: "work".into(),
            path: "/tmp/credentials".into(),
        };
        assert!(err.is_not_found());
        assert!(!Error::Remote("boom".into()).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = Error::MultipleMfaDevices { user: "alice".into(), count: 2 };
        assert_eq!(
            err.to_string(),
            "unexpected number of mfa devices found for alice, expected 1 was 2"
        );

        let err = Error::KeyNotFound {
            section: "default".into(),
            key: "aws_session_token".into(),
            path: "/home/a/.aws/credentials".into(),
        };
        assert_eq!(
            err.to_string(),
            "aws_session_token not found in [default] of /home/a/.aws/credentials"
        );
    }
}
