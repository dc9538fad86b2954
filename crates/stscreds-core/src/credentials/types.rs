use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::Error;

/// Store key for the access key id, in both stores.
pub const ACCESS_KEY_ID: &str = "aws_access_key_id";

/// Store key for the secret access key, in both stores.
pub const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";

/// Store key for the session token, session store only.
pub const SESSION_TOKEN: &str = "aws_session_token";

/// Store key for the expiry marker, bootstrap store only.
pub const EXPIRY_MARKER: &str = "temp_credentials_expire";

/// Long-lived keys used only to call the identity and session-token services.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl BootstrapKeys {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for BootstrapKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Short-lived credentials issued against an MFA code.
///
/// `expires_at` comes from the issuer and is never recomputed locally.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionCredential {
    /// Value of one stored field.
    pub fn field(&self, field: SessionField) -> &str {
        match field {
            SessionField::AccessKeyId => &self.access_key_id,
            SessionField::SecretAccessKey => &self.secret_access_key,
            SessionField::SessionToken => &self.session_token,
        }
    }

    /// Shell `export` statements for the three session fields, preceded by a blank line.
    pub fn export_statements(&self) -> String {
        format!(
            "\nexport AWS_ACCESS_KEY_ID=\"{}\"\nexport AWS_SECRET_ACCESS_KEY=\"{}\"\nexport AWS_SESSION_TOKEN=\"{}\"\n",
            self.access_key_id, self.secret_access_key, self.session_token
        )
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The fields a session store section holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionField {
    AccessKeyId,
    SecretAccessKey,
    SessionToken,
}

impl SessionField {
    pub const ALL: [SessionField; 3] = [
        SessionField::AccessKeyId,
        SessionField::SecretAccessKey,
        SessionField::SessionToken,
    ];

    /// On-disk key name.
    pub fn key(self) -> &'static str {
        match self {
            SessionField::AccessKeyId => ACCESS_KEY_ID,
            SessionField::SecretAccessKey => SECRET_ACCESS_KEY,
            SessionField::SessionToken => SESSION_TOKEN,
        }
    }
}

impl fmt::Display for SessionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SessionField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionField::ALL
            .into_iter()
            .find(|field| field.key() == s.trim())
            .ok_or_else(|| Error::UnknownField {
                key: s.to_string(),
                expected: format!("{}, {}, {}", ACCESS_KEY_ID, SECRET_ACCESS_KEY, SESSION_TOKEN),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> SessionCredential {
        SessionCredential {
            access_key_id: "ASIAEXAMPLE".into(),
            secret_access_key: "secret/with+chars".into(),
            session_token: "FwoGZXIvYXdzEtoken==".into(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_session_field_from_str() {
        assert_eq!(
            "aws_access_key_id".parse::<SessionField>().unwrap(),
            SessionField::AccessKeyId
        );
        assert_eq!(
            "aws_session_token".parse::<SessionField>().unwrap(),
            SessionField::SessionToken
        );
        assert!(matches!(
            "temp_credentials_expire".parse::<SessionField>(),
            Err(Error::UnknownField { .. })
        ));
        assert!("".parse::<SessionField>().is_err());
    }

    #[test]
    fn test_export_statements() {
        let out = credential().export_statements();
        assert!(out.starts_with('\n'));
        assert!(out.contains("export AWS_ACCESS_KEY_ID=\"ASIAEXAMPLE\"\n"));
        assert!(out.contains("export AWS_SECRET_ACCESS_KEY=\"secret/with+chars\"\n"));
        assert!(out.contains("export AWS_SESSION_TOKEN=\"FwoGZXIvYXdzEtoken==\"\n"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", credential());
        assert!(debug.contains("ASIAEXAMPLE"));
        assert!(!debug.contains("secret/with+chars"));
        assert!(!debug.contains("FwoGZXIvYXdzEtoken=="));

        let keys = BootstrapKeys::new("AKIAEXAMPLE", "hunter2");
        assert!(!format!("{:?}", keys).contains("hunter2"));
    }
}
