//! Remote exchange of bootstrap keys plus an MFA code for a session.
//!
//! This module provides:
//! - `SessionIssuer`: the identity / MFA device / session-token seam
//! - `AwsSessionIssuer`: the IAM + STS implementation
//! - `TokenSource`: where the one-time MFA code comes from

pub mod aws;
pub mod token;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::credentials::{BootstrapKeys, SessionCredential};
use crate::error::{Error, Result};

pub use aws::AwsSessionIssuer;
pub use token::{PromptTokenSource, StaticTokenSource, TokenSource};

/// The user the bootstrap keys belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_name: String,
    pub user_id: String,
    pub arn: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A registered virtual or hardware MFA device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaDevice {
    pub serial_number: String,
    pub user_name: String,
    pub enabled_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait SessionIssuer: Send + Sync {
    /// Look up the user owning `keys`. Also serves as the key validity check.
    async fn identify(&self, keys: &BootstrapKeys) -> Result<Identity>;

    /// Every MFA device registered for `identity`.
    async fn mfa_devices(&self, keys: &BootstrapKeys, identity: &Identity) -> Result<Vec<MfaDevice>>;

    /// Exchange an MFA code for a session lasting `duration`.
    async fn issue_session(
        &self,
        keys: &BootstrapKeys,
        identity: &Identity,
        mfa_code: &str,
        duration: Duration,
    ) -> Result<SessionCredential>;

    /// Serial of the user's single MFA device.
    async fn mfa_serial(&self, keys: &BootstrapKeys, identity: &Identity) -> Result<String> {
        let mut devices = self.mfa_devices(keys, identity).await?;
        match devices.len() {
            0 => Err(Error::NoMfaDevice {
                user: identity.user_name.clone(),
            }),
            1 => Ok(devices.remove(0).serial_number),
            count => Err(Error::MultipleMfaDevices {
                user: identity.user_name.clone(),
                count,
            }),
        }
    }
}
