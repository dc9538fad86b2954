//! IAM and STS backed session issuer.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sts::primitives::DateTime as AwsDateTime;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{Identity, MfaDevice, SessionIssuer};
use crate::credentials::{BootstrapKeys, SessionCredential};
use crate::error::{Error, Result};

/// Provider name attached to the static bootstrap credentials.
const PROVIDER_NAME: &str = "stscreds-bootstrap";

/// STS error code for a rejected request; with an MFA message it means a bad code.
const ACCESS_DENIED: &str = "AccessDenied";

/// Issues sessions through IAM `GetUser`/`ListMFADevices` and STS `GetSessionToken`.
#[derive(Debug, Clone)]
pub struct AwsSessionIssuer {
    region: String,
}

impl AwsSessionIssuer {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    async fn sdk_config(&self, keys: &BootstrapKeys) -> SdkConfig {
        let credentials = Credentials::new(
            keys.access_key_id.clone(),
            keys.secret_access_key.clone(),
            None,
            None,
            PROVIDER_NAME,
        );
        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await
    }
}

#[async_trait]
impl SessionIssuer for AwsSessionIssuer {
    async fn identify(&self, keys: &BootstrapKeys) -> Result<Identity> {
        let iam = aws_sdk_iam::Client::new(&self.sdk_config(keys).await);
        let output = iam
            .get_user()
            .send()
            .await
            .map_err(|e| remote_error("couldn't request current user", e))?;
        let user = output
            .user()
            .ok_or_else(|| Error::Remote("GetUser returned no user".into()))?;

        debug!(user = user.user_name(), "Identified bootstrap user");
        Ok(Identity {
            user_name: user.user_name().to_string(),
            user_id: user.user_id().to_string(),
            arn: user.arn().to_string(),
            created_at: to_chrono(user.create_date()),
        })
    }

    async fn mfa_devices(&self, keys: &BootstrapKeys, identity: &Identity) -> Result<Vec<MfaDevice>> {
        let iam = aws_sdk_iam::Client::new(&self.sdk_config(keys).await);
        let output = iam
            .list_mfa_devices()
            .user_name(&identity.user_name)
            .send()
            .await
            .map_err(|e| remote_error("couldn't list mfa devices", e))?;

        Ok(output
            .mfa_devices()
            .iter()
            .map(|device| MfaDevice {
                serial_number: device.serial_number().to_string(),
                user_name: device.user_name().to_string(),
                enabled_at: to_chrono(device.enable_date()),
            })
            .collect())
    }

    async fn issue_session(
        &self,
        keys: &BootstrapKeys,
        identity: &Identity,
        mfa_code: &str,
        duration: Duration,
    ) -> Result<SessionCredential> {
        let serial = self.mfa_serial(keys, identity).await?;
        let duration_seconds = i32::try_from(duration.as_secs())
            .map_err(|_| Error::Config(format!("session duration too long: {:?}", duration)))?;

        let sts = aws_sdk_sts::Client::new(&self.sdk_config(keys).await);
        let output = sts
            .get_session_token()
            .duration_seconds(duration_seconds)
            .serial_number(&serial)
            .token_code(mfa_code)
            .send()
            .await
            .map_err(|e| {
                if is_invalid_token(&e) {
                    Error::InvalidToken(DisplayErrorContext(&e).to_string())
                } else {
                    remote_error("error requesting credentials", e)
                }
            })?;

        let credentials = output
            .credentials()
            .ok_or_else(|| Error::Remote("GetSessionToken returned no credentials".into()))?;
        let expires_at = to_chrono(credentials.expiration())
            .ok_or_else(|| Error::Remote("GetSessionToken returned an invalid expiration".into()))?;

        info!(user = %identity.user_name, %expires_at, "Session issued");
        Ok(SessionCredential {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expires_at,
        })
    }
}

fn is_invalid_token<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.as_service_error()
        .map(|e| {
            e.code() == Some(ACCESS_DENIED)
                && e.message()
                    .is_some_and(|m| m.contains("MultiFactorAuthentication"))
        })
        .unwrap_or(false)
}

fn remote_error<E, R>(context: &str, err: SdkError<E, R>) -> Error
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    Error::Remote(format!("{}: {}", context, DisplayErrorContext(&err)))
}

fn to_chrono(at: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(at.secs(), at.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_chrono() {
        let at = AwsDateTime::from_secs_and_nanos(1_700_000_000, 500);
        let converted = to_chrono(&at).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
        assert_eq!(converted.timestamp_subsec_nanos(), 500);
    }
}
