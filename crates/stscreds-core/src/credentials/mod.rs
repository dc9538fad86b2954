//! The two credential tiers and their profile-scoped stores.
//!
//! This module provides:
//! - `BootstrapCredentials`: long-lived keys plus the session expiry marker
//! - `SessionCredentials`: the temporary keys and token for everyday use
//! - `read_fresh_field`: the expiry-checked read behind `stscreds read`

pub mod bootstrap;
pub mod session;
pub mod types;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

pub use bootstrap::{verify_keys, BootstrapCredentials, VerifiedKeys};
pub use session::SessionCredentials;
pub use types::{BootstrapKeys, SessionCredential, SessionField};

/// Read one session field, signalling `ExpiredCredentials` if the marker has passed.
///
/// With no marker yet the read goes straight to the session store, so a
/// profile that never authenticated fails with a not-found error rather
/// than an expiry.
pub fn read_fresh_field(
    bootstrap: &BootstrapCredentials,
    session: &SessionCredentials,
    field: SessionField,
    now: DateTime<Utc>,
) -> Result<String> {
    if bootstrap.is_expired(now)? {
        return Err(Error::ExpiredCredentials {
            profile: bootstrap.profile().to_string(),
        });
    }
    session.read_field(field)
}
