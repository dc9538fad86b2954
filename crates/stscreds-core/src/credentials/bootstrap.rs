use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use super::types::{BootstrapKeys, ACCESS_KEY_ID, EXPIRY_MARKER, SECRET_ACCESS_KEY};
use crate::error::{Error, Result};
use crate::issuer::{Identity, SessionIssuer};
use crate::store::{ParentDirs, ProfileStore};

/// Bootstrap keys that have passed the issuer's identity check.
///
/// Only `verify_keys` builds one, so unverified keys never reach the store.
#[derive(Debug, Clone)]
pub struct VerifiedKeys {
    keys: BootstrapKeys,
    identity: Identity,
}

impl VerifiedKeys {
    pub fn keys(&self) -> &BootstrapKeys {
        &self.keys
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Confirm `keys` work by asking the issuer who they belong to.
pub async fn verify_keys<I>(issuer: &I, keys: BootstrapKeys) -> Result<VerifiedKeys>
where
    I: SessionIssuer + ?Sized,
{
    match issuer.identify(&keys).await {
        Ok(identity) => {
            debug!(user = %identity.user_name, "Bootstrap keys verified");
            Ok(VerifiedKeys { keys, identity })
        }
        Err(e) => Err(Error::Validation(e.to_string())),
    }
}

/// One profile's long-lived keys and session expiry marker.
pub struct BootstrapCredentials {
    path: PathBuf,
    profile: String,
}

impl BootstrapCredentials {
    pub fn new(path: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            profile: profile.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Write verified keys into this profile's section, creating the store if needed.
    ///
    /// Any previous expiry marker is dropped along with the old keys.
    pub fn initialise(&self, verified: &VerifiedKeys) -> Result<()> {
        let mut store = ProfileStore::load(&self.path)?;
        store.remove_section(&self.profile);
        let mut section = store.section(&self.profile);
        section.set_key(ACCESS_KEY_ID, &verified.keys.access_key_id);
        section.set_key(SECRET_ACCESS_KEY, &verified.keys.secret_access_key);
        store.persist(&self.path, ParentDirs::Create)?;

        info!(profile = %self.profile, path = %self.path.display(), "Bootstrap credentials initialised");
        Ok(())
    }

    /// Whether the backing store exists as a readable regular file.
    ///
    /// A missing file is `Ok(false)`; any other filesystem problem is an error.
    pub fn exists(&self) -> Result<bool> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::storage_io(&self.path, e.to_string())),
        };
        if !metadata.is_file() {
            return Err(Error::NotARegularFile {
                path: self.path.clone(),
            });
        }
        std::fs::File::open(&self.path).map_err(|e| Error::storage_io(&self.path, e.to_string()))?;
        Ok(true)
    }

    pub fn keys(&self) -> Result<BootstrapKeys> {
        let store = ProfileStore::load(&self.path)?;
        let section = store.get_section(&self.profile, &self.path)?;
        Ok(BootstrapKeys {
            access_key_id: section.get_key(ACCESS_KEY_ID)?,
            secret_access_key: section.get_key(SECRET_ACCESS_KEY)?,
        })
    }

    /// The recorded expiry marker. `Ok(None)` before any session was issued.
    ///
    /// A marker that is not RFC3339 is reported as already expired.
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>> {
        let store = ProfileStore::load(&self.path)?;
        let section = match store.get_section(&self.profile, &self.path) {
            Ok(section) => section,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        if !section.has_key(EXPIRY_MARKER) {
            return Ok(None);
        }

        let raw = section.get_key(EXPIRY_MARKER)?;
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                warn!(profile = %self.profile, marker = %raw, error = %e, "Unreadable expiry marker, treating session as expired");
                Ok(Some(DateTime::<Utc>::MIN_UTC))
            }
        }
    }

    /// Whether the current session is stale at `now`.
    ///
    /// Never true before the first session has been issued.
    pub fn is_expired(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.expires_at()?.is_some_and(|at| now > at))
    }

    /// Overwrite the expiry marker. Idempotent.
    pub fn record_expiry(&self, expires_at: DateTime<Utc>) -> Result<()> {
        let mut store = ProfileStore::load(&self.path)?;
        store.get_section(&self.profile, &self.path)?;
        store
            .section(&self.profile)
            .set_key(EXPIRY_MARKER, &expires_at.to_rfc3339_opts(SecondsFormat::Secs, true));
        store.persist(&self.path, ParentDirs::MustExist)?;

        debug!(profile = %self.profile, %expires_at, "Expiry recorded");
        Ok(())
    }
}
