use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::{SessionCredential, SessionField};
use crate::error::Result;
use crate::store::profile::create_private_dir;
use crate::store::{ParentDirs, ProfileStore};

/// One profile's temporary credentials in the shared session store.
///
/// Kept in a separate file from the bootstrap keys. The expiry is not stored
/// here; the bootstrap side owns the marker.
pub struct SessionCredentials {
    path: PathBuf,
    profile: String,
}

impl SessionCredentials {
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

    /// Create the directory holding the session store if it is missing.
    pub fn ensure_store_dir(&self) -> Result<()> {
        match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) if !parent.is_dir() => {
                debug!(dir = %parent.display(), "Creating session store directory");
                create_private_dir(parent)
            }
            _ => Ok(()),
        }
    }

    /// Replace this profile's section with `credential`. Other profiles are untouched.
    pub fn save(&self, credential: &SessionCredential) -> Result<()> {
        let mut store = ProfileStore::load(&self.path)?;
        store.remove_section(&self.profile);
        let mut section = store.section(&self.profile);
        for field in SessionField::ALL {
            section.set_key(field.key(), credential.field(field));
        }
        store.persist(&self.path, ParentDirs::MustExist)?;

        info!(profile = %self.profile, path = %self.path.display(), "Session credentials saved");
        Ok(())
    }

    pub fn read_field(&self, field: SessionField) -> Result<String> {
        let store = ProfileStore::load(&self.path)?;
        store
            .get_section(&self.profile, &self.path)?
            .get_key(field.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn credential(suffix: &str) -> SessionCredential {
        SessionCredential {
            access_key_id: format!("ASIA{}", suffix),
            secret_access_key: format!("secret/{}+=", suffix),
            session_token: format!("FwoGZXIvYXdz{}==", suffix),
            expires_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_save_then_read_each_field() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionCredentials::new(dir.path().join("credentials"), "default");
        let cred = credential("ONE");
        session.save(&cred).unwrap();

        for field in SessionField::ALL {
            assert_eq!(session.read_field(field).unwrap(), cred.field(field));
        }
    }

    #[test]
    fn test_save_replaces_whole_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(
            &path,
            "[default]\naws_access_key_id = OLD\nregion = us-east-1\n\n[other]\naws_access_key_id = KEEP\n",
        )
        .unwrap();

        let session = SessionCredentials::new(&path, "default");
        session.save(&credential("NEW")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("OLD"));
        assert!(!contents.contains("region"));
        assert!(contents.contains("KEEP"));
        assert_eq!(
            session.read_field(SessionField::AccessKeyId).unwrap(),
            "ASIANEW"
        );
        assert_eq!(
            SessionCredentials::new(&path, "other")
                .read_field(SessionField::AccessKeyId)
                .unwrap(),
            "KEEP"
        );
    }

    #[test]
    fn test_save_keeps_backslashes_in_other_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(&path, "[other]\ncredential_process = C:\\Users\\me\\get.exe\n").unwrap();

        SessionCredentials::new(&path, "default")
            .save(&credential("NEW"))
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains(r"C:\Users\me\get.exe"), "{}", contents);
    }

    #[test]
    fn test_expiry_not_duplicated_in_session_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        SessionCredentials::new(&path, "default")
            .save(&credential("X"))
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("expire"));
    }

    #[test]
    fn test_read_before_any_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionCredentials::new(dir.path().join("credentials"), "default");
        let err = session.read_field(SessionField::SessionToken).unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_expired());
    }

    #[test]
    fn test_ensure_store_dir() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionCredentials::new(dir.path().join(".aws").join("credentials"), "default");
        assert!(session.save(&credential("X")).is_err());

        session.ensure_store_dir().unwrap();
        session.save(&credential("X")).unwrap();
        assert!(dir.path().join(".aws").is_dir());
    }
}
