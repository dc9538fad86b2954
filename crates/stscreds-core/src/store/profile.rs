use std::io::Write;
use std::path::{Path, PathBuf};

use ini::{EscapePolicy, Ini, ParseOption, Properties, WriteOption};
use tracing::debug;

use crate::error::{Error, Result};

/// Whether `persist` may create the store's parent directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentDirs {
    /// Create the parent directory (0700 on unix) if it is missing.
    Create,
    /// Fail if the parent directory is missing.
    MustExist,
}

/// Section-per-profile key/value store backed by an INI file.
///
/// Every change is load-modify-save: callers `load`, mutate in memory and
/// `persist` the whole file back. Two processes persisting the same path
/// are not coordinated; the last writer wins.
pub struct ProfileStore {
    ini: Ini,
}

/// Mutable view of a single profile section.
pub struct SectionView<'a> {
    props: &'a mut Properties,
}

/// Read-only view of a single profile section.
pub struct SectionRef<'a> {
    name: &'a str,
    path: &'a Path,
    props: &'a Properties,
}

impl ProfileStore {
    /// An empty store with no sections.
    pub fn empty() -> Self {
        Self { ini: Ini::new() }
    }

    /// Load the store at `path`. A missing file is an empty store.
    ///
    /// Values are taken literally: no escape or quote processing, so sections
    /// written by other tools survive a load-modify-save unchanged.
    pub fn load(path: &Path) -> Result<Self> {
        let opt = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        match Ini::load_from_file_opt(path, opt) {
            Ok(ini) => {
                debug!(path = %path.display(), "Profile store loaded");
                Ok(Self { ini })
            }
            Err(ini::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Profile store absent, starting empty");
                Ok(Self::empty())
            }
            Err(ini::Error::Io(e)) => Err(Error::storage_io(path, e.to_string())),
            Err(ini::Error::Parse(e)) => Err(Error::StoreParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Mutable view of `profile`, created if absent.
    pub fn section(&mut self, profile: &str) -> SectionView<'_> {
        let props = self
            .ini
            .entry(Some(profile.to_string()))
            .or_insert(Properties::new());
        SectionView { props }
    }

    /// Read-only view of `profile`, if present. `path` is only used for error context.
    pub fn get_section<'a>(&'a self, profile: &'a str, path: &'a Path) -> Result<SectionRef<'a>> {
        self.ini
            .section(Some(profile))
            .map(|props| SectionRef {
                name: profile,
                path,
                props,
            })
            .ok_or_else(|| Error::SectionNotFound {
                section: profile.to_string(),
                path: path.to_path_buf(),
            })
    }

    /// Drop `profile` and every key in it.
    pub fn remove_section(&mut self, profile: &str) {
        self.ini.delete(Some(profile));
    }

    /// Rewrite the whole store at `path`.
    ///
    /// Writes go to a sibling temp file which is then renamed over `path`,
    /// so a crash mid-write leaves the previous contents intact. On unix the
    /// file is created 0600.
    pub fn persist(&self, path: &Path, parents: ParentDirs) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            match parents {
                ParentDirs::Create => create_private_dir(parent)?,
                ParentDirs::MustExist if !parent.is_dir() => {
                    return Err(Error::storage_io(parent, "directory does not exist"));
                }
                ParentDirs::MustExist => {}
            }
        }

        let mut contents = Vec::new();
        let opt = WriteOption {
            escape_policy: EscapePolicy::Nothing,
            ..WriteOption::default()
        };
        self.ini
            .write_to_opt(&mut contents, opt)
            .map_err(|e| Error::storage_io(path, e.to_string()))?;

        let tmp_path = temp_path(path);
        // A leftover from an interrupted write may carry looser permissions.
        match std::fs::remove_file(&tmp_path) {
            Ok(()) => debug!(path = %tmp_path.display(), "Removed stale temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::storage_io(&tmp_path, e.to_string())),
        }

        let result = write_private(&tmp_path, &contents).and_then(|()| {
            std::fs::rename(&tmp_path, path)
                .map_err(|e| Error::storage_io(path, format!("atomic rename: {}", e)))
        });
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
            return result;
        }

        debug!(path = %path.display(), "Profile store saved");
        Ok(())
    }
}

/// Create `path` exclusively (0600 on unix) and write `contents` to it.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| Error::storage_io(path, e.to_string()))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|e| Error::storage_io(path, e.to_string()))
}

impl SectionView<'_> {
    /// Set `key`, replacing any existing value.
    pub fn set_key(&mut self, key: &str, value: &str) {
        self.props.insert(key, value);
    }
}

impl SectionRef<'_> {
    pub fn get_key(&self, key: &str) -> Result<String> {
        lookup(self.props, self.name, key, self.path)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.props.contains_key(key)
    }
}

fn lookup(props: &Properties, section: &str, key: &str, path: &Path) -> Result<String> {
    props
        .get(key)
        .map(str::to_string)
        .ok_or_else(|| Error::KeyNotFound {
            section: section.to_string(),
            key: key.to_string(),
            path: path.to_path_buf(),
        })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Create `dir` and any missing ancestors, 0700 on unix.
pub(crate) fn create_private_dir(dir: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .map_err(|e| Error::storage_io(dir, e.to_string()))
}
