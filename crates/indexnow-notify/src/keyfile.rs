use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{8,128}$").expect("static key pattern"));

/// Checks an IndexNow key against `^[A-Za-z0-9_-]{8,128}$`.
pub fn validate_api_key(api_key: &str) -> Result<()> {
    if KEY_PATTERN.is_match(api_key) {
        Ok(())
    } else {
        Err(Error::InvalidApiKey)
    }
}

/// Generate an IndexNow key: 32 random lowercase hex chars.
pub fn generate_api_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    hex::encode(bytes)
}

/// Publishes `<api_key>.txt` at the site's document root.
#[derive(Debug, Clone)]
pub struct KeyFileManager {
    site_root: PathBuf,
}

impl KeyFileManager {
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
        }
    }

    /// Where the key file for `api_key` lives. Path components in the key
    /// are dropped.
    pub fn key_file_path(&self, api_key: &str) -> PathBuf {
        self.site_root.join(key_file_name(api_key))
    }

    /// Make sure the key file exists. Returns false when the key is malformed,
    /// the path escapes the site root, or the file cannot be written.
    ///
    /// An existing file is trusted as-is and never rewritten.
    pub fn ensure_key_file(&self, api_key: &str) -> bool {
        match self.try_ensure(api_key) {
            Ok(true) => {
                info!(path = %self.key_file_path(api_key).display(), "created IndexNow key file");
                true
            }
            Ok(false) => true,
            Err(e) => {
                warn!(error = %e, "IndexNow key file unavailable");
                false
            }
        }
    }

    /// Returns `Ok(true)` when the file was written by this call.
    fn try_ensure(&self, api_key: &str) -> Result<bool> {
        validate_api_key(api_key)?;

        let file_name = key_file_name(api_key);
        let root = self.site_root.canonicalize()?;
        let target = self.site_root.join(&file_name);

        // An existing entry (possibly a symlink) is resolved as a whole so a
        // link pointing out of the root is caught.
        let resolved = if fs::symlink_metadata(&target).is_ok() {
            target.canonicalize()?
        } else {
            let parent = target.parent().unwrap_or(&self.site_root);
            parent.canonicalize()?.join(&file_name)
        };

        if !is_strictly_inside(&resolved, &root) {
            return Err(Error::OutsideSiteRoot(resolved));
        }

        if resolved.exists() {
            debug!(path = %resolved.display(), "key file already present");
            return Ok(false);
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&resolved)
        {
            Ok(file) => {
                write_or_remove(&resolved, file, api_key)?;
                Ok(true)
            }
            // Another process won the race; its content is identical.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `contents` to a freshly created file. The file is removed again if
/// the write fails.
fn write_or_remove<W: Write>(path: &Path, mut file: W, contents: &str) -> std::io::Result<()> {
    let result = file.write_all(contents.as_bytes()).and_then(|()| file.flush());
    if let Err(e) = result {
        drop(file);
        if let Err(rm) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %rm, "could not remove partial key file");
        }
        return Err(e);
    }
    Ok(())
}

fn key_file_name(api_key: &str) -> String {
    let base = Path::new(api_key)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{base}.txt")
}

fn is_strictly_inside(path: &Path, root: &Path) -> bool {
    path != root && path.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6";

    #[test]
    fn creates_key_file_with_exact_content() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = KeyFileManager::new(dir.path());

        assert!(mgr.ensure_key_file(KEY));
        let content = fs::read_to_string(dir.path().join(format!("{KEY}.txt"))).unwrap();
        assert_eq!(content, KEY);
    }

    #[test]
    fn ensure_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = KeyFileManager::new(dir.path());
        let path = mgr.key_file_path(KEY);

        assert!(mgr.ensure_key_file(KEY));
        let first = fs::read(&path).unwrap();
        assert!(mgr.ensure_key_file(KEY));
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn existing_file_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = KeyFileManager::new(dir.path());
        let path = mgr.key_file_path(KEY);
        fs::write(&path, "something else").unwrap();

        assert!(mgr.ensure_key_file(KEY));
        assert_eq!(fs::read_to_string(&path).unwrap(), "something else");
    }

    #[test]
    fn length_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = KeyFileManager::new(dir.path());

        assert!(!mgr.ensure_key_file(&"a".repeat(7)));
        assert!(mgr.ensure_key_file(&"b".repeat(8)));
        assert!(mgr.ensure_key_file(&"c".repeat(128)));
        assert!(!mgr.ensure_key_file(&"d".repeat(129)));

        assert!(!dir.path().join(format!("{}.txt", "a".repeat(7))).exists());
        assert!(!dir.path().join(format!("{}.txt", "d".repeat(129))).exists());
    }

    #[test]
    fn rejects_traversal_and_separators() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = KeyFileManager::new(dir.path().join("public"));
        fs::create_dir(dir.path().join("public")).unwrap();

        for key in ["../escape-key", "abc/defghijk", "..", "abcd..efgh", "key with spaces"] {
            assert!(!mgr.ensure_key_file(key), "accepted {key:?}");
        }
        assert_eq!(fs::read_dir(dir.path().join("public")).unwrap().count(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn rejects_empty_key() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!KeyFileManager::new(dir.path()).ensure_key_file(""));
    }

    #[test]
    fn missing_site_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = KeyFileManager::new(dir.path().join("does-not-exist"));
        assert!(!mgr.ensure_key_file(KEY));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_out_of_root() {
        let outside = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let victim = outside.path().join("victim.txt");
        fs::write(&victim, "original").unwrap();
        std::os::unix::fs::symlink(&victim, root.path().join(format!("{KEY}.txt"))).unwrap();

        let mgr = KeyFileManager::new(root.path());
        assert!(!mgr.ensure_key_file(KEY));
        assert_eq!(fs::read_to_string(&victim).unwrap(), "original");
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_leaves_no_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = KeyFileManager::new(dir.path());
        let path = mgr.key_file_path(KEY);
        fs::File::create(&path).unwrap();

        assert!(write_or_remove(&path, FullDisk, KEY).is_err());
        assert!(!path.exists());

        // The next call creates the file properly.
        assert!(mgr.ensure_key_file(KEY));
        assert_eq!(fs::read_to_string(&path).unwrap(), KEY);
    }

    #[test]
    fn key_file_name_strips_path_components() {
        assert_eq!(key_file_name("dir/abcdefgh"), "abcdefgh.txt");
        assert_eq!(key_file_name(KEY), format!("{KEY}.txt"));
    }

    #[test]
    fn generated_keys_are_valid() {
        let key = generate_api_key();
        assert_eq!(key.len(), 32);
        assert!(validate_api_key(&key).is_ok());
        assert_ne!(key, generate_api_key());
    }
}
