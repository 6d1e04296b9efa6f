use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::{Error, Result};

/// Physical storage primitives consumed by the tree store.
///
/// The store only ever touches bytes through this trait, which keeps the metadata
/// logic independent of where files actually live.
#[async_trait]
pub trait StorageBackend: fmt::Debug + Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Creates a directory and any missing parents.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Removes a file, or a directory with everything inside it.
    ///
    /// Removing something that does not exist is not an error.
    async fn remove(&self, path: &Path) -> Result<()>;

    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Replaces the whole content of `path` with `contents`.
    async fn write_string(&self, path: &Path, contents: &str) -> Result<()>;

    /// Copies the bytes at `from` to `to`, leaving `from` untouched.
    ///
    /// On success `to` exists with the full content; on failure it does not exist.
    async fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Returns the size of the file at `path`, or `None` if nothing is there.
    async fn file_size(&self, path: &Path) -> Result<Option<u64>>;
}

/// [`StorageBackend`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Error::Io)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(Error::Io)
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        let meta = match fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Nothing to remove at {}", path.display());
                return Ok(());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let result = if meta.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).await.map_err(Error::Io)
    }

    async fn write_string(&self, path: &Path, contents: &str) -> Result<()> {
        let staging = staging_path(path);
        if let Err(e) = fs::write(&staging, contents).await {
            discard(&staging).await;
            return Err(Error::Io(e));
        }
        fs::rename(&staging, path).await.map_err(Error::Io)
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let staging = staging_path(to);
        if let Err(e) = fs::copy(from, &staging).await {
            discard(&staging).await;
            return Err(Error::Io(e));
        }
        if let Err(e) = fs::rename(&staging, to).await {
            discard(&staging).await;
            return Err(Error::Io(e));
        }
        Ok(())
    }

    async fn file_size(&self, path: &Path) -> Result<Option<u64>> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Sibling path used to stage writes before they are renamed into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to clean up partial file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_copy_leaves_source_and_no_staging_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, "hello").await.unwrap();

        LocalStorage.copy(&src, &dst).await.unwrap();

        assert_eq!(fs::read_to_string(&src).await.unwrap(), "hello");
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "hello");
        assert!(!staging_path(&dst).exists());
    }

    #[tokio::test]
    async fn test_copy_missing_source_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("dst.txt");

        let result = LocalStorage.copy(&dir.path().join("missing"), &dst).await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!dst.exists());
        assert!(!staging_path(&dst).exists());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_recursive() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).await.unwrap();
        fs::write(nested.join("f"), "x").await.unwrap();

        LocalStorage.remove(&dir.path().join("a")).await.unwrap();
        assert!(!dir.path().join("a").exists());

        LocalStorage.remove(&dir.path().join("a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_size_of_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("f");
        assert_eq!(LocalStorage.file_size(&file).await.unwrap(), None);

        fs::write(&file, [0u8; 7]).await.unwrap();
        assert_eq!(LocalStorage.file_size(&file).await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_write_string_replaces_content() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("doc.json");

        LocalStorage.write_string(&file, "first").await.unwrap();
        LocalStorage.write_string(&file, "second").await.unwrap();

        assert_eq!(LocalStorage.read_to_string(&file).await.unwrap(), "second");
    }

    #[test]
    fn test_staging_path_appends_suffix() {
        assert_eq!(staging_path(Path::new("/x/abc.pdf")), PathBuf::from("/x/abc.pdf.part"));
    }
}
