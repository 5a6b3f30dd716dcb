//! Advisory lock against overlapping runs

use anyhow::{Context, Result, bail};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Held for the duration of a run. The lock file is removed on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = std::fs::read_to_string(path).unwrap_or_default();
                bail!(
                    "Another run holds the lock {} (pid {}). Remove the file if that run is gone.",
                    path.display(),
                    holder.trim()
                );
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create lock file: {}", path.display()));
            }
        };

        // From here on the file belongs to us and is removed on any failure
        let lock = Self {
            path: path.to_path_buf(),
        };
        lock.record_holder(&mut file)
    }

    fn record_holder(self, file: &mut impl Write) -> Result<Self> {
        write!(file, "{}", std::process::id())
            .with_context(|| format!("Failed to write lock file: {}", self.path.display()))?;
        debug!("Acquired run lock {}", self.path.display());
        Ok(self)
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        } else {
            debug!("Released run lock {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails_while_held() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state/navsync.lock");

        let lock = RunLock::acquire(&path)?;
        assert!(path.exists());
        assert_eq!(
            std::fs::read_to_string(&path)?,
            std::process::id().to_string()
        );

        let second = RunLock::acquire(&path);
        assert!(second.is_err());
        assert!(second.unwrap_err().to_string().contains("Another run holds the lock"));

        drop(lock);
        assert!(!path.exists());

        // Free again once released
        let _again = RunLock::acquire(&path)?;
        Ok(())
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_pid_write_releases_the_lock() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("navsync.lock");
        std::fs::write(&path, "")?;

        let lock = RunLock { path: path.clone() };
        let result = lock.record_holder(&mut BrokenWriter);

        assert!(result.unwrap_err().to_string().contains("Failed to write lock file"));
        assert!(!path.exists());

        // A later run is not refused
        let _next = RunLock::acquire(&path)?;
        Ok(())
    }
}
