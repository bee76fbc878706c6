//! Scoped ownership of a downloaded audio file.

use std::io;
use std::ops::Deref;
use std::path::Path;

use tracing::{info, warn};
use vidscribe_core::AudioResource;

/// Delete an audio file if it is still there.
///
/// Returns whether a file was removed. A missing path is not an error, so
/// calling this twice on the same path is harmless.
pub fn remove_audio_file(path: &Path) -> io::Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        // Someone else got there between the check and the removal.
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Async variant of [`remove_audio_file`] for use on the runtime.
pub async fn remove_audio_file_async(path: &Path) -> io::Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Owns an [`AudioResource`] for the duration of one request.
///
/// The backing file is deleted by [`AudioGuard::release_async`] (or the
/// blocking [`AudioGuard::release`]) or, if neither was called, when the
/// guard is dropped. Either way the deletion is
/// attempted once.
#[derive(Debug)]
pub struct AudioGuard {
    resource: AudioResource,
    released: bool,
}

impl AudioGuard {
    /// Take ownership of a resource's backing file.
    pub fn new(resource: AudioResource) -> Self {
        Self {
            resource,
            released: false,
        }
    }

    pub fn resource(&self) -> &AudioResource {
        &self.resource
    }

    /// Whether the deletion has already been attempted.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Delete the backing file now. Later calls do nothing.
    pub fn release(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let path = self.resource.path();
        if remove_audio_file(path)? {
            info!(path = %path.display(), "Deleted temp audio file");
        }
        Ok(())
    }

    /// Same as [`AudioGuard::release`] without blocking a runtime worker.
    pub async fn release_async(&mut self) -> io::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let path = self.resource.path();
        if remove_audio_file_async(path).await? {
            info!(path = %path.display(), "Deleted temp audio file");
        }
        Ok(())
    }
}

impl Deref for AudioGuard {
    type Target = AudioResource;

    fn deref(&self) -> &Self::Target {
        &self.resource
    }
}

impl Drop for AudioGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(
                path = %self.resource.path().display(),
                error = %e,
                "Failed to delete temp audio file"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;
    use vidscribe_core::AudioFormat;

    use super::*;

    fn resource_in(dir: &Path, name: &str, bytes: usize) -> AudioResource {
        let path = dir.join(name);
        fs::write(&path, vec![0u8; bytes]).unwrap();
        AudioResource::new(path, bytes as u64, AudioFormat::Mp3)
    }

    #[test]
    fn test_release_deletes_file() {
        let temp = tempdir().unwrap();
        let resource = resource_in(temp.path(), "a.mp3", 2000);
        let path = resource.path().to_path_buf();

        let mut guard = AudioGuard::new(resource);
        guard.release().unwrap();

        assert!(!path.exists());
        assert!(guard.is_released());
    }

    #[test]
    fn test_double_release_is_noop() {
        let temp = tempdir().unwrap();
        let mut guard = AudioGuard::new(resource_in(temp.path(), "a.mp3", 2000));

        guard.release().unwrap();
        guard.release().unwrap();
    }

    #[test]
    fn test_drop_deletes_file() {
        let temp = tempdir().unwrap();
        let resource = resource_in(temp.path(), "a.mp3", 2000);
        let path = resource.path().to_path_buf();

        {
            let guard = AudioGuard::new(resource);
            assert_eq!(guard.size_bytes(), 2000);
            assert!(path.exists());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_drop_after_release_leaves_other_files() {
        let temp = tempdir().unwrap();
        let resource = resource_in(temp.path(), "a.mp3", 2000);
        let mut guard = AudioGuard::new(resource.clone());
        guard.release().unwrap();

        // A new file at the same path must not be removed by the old guard.
        fs::write(resource.path(), b"new").unwrap();
        drop(guard);

        assert!(resource.path().exists());
    }

    #[tokio::test]
    async fn test_release_async_deletes_once() {
        let temp = tempdir().unwrap();
        let resource = resource_in(temp.path(), "a.mp3", 2000);
        let mut guard = AudioGuard::new(resource.clone());

        guard.release_async().await.unwrap();
        assert!(!resource.path().exists());
        assert!(guard.is_released());

        // Neither a second release nor the drop touches a new file there
        fs::write(resource.path(), b"new").unwrap();
        guard.release_async().await.unwrap();
        guard.release().unwrap();
        drop(guard);
        assert!(resource.path().exists());
    }

    #[tokio::test]
    async fn test_remove_async_missing_file_and_directory() {
        let temp = tempdir().unwrap();
        let path = resource_in(temp.path(), "a.mp3", 10).path().to_path_buf();

        assert!(remove_audio_file_async(&path).await.unwrap());
        assert!(!remove_audio_file_async(&path).await.unwrap());
        assert!(!remove_audio_file_async(temp.path()).await.unwrap());
        assert!(temp.path().exists());
    }

    #[test]
    fn test_remove_missing_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.mp3");
        assert!(!remove_audio_file(&path).unwrap());
        assert!(!remove_audio_file(&path).unwrap());
    }

    #[test]
    fn test_remove_ignores_directories() {
        let temp = tempdir().unwrap();
        assert!(!remove_audio_file(temp.path()).unwrap());
        assert!(temp.path().exists());
    }
}
