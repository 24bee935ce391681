/// Save-as targets for received media.
///
/// A body is first materialized into an [`ObjectHandle`], then saved under
/// its final name, and the handle is released. [`HandleGuard`] performs the
/// release exactly once, whichever way the download ends.
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use tubegrab_shared::errors::ClientError;

/// Temporary object holding a fully received body.
#[derive(Debug, PartialEq, Eq)]
pub struct ObjectHandle {
    pub id: Uuid,
    /// Sink-private location of the materialized bytes.
    pub location: PathBuf,
    pub size: u64,
}

/// Destination for the save-as action.
pub trait SaveSink {
    /// Store the blob somewhere temporary and hand back its handle.
    fn materialize(&self, blob: Bytes) -> Result<ObjectHandle, ClientError>;

    /// Persist the handle's bytes under `filename`. Returns where they landed.
    fn save(&self, handle: &ObjectHandle, filename: &str) -> Result<PathBuf, ClientError>;

    /// Drop the temporary object. Must tolerate being called after a failed save.
    fn release(&self, handle: ObjectHandle);
}

/// Owns a materialized handle and releases it on drop.
pub struct HandleGuard<'a, S: SaveSink + ?Sized> {
    sink: &'a S,
    handle: Option<ObjectHandle>,
}

impl<'a, S: SaveSink + ?Sized> HandleGuard<'a, S> {
    pub fn materialize(sink: &'a S, blob: Bytes) -> Result<Self, ClientError> {
        let handle = sink.materialize(blob)?;
        debug!("Materialized object {} ({} bytes)", handle.id, handle.size);
        Ok(Self {
            sink,
            handle: Some(handle),
        })
    }

    pub fn handle(&self) -> Option<&ObjectHandle> {
        self.handle.as_ref()
    }

    pub fn save(&self, filename: &str) -> Result<PathBuf, ClientError> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| ClientError::Storage("object handle already released".into()))?;
        self.sink.save(handle, filename)
    }
}

impl<S: SaveSink + ?Sized> Drop for HandleGuard<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Releasing object {}", handle.id);
            self.sink.release(handle);
        }
    }
}

// ====== DISK SINK ======

/// Saves into a directory, staging bodies in hidden `.part` files.
#[derive(Debug, Clone)]
pub struct DiskSink {
    dir: PathBuf,
}

impl DiskSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SaveSink for DiskSink {
    fn materialize(&self, blob: Bytes) -> Result<ObjectHandle, ClientError> {
        std::fs::create_dir_all(&self.dir)?;
        let id = Uuid::new_v4();
        let location = self.dir.join(format!(".tubegrab-{}.part", id));
        write_new(&location, |file| file.write_all(&blob))?;
        Ok(ObjectHandle {
            id,
            location,
            size: blob.len() as u64,
        })
    }

    fn save(&self, handle: &ObjectHandle, filename: &str) -> Result<PathBuf, ClientError> {
        for target in candidate_paths(&self.dir, filename) {
            let written = write_new(&target, |out| {
                let mut staged = File::open(&handle.location)?;
                std::io::copy(&mut staged, out).map(|_| ())
            });
            match written {
                Ok(()) => return Ok(target),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ClientError::Storage(format!("No free file name for {}", filename)))
    }

    fn release(&self, handle: ObjectHandle) {
        match std::fs::remove_file(&handle.location) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", handle.location.display(), e),
        }
    }
}

/// Create `location`, which must not exist yet, and fill it.
/// A failed fill removes the partial file before the error is returned.
fn write_new<F>(location: &Path, fill: F) -> std::io::Result<()>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    let mut file = OpenOptions::new().write(true).create_new(true).open(location)?;
    if let Err(e) = fill(&mut file) {
        drop(file);
        if let Err(cleanup) = std::fs::remove_file(location) {
            warn!("Failed to remove partial {}: {}", location.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

const MAX_NAME_SUFFIX: u32 = 10_000;

/// `dir/name`, then `dir/stem (n).ext` for increasing `n`.
fn candidate_paths<'a>(dir: &'a Path, filename: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());

    std::iter::once(dir.join(filename)).chain((1..MAX_NAME_SUFFIX).map(move |n| match &ext {
        Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
        None => dir.join(format!("{} ({})", stem, n)),
    }))
}

// ====== MEMORY SINK ======

/// A file the [`MemorySink`] has "saved".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedBlob {
    pub filename: String,
    pub data: Bytes,
}

#[derive(Debug, Default)]
struct MemoryInner {
    live: Vec<(Uuid, Bytes)>,
    saved: Vec<SavedBlob>,
    created: usize,
    released: Vec<Uuid>,
}

/// Keeps everything in memory. Useful for embedding and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryInner>>,
    fail_saves: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `save` always fails, for exercising error paths.
    pub fn failing() -> Self {
        Self {
            inner: Arc::default(),
            fail_saves: true,
        }
    }

    pub fn saved(&self) -> Vec<SavedBlob> {
        self.lock().saved.clone()
    }

    pub fn created_count(&self) -> usize {
        self.lock().created
    }

    pub fn released(&self) -> Vec<Uuid> {
        self.lock().released.clone()
    }

    /// Handles materialized but not yet released.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SaveSink for MemorySink {
    fn materialize(&self, blob: Bytes) -> Result<ObjectHandle, ClientError> {
        let id = Uuid::new_v4();
        let size = blob.len() as u64;
        let mut inner = self.lock();
        inner.created += 1;
        inner.live.push((id, blob));
        Ok(ObjectHandle {
            id,
            location: PathBuf::from(format!("memory:{}", id)),
            size,
        })
    }

    fn save(&self, handle: &ObjectHandle, filename: &str) -> Result<PathBuf, ClientError> {
        if self.fail_saves {
            return Err(ClientError::Storage("save rejected".into()));
        }
        let mut inner = self.lock();
        let data = inner
            .live
            .iter()
            .find(|(id, _)| *id == handle.id)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| ClientError::Storage(format!("unknown object {}", handle.id)))?;
        inner.saved.push(SavedBlob {
            filename: filename.to_string(),
            data,
        });
        Ok(PathBuf::from(filename))
    }

    fn release(&self, handle: ObjectHandle) {
        let mut inner = self.lock();
        inner.live.retain(|(id, _)| *id != handle.id);
        inner.released.push(handle.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_once_on_success() {
        let sink = MemorySink::new();
        let id = {
            let guard = HandleGuard::materialize(&sink, Bytes::from_static(b"abc")).unwrap();
            guard.save("clip.mp4").unwrap();
            let id = guard.handle().unwrap().id;
            id
        };
        assert_eq!(sink.released(), vec![id]);
        assert_eq!(sink.live_count(), 0);
        assert_eq!(sink.saved()[0].filename, "clip.mp4");
    }

    #[test]
    fn test_guard_releases_once_on_failure() {
        let sink = MemorySink::failing();
        {
            let guard = HandleGuard::materialize(&sink, Bytes::from_static(b"abc")).unwrap();
            assert!(guard.save("clip.mp4").is_err());
        }
        assert_eq!(sink.created_count(), 1);
        assert_eq!(sink.released().len(), 1);
        assert!(sink.saved().is_empty());
    }

    #[test]
    fn test_disk_sink_saves_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiskSink::new(dir.path());
        let saved = {
            let guard = HandleGuard::materialize(&sink, Bytes::from_static(b"media")).unwrap();
            let part = guard.handle().unwrap().location.clone();
            assert!(part.exists());
            let saved = guard.save("clip.mp4").unwrap();
            drop(guard);
            assert!(!part.exists());
            saved
        };
        assert_eq!(saved, dir.path().join("clip.mp4"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"media");
    }

    #[test]
    fn test_disk_sink_does_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"old").unwrap();
        std::fs::write(dir.path().join("clip (1).mp4"), b"old").unwrap();

        let sink = DiskSink::new(dir.path());
        let guard = HandleGuard::materialize(&sink, Bytes::from_static(b"new")).unwrap();
        let saved = guard.save("clip.mp4").unwrap();
        assert_eq!(saved, dir.path().join("clip (2).mp4"));
        assert_eq!(std::fs::read(dir.path().join("clip.mp4")).unwrap(), b"old");
    }

    #[test]
    fn test_failed_staging_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join(".tubegrab-partial.part");
        let err = write_new(&location, |file| {
            file.write_all(b"half a body")?;
            Err(std::io::Error::new(ErrorKind::Other, "No space left on device"))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "No space left on device");
        assert!(!location.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_new_never_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("clip.mp4");
        std::fs::write(&target, b"old").unwrap();

        let err = write_new(&target, |file| file.write_all(b"new")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&target).unwrap(), b"old");
    }

    #[test]
    fn test_release_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiskSink::new(dir.path());
        let handle = sink.materialize(Bytes::from_static(b"x")).unwrap();
        std::fs::remove_file(&handle.location).unwrap();
        sink.release(handle);
    }
}
