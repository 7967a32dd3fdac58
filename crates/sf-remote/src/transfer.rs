//! File transfer contract and two chunked implementations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::RemoteError;

/// One progress tick of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    /// Whole-number percentage. An empty transfer is complete.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let pct = (self.bytes_transferred.min(self.total_bytes) * 100) / self.total_bytes;
        u8::try_from(pct).unwrap_or(100)
    }
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub storage_path: String,
    pub download_url: String,
}

/// Content to upload.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Bytes already in memory, with a display name.
    Memory { name: String, data: Arc<[u8]> },
    /// A file on the local filesystem.
    Path(PathBuf),
}

impl FileSource {
    pub fn memory(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Memory {
            name: name.into(),
            data: Arc::from(data.into()),
        }
    }

    /// File name used for the storage path.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Memory { name, .. } => name.clone(),
            Self::Path(path) => path
                .file_name()
                .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().into_owned()),
        }
    }

    /// Total size in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Io`] if a path source cannot be inspected.
    pub async fn size_bytes(&self) -> Result<u64, RemoteError> {
        match self {
            Self::Memory { data, .. } => Ok(data.len() as u64),
            Self::Path(path) => Ok(tokio::fs::metadata(path).await?.len()),
        }
    }

    async fn read_all(&self) -> Result<Arc<[u8]>, RemoteError> {
        match self {
            Self::Memory { data, .. } => Ok(Arc::clone(data)),
            Self::Path(path) => Ok(Arc::from(tokio::fs::read(path).await?)),
        }
    }
}

/// Progress callback handed to a transfer.
pub type ProgressFn<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

/// Object storage for uploaded study files.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Store `source` at `storage_path`, reporting progress per chunk.
    async fn upload(
        &self,
        source: &FileSource,
        storage_path: &str,
        progress: ProgressFn<'_>,
    ) -> Result<StoredObject, RemoteError>;

    /// A fresh download URL for a stored object.
    async fn download_url(&self, storage_path: &str) -> Result<String, RemoteError>;

    async fn delete(&self, storage_path: &str) -> Result<(), RemoteError>;
}

const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// In-memory transfer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Objects {
    stored: BTreeMap<String, Arc<[u8]>>,
    fail_names: Vec<String>,
}

/// In-memory object storage. Clones share state.
#[derive(Clone)]
pub struct MemoryFileTransfer {
    objects: Arc<Mutex<Objects>>,
    chunk_bytes: usize,
    tick_delay: Option<Duration>,
}

impl Default for MemoryFileTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileTransfer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: Arc::default(),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            tick_delay: None,
        }
    }

    #[must_use]
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    /// Sleep between chunks, to make interleaving visible.
    #[must_use]
    pub const fn with_tick_delay(mut self, delay: Duration) -> Self {
        self.tick_delay = Some(delay);
        self
    }

    /// Fail uploads of sources with this name.
    pub fn fail_uploads_named(&self, name: impl Into<String>) {
        self.lock().fail_names.push(name.into());
    }

    fn lock(&self) -> MutexGuard<'_, Objects> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn contains(&self, storage_path: &str) -> bool {
        self.lock().stored.contains_key(storage_path)
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.lock().stored.len()
    }

    fn url_for(storage_path: &str) -> String {
        format!("mem://studyflow/{storage_path}")
    }
}

#[async_trait]
impl FileTransfer for MemoryFileTransfer {
    async fn upload(
        &self,
        source: &FileSource,
        storage_path: &str,
        progress: ProgressFn<'_>,
    ) -> Result<StoredObject, RemoteError> {
        let name = source.name();
        if self.lock().fail_names.contains(&name) {
            return Err(RemoteError::Transport(format!("upload rejected: {name}")));
        }

        let data = source.read_all().await?;
        let total_bytes = data.len() as u64;
        if data.is_empty() {
            progress(TransferProgress {
                bytes_transferred: 0,
                total_bytes: 0,
            });
        }

        let mut sent = 0u64;
        for chunk in data.chunks(self.chunk_bytes) {
            if let Some(delay) = self.tick_delay {
                tokio::time::sleep(delay).await;
            }
            sent += chunk.len() as u64;
            progress(TransferProgress {
                bytes_transferred: sent,
                total_bytes,
            });
        }

        self.lock().stored.insert(storage_path.to_string(), data);
        Ok(StoredObject {
            storage_path: storage_path.to_string(),
            download_url: Self::url_for(storage_path),
        })
    }

    async fn download_url(&self, storage_path: &str) -> Result<String, RemoteError> {
        if self.contains(storage_path) {
            Ok(Self::url_for(storage_path))
        } else {
            Err(RemoteError::NotFound(storage_path.to_string()))
        }
    }

    async fn delete(&self, storage_path: &str) -> Result<(), RemoteError> {
        self.lock()
            .stored
            .remove(storage_path)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(storage_path.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Filesystem transfer
// ---------------------------------------------------------------------------

/// Object storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsFileTransfer {
    root: PathBuf,
    chunk_bytes: usize,
}

impl FsFileTransfer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }

    #[must_use]
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, storage_path: &str) -> Result<PathBuf, RemoteError> {
        if storage_path.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            return Err(RemoteError::Transport(format!(
                "invalid storage path: {storage_path}"
            )));
        }
        Ok(self.root.join(storage_path))
    }

    fn url_for(path: &Path) -> String {
        format!("file://{}", path.display())
    }

    async fn copy_chunks(
        &self,
        source: &FileSource,
        dest: &Path,
        progress: ProgressFn<'_>,
    ) -> Result<(), RemoteError> {
        let total_bytes = source.size_bytes().await?;
        let mut out = tokio::fs::File::create(dest).await?;
        let mut sent = 0u64;

        match source {
            FileSource::Memory { data, .. } => {
                for chunk in data.chunks(self.chunk_bytes) {
                    out.write_all(chunk).await?;
                    sent += chunk.len() as u64;
                    progress(TransferProgress {
                        bytes_transferred: sent,
                        total_bytes,
                    });
                }
            }
            FileSource::Path(path) => {
                let mut input = tokio::fs::File::open(path).await?;
                let mut buf = vec![0u8; self.chunk_bytes];
                loop {
                    let n = input.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    out.write_all(&buf[..n]).await?;
                    sent += n as u64;
                    progress(TransferProgress {
                        bytes_transferred: sent,
                        total_bytes,
                    });
                }
            }
        }

        if sent == 0 {
            progress(TransferProgress {
                bytes_transferred: 0,
                total_bytes: 0,
            });
        }
        out.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl FileTransfer for FsFileTransfer {
    async fn upload(
        &self,
        source: &FileSource,
        storage_path: &str,
        progress: ProgressFn<'_>,
    ) -> Result<StoredObject, RemoteError> {
        let dest = self.resolve(storage_path)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        self.copy_chunks(source, &dest, progress).await?;
        tracing::debug!(storage_path, dest = %dest.display(), "fs transfer: stored");

        Ok(StoredObject {
            storage_path: storage_path.to_string(),
            download_url: Self::url_for(&dest),
        })
    }

    async fn download_url(&self, storage_path: &str) -> Result<String, RemoteError> {
        let path = self.resolve(storage_path)?;
        if tokio::fs::try_exists(&path).await? {
            Ok(Self::url_for(&path))
        } else {
            Err(RemoteError::NotFound(storage_path.to_string()))
        }
    }

    async fn delete(&self, storage_path: &str) -> Result<(), RemoteError> {
        let path = self.resolve(storage_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RemoteError::NotFound(storage_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
