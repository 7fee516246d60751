use crate::backend::{BlobBackend, BlobRef};
use crate::error::{FerrioError, Result};
use crate::reference::ObjectName;
use crate::sas::{AccessLevel, ReadGrant};
use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// In-process [`BlobBackend`] backed by a blob map.
///
/// Serves local deployments and integration tests: real checksums, real
/// signed query strings, no network. Containers are "created" by
/// constructing the backend; [`unavailable`](MemoryBackend::unavailable)
/// builds one whose container never exists, for exercising initialization
/// and health failure paths.
pub struct MemoryBackend {
    container: String,
    endpoint: String,
    signing_key: Vec<u8>,
    available: bool,
    blobs: Arc<Mutex<HashMap<String, StoredBlob>>>,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    checksum: String,
}

impl MemoryBackend {
    pub fn new(container: impl Into<String>, signing_key: impl Into<Vec<u8>>) -> Self {
        Self {
            container: container.into(),
            endpoint: "https://blob.ferrio.local".to_string(),
            signing_key: signing_key.into(),
            available: true,
            blobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A backend whose container does not exist. Existence probes return
    /// false; everything else behaves normally.
    pub fn unavailable(container: impl Into<String>) -> Self {
        Self {
            available: false,
            ..Self::new(container, b"unavailable".to_vec())
        }
    }

    /// Raw stored bytes, for test assertions.
    pub fn blob_data(&self, name: &str) -> Option<Bytes> {
        self.blobs
            .lock()
            .expect("blob map lock poisoned")
            .get(name)
            .map(|blob| blob.data.clone())
    }

    fn signature(&self, canonical: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.signing_key);
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl BlobBackend for MemoryBackend {
    fn resolve(&self, name: &ObjectName) -> Result<BlobRef> {
        // These can't be embedded in the path component of a blob URL.
        if name.as_str().contains(['?', '#', '\\']) {
            return Err(FerrioError::InvalidReference(format!(
                "name '{}' cannot be addressed by the memory backend",
                name
            )));
        }
        Ok(BlobRef {
            name: name.as_str().to_string(),
            url: format!("{}/{}/{}", self.endpoint, self.container, name),
        })
    }

    async fn container_exists(&self) -> Result<bool> {
        Ok(self.available)
    }

    async fn blob_exists(&self, blob: &BlobRef) -> Result<bool> {
        Ok(self
            .blobs
            .lock()
            .expect("blob map lock poisoned")
            .contains_key(&blob.name))
    }

    async fn open_write(&self, blob: &BlobRef) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
        Ok(Box::new(MemoryWriter {
            name: blob.name.clone(),
            buffer: Vec::new(),
            blobs: self.blobs.clone(),
            committed: false,
        }))
    }

    async fn checksum(&self, blob: &BlobRef) -> Result<String> {
        self.blobs
            .lock()
            .expect("blob map lock poisoned")
            .get(&blob.name)
            .map(|stored| stored.checksum.clone())
            .ok_or_else(|| {
                FerrioError::backend(
                    format!("no checksum recorded for '{}'", blob.name),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "blob missing"),
                )
            })
    }

    async fn delete_if_exists(&self, blob: &BlobRef) -> Result<bool> {
        Ok(self
            .blobs
            .lock()
            .expect("blob map lock poisoned")
            .remove(&blob.name)
            .is_some())
    }

    fn sign_read_url(&self, blob: &BlobRef, grant: &ReadGrant) -> Result<String> {
        let permissions = match grant.access {
            AccessLevel::ReadOnly => "r",
        };
        let expiry = grant.expires_at.to_rfc3339();
        let canonical = format!("{}\n{}\n{}", blob.name, expiry, permissions);
        Ok(format!(
            "se={}&sp={}&sig={}",
            expiry,
            permissions,
            self.signature(&canonical)
        ))
    }
}

/// Write stream for a single blob; the blob becomes visible in the map,
/// with its checksum, only on shutdown.
struct MemoryWriter {
    name: String,
    buffer: Vec<u8>,
    blobs: Arc<Mutex<HashMap<String, StoredBlob>>>,
    committed: bool,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.buffer.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        if !self.committed {
            let data = Bytes::from(std::mem::take(&mut self.buffer));
            let checksum = content_checksum(&data);
            self.blobs
                .lock()
                .expect("blob map lock poisoned")
                .insert(self.name.clone(), StoredBlob { data, checksum });
            self.committed = true;
        }
        Poll::Ready(Ok(()))
    }
}

/// Hex SHA-256 of blob content; the checksum reported back to store callers.
pub fn content_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
