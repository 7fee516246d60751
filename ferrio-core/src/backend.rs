use crate::error::Result;
use crate::reference::ObjectName;
use crate::sas::ReadGrant;
use async_trait::async_trait;
use tokio::io::AsyncWrite;

/// Backend-resolved address for a stored object.
///
/// Produced by [`BlobBackend::resolve`]; carries the addressable URL the
/// fetch path embeds in signed links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub name: String,
    pub url: String,
}

/// Contract the storage facade and health monitor consume.
///
/// Implementations talk to one container of a remote blob store. Health
/// polling only ever calls [`container_exists`](Self::container_exists),
/// so sharing one backend between the facade and its monitor carries no
/// write contention.
#[async_trait]
pub trait BlobBackend: Send + Sync + 'static {
    /// Map a validated name onto this backend's addressing scheme.
    ///
    /// Fails with [`FerrioError::InvalidReference`] for names the scheme
    /// cannot embed.
    ///
    /// [`FerrioError::InvalidReference`]: crate::FerrioError::InvalidReference
    fn resolve(&self, name: &ObjectName) -> Result<BlobRef>;

    /// Whether the backing container is present and reachable.
    async fn container_exists(&self) -> Result<bool>;

    async fn blob_exists(&self, blob: &BlobRef) -> Result<bool>;

    /// Open a write stream for the blob. The object becomes durable, and
    /// its checksum available, once the writer is shut down.
    async fn open_write(&self, blob: &BlobRef) -> Result<Box<dyn AsyncWrite + Send + Unpin>>;

    /// Content-integrity checksum recorded by the backend for a written blob.
    async fn checksum(&self, blob: &BlobRef) -> Result<String>;

    /// Delete the blob if present; returns whether anything was removed.
    async fn delete_if_exists(&self, blob: &BlobRef) -> Result<bool>;

    /// Produce the signed, read-only query component for a fetch link.
    fn sign_read_url(&self, blob: &BlobRef, grant: &ReadGrant) -> Result<String>;
}
