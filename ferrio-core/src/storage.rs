use crate::backend::{BlobBackend, BlobRef};
use crate::config::StorageConfig;
use crate::error::{FerrioError, Result};
use crate::health::HealthMonitor;
use crate::reference::ObjectName;
use crate::sas::SasPolicy;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Facade over one container of a remote blob store.
///
/// Translates caller intent (store/fetch/delete/check) into backend calls
/// and a normalized error taxonomy, and owns exactly one [`HealthMonitor`]
/// for its backend connection. Operations call straight into the backend;
/// they never consult the monitor, which is an independently observable
/// side-channel.
///
/// Error policy: reference-resolution failures surface as
/// [`FerrioError::InvalidReference`] from every operation except
/// [`store`](Self::store), which wraps all failures (resolution included)
/// into a single backend error, matching its all-or-nothing contract.
pub struct BlobStorage {
    backend: Arc<dyn BlobBackend>,
    container: String,
    sas: SasPolicy,
    health: HealthMonitor,
}

impl std::fmt::Debug for BlobStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStorage")
            .field("container", &self.container)
            .field("sas", &self.sas)
            .finish_non_exhaustive()
    }
}

impl BlobStorage {
    /// Connect to the configured container and begin health polling.
    ///
    /// Performs a one-shot existence check; a missing or unreachable
    /// container is fatal here, surfaced as
    /// [`FerrioError::Initialization`].
    pub async fn connect(backend: Arc<dyn BlobBackend>, config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        match backend.container_exists().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(FerrioError::Initialization(format!(
                    "storage container '{}' does not exist",
                    config.container
                )));
            }
            Err(error) => {
                return Err(FerrioError::Initialization(format!(
                    "cannot reach storage container '{}': {}",
                    config.container, error
                )));
            }
        }

        let health = HealthMonitor::start(
            backend.clone(),
            config.container.clone(),
            config.poll_interval(),
        );

        Ok(Self {
            backend,
            container: config.container.clone(),
            sas: SasPolicy::new(config.sas_ttl()),
            health,
        })
    }

    /// Stream all bytes from `data` into the named object and return the
    /// backend-supplied content checksum once the write is durable.
    pub async fn store<R>(&self, data: &mut R, name: &ObjectName) -> Result<String>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let blob = self
            .backend
            .resolve(name)
            .map_err(|e| persist_failure(name, e))?;
        let mut writer = self
            .backend
            .open_write(&blob)
            .await
            .map_err(|e| persist_failure(name, e))?;
        tokio::io::copy(data, &mut writer)
            .await
            .map_err(|e| persist_failure(name, e))?;
        writer
            .shutdown()
            .await
            .map_err(|e| persist_failure(name, e))?;
        self.backend
            .checksum(&blob)
            .await
            .map_err(|e| persist_failure(name, e))
    }

    /// Delete the named object if present; returns whether it existed.
    pub async fn delete(&self, name: &ObjectName) -> Result<bool> {
        let blob = self.backend.resolve(name)?;
        self.backend.delete_if_exists(&blob).await.map_err(|e| {
            FerrioError::backend(format!("unable to delete object '{}'", name), e)
        })
    }

    /// Produce a temporary, read-only fetch URL for the named object.
    ///
    /// Fails with [`FerrioError::NotFound`] before any signature work if
    /// the object is absent. The existence check and the link generation
    /// are not atomic; the backend may mutate between them.
    pub async fn get(&self, name: &ObjectName) -> Result<String> {
        let blob = self.backend.resolve(name)?;
        if !self.object_present(name, &blob).await? {
            return Err(FerrioError::NotFound(format!(
                "cannot find object '{}'",
                name
            )));
        }
        let grant = self.sas.grant();
        let query = self
            .backend
            .sign_read_url(&blob, &grant)
            .map_err(|e| {
                FerrioError::backend(format!("unable to sign fetch link for '{}'", name), e)
            })?;
        Ok(format!("{}?{}", blob.url, query))
    }

    /// Whether the named object currently exists.
    pub async fn exists(&self, name: &ObjectName) -> Result<bool> {
        let blob = self.backend.resolve(name)?;
        self.object_present(name, &blob).await
    }

    /// Query capability of the owned health monitor, for liveness
    /// collaborators.
    pub fn health(&self) -> &HealthMonitor {
        &self.health
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    async fn object_present(&self, name: &ObjectName, blob: &BlobRef) -> Result<bool> {
        self.backend.blob_exists(blob).await.map_err(|e| {
            FerrioError::backend(
                format!("unable to check existence of object '{}'", name),
                e,
            )
        })
    }
}

fn persist_failure(name: &ObjectName, source: impl Into<crate::error::BoxError>) -> FerrioError {
    FerrioError::backend(format!("unable to persist object '{}'", name), source)
}
