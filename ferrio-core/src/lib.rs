//! Ferrio Core - blob storage facade with background health monitoring
//!
//! A thin, strongly-typed layer over one container of a remote blob store:
//! - store / fetch-via-signed-link / delete / existence-check operations
//! - a background health monitor with rendezvous reads (callers suspend
//!   only until the first determination, never on steady-state reads)
//! - read-only, time-bounded SAS grants computed fresh per fetch
//! - an in-memory backend for local deployments and tests

pub mod backend;
pub mod config;
pub mod error;
pub mod health;
pub mod memory;
pub mod reference;
pub mod sas;
pub mod storage;

pub use backend::{BlobBackend, BlobRef};
pub use config::StorageConfig;
pub use error::{BoxError, FerrioError, Result};
pub use health::HealthMonitor;
pub use memory::{MemoryBackend, content_checksum};
pub use reference::ObjectName;
pub use sas::{AccessLevel, ReadGrant, SasPolicy};
pub use storage::BlobStorage;
