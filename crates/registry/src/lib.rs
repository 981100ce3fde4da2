//! Model catalog resolution.
//!
//! [`ModelResolver`] keeps an atomically swapped [`CatalogSnapshot`] built
//! from the live registry, the persisted snapshot file or the bundled
//! fallback dataset, and answers lookups from memory only.

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod record;
pub mod resolver;
pub mod snapshot;
pub mod snapshot_file;

pub use client::{FetchPolicy, HttpRegistryClient, RegistryClient};
pub use config::ResolverConfig;
pub use error::{RegistryError, SnapshotError};
pub use memory::StaticRegistryClient;
pub use record::RegistryRecord;
pub use resolver::{ModelResolver, RefreshReport};
pub use snapshot::{CatalogSnapshot, SourceTier};
pub use snapshot_file::SnapshotFile;
