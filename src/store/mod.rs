//! Persistent storage for providers and service areas.
//!
//! Rows live in sled trees as JSON, keyed by big-endian ids. The spatial
//! index is rebuilt from the `service_areas` tree on open and kept in step
//! with every write. Its lock also serializes writers, so existence checks
//! and the writes that depend on them happen atomically.

mod providers;
mod service_areas;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::ServiceArea;
use crate::pip::AreaSpatialIndex;
use crate::validation::FieldErrors;

const PROVIDERS_TREE: &str = "providers";
const SERVICE_AREAS_TREE: &str = "service_areas";
const SEQUENCES_TREE: &str = "sequences";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("corrupt key in tree '{0}'")]
    CorruptKey(&'static str),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("validation failed: {0}")]
    Validation(FieldErrors),
}

impl From<FieldErrors> for StoreError {
    fn from(errors: FieldErrors) -> Self {
        StoreError::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// How an update payload is applied to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Every required field must be present (PUT)
    Replace,
    /// Absent fields keep their stored values (PATCH)
    Partial,
}

/// Provider/service area store backed by sled
pub struct Store {
    db: sled::Db,
    providers: sled::Tree,
    service_areas: sled::Tree,
    sequences: sled::Tree,
    index: RwLock<AreaSpatialIndex>,
}

impl Store {
    /// Open (or create) a store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening store at {}...", path.as_ref().display());
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a throwaway store that is deleted on drop
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let providers = db.open_tree(PROVIDERS_TREE)?;
        let service_areas = db.open_tree(SERVICE_AREAS_TREE)?;
        let sequences = db.open_tree(SEQUENCES_TREE)?;

        let mut geometries = Vec::new();
        for value in service_areas.iter().values() {
            let area: ServiceArea = decode(&value?)?;
            geometries.push((area.id, area.area.to_multi_polygon()));
        }
        let index = AreaSpatialIndex::build(geometries);

        info!(
            "Store ready with {} providers and {} service areas",
            providers.len(),
            service_areas.len()
        );

        Ok(Self {
            db,
            providers,
            service_areas,
            sequences,
            index: RwLock::new(index),
        })
    }

    /// Allocate the next id of a sequence, starting at 1
    fn next_id(&self, sequence: &str) -> Result<u64> {
        let updated = self.sequences.update_and_fetch(sequence, |old| {
            let current = old.and_then(decode_id).unwrap_or(0);
            Some((current + 1).to_be_bytes().to_vec())
        })?;

        updated
            .as_deref()
            .and_then(decode_id)
            .ok_or(StoreError::CorruptKey(SEQUENCES_TREE))
    }

    /// Row counts as `(providers, service_areas)`
    pub fn counts(&self) -> (usize, usize) {
        (self.providers.len(), self.service_areas.len())
    }

    /// Number of geometries in the spatial index
    pub async fn indexed_areas(&self) -> usize {
        self.index.read().await.len()
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        let bytes = self.db.flush_async().await?;
        if bytes > 0 {
            info!("Flushed {} bytes to disk", bytes);
        }
        Ok(())
    }
}

fn key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn decode_id(bytes: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read every row of a tree in key (id) order.
fn scan<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
    tree.iter()
        .values()
        .map(|value| decode(&value?))
        .collect()
}

fn get<T: DeserializeOwned>(tree: &sled::Tree, id: u64) -> Result<Option<T>> {
    match tree.get(key(id))? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}
