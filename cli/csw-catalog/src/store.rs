//! Collaborators consulted next to the catalog: the archive mutation record
//! and the band catalog.
//!
//! Both are traits so that the service can back them with files while tests
//! use the in-memory implementations below.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;

use crate::types::{BandInfo, ProductId, Timestamp};

/// The externally maintained state of archive mutations.
///
/// A fresh archive has never been updated and nothing is deleted.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    /// When new data was last inserted into the archive.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(rename = "updatetime")]
    pub updated_at: Option<Timestamp>,
    /// Whether the first granule has been removed from the archive.
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access mutation state")]
    Io(#[source] std::io::Error),
    #[error("mutation state is malformed")]
    Malformed(#[source] serde_json::Error),
    #[error("failed to lock mutation state")]
    Lock(#[source] std::io::Error),
}

/// Read/write access to the [MutationRecord].
pub trait MutationStore {
    /// Read the current record; an absent record reads as the default.
    fn read(&self) -> Result<MutationRecord, StoreError>;

    /// Replace the current record.
    fn write(&self, record: &MutationRecord) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum BandsError {
    #[error("failed to read band catalog")]
    Io(#[source] std::io::Error),
    #[error("band catalog is malformed")]
    Malformed(#[source] serde_json::Error),
}

/// Lookup of band metadata per product.
pub trait BandLookup {
    /// The bands of `product`; unknown products have no bands.
    fn get_bands(&self, product: &ProductId) -> Result<Vec<BandInfo>, BandsError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// A [MutationStore] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryMutationStore {
    record: Mutex<MutationRecord>,
}

impl InMemoryMutationStore {
    pub fn new(record: MutationRecord) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }
}

impl MutationStore for InMemoryMutationStore {
    fn read(&self) -> Result<MutationRecord, StoreError> {
        Ok(self
            .record
            .lock()
            .map_err(|_| StoreError::Lock(std::io::Error::other("poisoned")))?
            .clone())
    }

    fn write(&self, record: &MutationRecord) -> Result<(), StoreError> {
        *self
            .record
            .lock()
            .map_err(|_| StoreError::Lock(std::io::Error::other("poisoned")))? = record.clone();
        Ok(())
    }
}

/// A [BandLookup] backed by a map of product identifiers to bands.
#[derive(Debug, Clone, Default)]
pub struct StaticBandCatalog {
    bands: HashMap<String, Vec<BandInfo>>,
}

impl StaticBandCatalog {
    pub fn new(bands: HashMap<String, Vec<BandInfo>>) -> Self {
        Self { bands }
    }

    /// Parse a JSON map of product identifiers to lists of bands.
    pub fn from_json(contents: &str) -> Result<Self, BandsError> {
        let bands = serde_json::from_str(contents).map_err(BandsError::Malformed)?;
        Ok(Self { bands })
    }
}

impl BandLookup for StaticBandCatalog {
    fn get_bands(&self, product: &ProductId) -> Result<Vec<BandInfo>, BandsError> {
        Ok(self.bands.get(product.as_str()).cloned().unwrap_or_default())
    }
}
