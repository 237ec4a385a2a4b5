//! Discovery of Earth-observation products and granules in a CSW catalog.
//!
//! This crate provides:
//! - Composition of OGC filters and rendering of `GetRecords` documents
//! - Paging through catalog results over an HTTP transport
//! - Mapping of catalog records into products, granules and file paths
//! - Reconstruction of file listings as of a snapshot cutoff
//! - Mock server recording and replay of catalog traffic for testing
//!
//! ## Usage
//!
//! ```ignore
//! use csw_catalog::{CatalogClient, CatalogClientConfig, DiscoveryApi};
//! use csw_catalog::{GranuleDetail, GranuleQuery, ProductId};
//! use csw_catalog::{InMemoryMutationStore, StaticBandCatalog};
//!
//! let config = CatalogClientConfig::new("https://catalog.example.org/csw");
//! let client = CatalogClient::new(
//!     config,
//!     InMemoryMutationStore::default(),
//!     StaticBandCatalog::default(),
//! )?;
//!
//! let query = GranuleQuery::new(ProductId::new("s2a_prd_msil1c")?)
//!     .with_bbox("9.5,46.3,17.2,49.0".parse()?);
//! let records = client.list_granules(&query, GranuleDetail::Short).await?;
//! ```

mod client;
mod config;
mod discovery;
mod error;
pub mod filter;
pub mod mapping;
mod mock;
pub mod paging;
pub mod request;
pub mod snapshot;
mod store;
pub mod tree;
mod types;

pub use client::HttpTransport;
pub use config::{CatalogClientConfig, CatalogMockMode};
pub use discovery::{CatalogClient, DiscoveryApi};
pub use error::{CatalogError, DiscoveryError, FilterError, MappingError, ValidationError};
pub use store::{
    BandLookup,
    BandsError,
    InMemoryMutationStore,
    MutationRecord,
    MutationStore,
    StaticBandCatalog,
    StoreError,
};
pub use types::*;
