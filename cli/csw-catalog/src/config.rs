//! Configuration types for catalog client construction.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::paging::DEFAULT_MAX_PAGES;
use crate::request::DEFAULT_PAGE_SIZE;

/// Configuration for catalog client construction.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// The CSW endpoint `GetRecords` documents are posted to.
    pub catalog_url: String,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
    /// Number of records requested per page.
    pub page_size: u32,
    /// Maximum number of pages fetched by a single operation.
    pub max_pages: u32,
    /// Mock mode for testing.
    pub mock_mode: CatalogMockMode,
}

impl CatalogClientConfig {
    pub fn new(catalog_url: impl Into<String>) -> Self {
        Self {
            catalog_url: catalog_url.into(),
            extra_headers: BTreeMap::new(),
            user_agent: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            mock_mode: CatalogMockMode::None,
        }
    }
}

/// Mock recording/replay mode for integration testing.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum CatalogMockMode {
    /// Use a real server without any mock recording or replaying.
    #[default]
    None,
    /// Proxy via a mock server and record interactions to a path.
    Record(PathBuf),
    /// Replay interactions from a path using a mock server.
    Replay(PathBuf),
}
