//! Service configuration from defaults, an optional TOML file and `CSW_`
//! environment variables, in increasing precedence.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config as HierarchicalConfig, Environment};
use csw_catalog::paging::DEFAULT_MAX_PAGES;
use csw_catalog::request::DEFAULT_PAGE_SIZE;
use csw_catalog::{CatalogClientConfig, CatalogMockMode};
use serde::Deserialize;
use tracing::debug;

use crate::service::DEFAULT_USER_ID;

/// Read when no config file is given explicitly, if present.
pub const DEFAULT_CONFIG_FILE: &str = "csw-discovery.toml";
const ENV_PREFIX: &str = "CSW";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    /// The CSW endpoint url.
    pub server: String,
    pub page_size: u32,
    pub max_pages: u32,
    /// Where the archive mutation state is kept.
    pub state_file: PathBuf,
    pub bands_file: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub user_id: String,
    /// Directory for daily rolling log files.
    pub log_dir: Option<PathBuf>,
    /// Additional headers sent with every catalog request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Record catalog traffic to this file.
    pub mock_record: Option<PathBuf>,
    /// Replay catalog traffic from this file instead of contacting the
    /// catalog.
    pub mock_replay: Option<PathBuf>,
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_sources(file, std::env::vars().collect())
    }

    /// Build the configuration from an optional file and a set of
    /// environment variables.
    ///
    /// An explicitly given file must exist.
    pub fn from_sources(file: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let builder = HierarchicalConfig::builder()
            .set_default("page_size", i64::from(DEFAULT_PAGE_SIZE))?
            .set_default("max_pages", i64::from(DEFAULT_MAX_PAGES))?
            .set_default("state_file", "csw-state.json")?
            .set_default("user_id", DEFAULT_USER_ID)?;

        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false),
        };
        debug!(file = ?file, "reading configuration");

        let env = env
            .into_iter()
            .filter(|(key, _)| key.starts_with(&format!("{ENV_PREFIX}_")))
            .collect::<HashMap<_, _>>();

        let config = builder
            .add_source(file_source.format(config::FileFormat::Toml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .source(Some(env))
                    .try_parsing(true),
            )
            .build()
            .context("could not read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration (is CSW_SERVER set?)")
    }

    pub fn client_config(&self) -> Result<CatalogClientConfig> {
        let mock_mode = match (&self.mock_record, &self.mock_replay) {
            (None, None) => CatalogMockMode::None,
            (Some(path), None) => CatalogMockMode::Record(path.clone()),
            (None, Some(path)) => {
                if !path.exists() {
                    bail!("recording to replay doesn't exist: {}", path.display());
                }
                CatalogMockMode::Replay(path.clone())
            },
            (Some(_), Some(_)) => bail!("cannot both record and replay catalog traffic"),
        };
        debug!(?mock_mode, "catalog mock mode");

        Ok(CatalogClientConfig {
            catalog_url: self.server.clone(),
            extra_headers: self.headers.clone(),
            user_agent: self.user_agent.clone(),
            page_size: self.page_size,
            max_pages: self.max_pages,
            mock_mode,
        })
    }
}
