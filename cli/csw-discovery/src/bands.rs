//! Band metadata read from a JSON file mapping products to their bands.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use csw_catalog::{BandInfo, BandLookup, BandsError, ProductId, StaticBandCatalog};
use tracing::debug;

/// A [BandLookup] re-reading its file on every lookup.
///
/// Without a file, or with a file that doesn't exist, no product has bands.
#[derive(Debug, Clone, Default)]
pub struct FileBandCatalog {
    path: Option<PathBuf>,
}

impl FileBandCatalog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl BandLookup for FileBandCatalog {
    fn get_bands(&self, product: &ProductId) -> Result<Vec<BandInfo>, BandsError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "band catalog not found");
                return Ok(Vec::new());
            },
            Err(err) => return Err(BandsError::Io(err)),
        };

        StaticBandCatalog::from_json(&contents)?.get_bands(product)
    }
}
