//! Reconstruction of the archive file listing as of a cutoff.
//!
//! The archive is static except for a single recorded mutation that applies
//! to the first granule in catalog order: the granule may have been deleted,
//! and a new version of it may have been inserted at [MutationRecord::updated_at].

use tracing::{debug, trace};

use crate::mapping::GranuleVersion;
use crate::store::MutationRecord;
use crate::types::{Cutoff, FilePath};

const NEW_SUFFIX: &str = "_new";

fn file_path(granule: &GranuleVersion) -> FilePath {
    FilePath {
        date: granule.date.clone(),
        name: granule.record.name.clone(),
        path: granule.record.path.clone(),
        timestamp: granule.version_label.clone(),
    }
}

/// The files visible at `cutoff`, in catalog order.
pub fn apply(granules: &[GranuleVersion], cutoff: &Cutoff, mutation: &MutationRecord) -> Vec<FilePath> {
    let mut visible = Vec::with_capacity(granules.len() + 1);

    for (index, granule) in granules.iter().enumerate() {
        let is_first = index == 0;

        if !cutoff.admits_date(granule.version_date) {
            trace!(name = %granule.record.name, version = %granule.version_date, "not yet versioned");
        } else if is_first && mutation.deleted {
            debug!(name = %granule.record.name, "first granule deleted");
        } else {
            visible.push(file_path(granule));
        }

        if !is_first {
            continue;
        }
        if let Some(updated_at) = mutation.updated_at {
            if cutoff.admits_instant(updated_at) {
                debug!(name = %granule.record.name, %updated_at, "inserting updated granule");
                let mut inserted = file_path(granule);
                inserted.name.push_str(NEW_SUFFIX);
                inserted.path.push_str(NEW_SUFFIX);
                visible.push(inserted);
            }
        }
    }

    visible
}
