//! Mapping of raw catalog records into domain records.
//!
//! Series come back as Dublin Core records, granules as ISO 19139 metadata.
//! Every field is extracted through a [NodePath] declared below; a missing
//! field fails the whole mapping rather than being defaulted.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::MappingError;
use crate::tree::NodePath;
use crate::tree::Step::{First, Key};
use crate::types::{ProductRecord, Record, SpatialExtent, TemporalExtent, DEFAULT_CRS};

// ---------------------------------------------------------------------------
// Series paths
// ---------------------------------------------------------------------------

const SERIES_IDENTIFIER: NodePath = NodePath::new("identifier", &[Key("dc:identifier")]);
const SERIES_ABSTRACT: NodePath = NodePath::new("description", &[Key("dct:abstract")]);
const SERIES_CREATOR: NodePath = NodePath::new("source", &[Key("dc:creator")]);
const SERIES_UPPER_CORNER: NodePath = NodePath::new("upper corner", &[
    Key("ows:BoundingBox"),
    Key("ows:UpperCorner"),
]);
const SERIES_LOWER_CORNER: NodePath = NodePath::new("lower corner", &[
    Key("ows:BoundingBox"),
    Key("ows:LowerCorner"),
]);
const SERIES_DATE: NodePath = NodePath::new("citation date", &[Key("dc:date")]);

// ---------------------------------------------------------------------------
// Granule paths
// ---------------------------------------------------------------------------

const GRANULE_URL: NodePath = NodePath::new("download url", &[
    Key("gmd:distributionInfo"),
    Key("gmd:MD_Distribution"),
    Key("gmd:transferOptions"),
    Key("gmd:MD_DigitalTransferOptions"),
    Key("gmd:onLine"),
    First,
    Key("gmd:CI_OnlineResource"),
    Key("gmd:linkage"),
    Key("gmd:URL"),
]);

const GRANULE_EXTENT: NodePath = NodePath::new("extent", &[
    Key("gmd:identificationInfo"),
    Key("gmd:MD_DataIdentification"),
    Key("gmd:extent"),
    Key("gmd:EX_Extent"),
]);

const GRANULE_NORTH: NodePath = NodePath::new("north bound", &[
    Key("gmd:geographicElement"),
    Key("gmd:EX_GeographicBoundingBox"),
    Key("gmd:northBoundLatitude"),
    Key("gco:Decimal"),
]);
const GRANULE_SOUTH: NodePath = NodePath::new("south bound", &[
    Key("gmd:geographicElement"),
    Key("gmd:EX_GeographicBoundingBox"),
    Key("gmd:southBoundLatitude"),
    Key("gco:Decimal"),
]);
const GRANULE_EAST: NodePath = NodePath::new("east bound", &[
    Key("gmd:geographicElement"),
    Key("gmd:EX_GeographicBoundingBox"),
    Key("gmd:eastBoundLongitude"),
    Key("gco:Decimal"),
]);
const GRANULE_WEST: NodePath = NodePath::new("west bound", &[
    Key("gmd:geographicElement"),
    Key("gmd:EX_GeographicBoundingBox"),
    Key("gmd:westBoundLongitude"),
    Key("gco:Decimal"),
]);

const GRANULE_BEGIN: NodePath = NodePath::new("begin position", &[
    Key("gmd:temporalElement"),
    Key("gmd:EX_TemporalExtent"),
    Key("gmd:extent"),
    Key("gml:TimePeriod"),
    Key("gml:beginPosition"),
]);
const GRANULE_END: NodePath = NodePath::new("end position", &[
    Key("gmd:temporalElement"),
    Key("gmd:EX_TemporalExtent"),
    Key("gmd:extent"),
    Key("gml:TimePeriod"),
    Key("gml:endPosition"),
]);

const GRANULE_VERSION_DATE: NodePath = NodePath::new("data version date", &[
    Key("gmd:identificationInfo"),
    Key("gmd:MD_DataIdentification"),
    Key("gmd:citation"),
    Key("gmd:CI_Citation"),
    Key("gmd:date"),
    Key("gmd:CI_Date"),
    Key("gmd:date"),
    Key("gco:Date"),
]);

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Map a series record to a product summary.
pub fn map_product_summary(item: &Value) -> Result<ProductRecord, MappingError> {
    Ok(ProductRecord {
        data_id: SERIES_IDENTIFIER.text(item)?,
        description: SERIES_ABSTRACT.text(item)?,
        source: SERIES_CREATOR.text(item)?,
        spatial_extent: None,
        temporal_extent: None,
        bands: None,
    })
}

/// Map a series record to a product with its extents.
///
/// The corners are `x y` pairs: `right`/`top` come from the upper corner,
/// `left`/`bottom` from the lower one. The temporal extent runs from the
/// citation date to `today`.
pub fn map_product_detail(item: &Value, today: NaiveDate) -> Result<ProductRecord, MappingError> {
    let (upper_x, upper_y) = SERIES_UPPER_CORNER.corner(item)?;
    let (lower_x, lower_y) = SERIES_LOWER_CORNER.corner(item)?;
    let since = SERIES_DATE.text(item)?;

    Ok(ProductRecord {
        spatial_extent: Some(SpatialExtent {
            top: upper_y,
            bottom: lower_y,
            left: lower_x,
            right: upper_x,
            crs: DEFAULT_CRS.to_string(),
        }),
        temporal_extent: Some(TemporalExtent::new(since, today.format("%Y-%m-%d"))),
        ..map_product_summary(item)?
    })
}

// ---------------------------------------------------------------------------
// Granules
// ---------------------------------------------------------------------------

/// Derive a display name from a download url: the last path segment up to
/// its first `.`.
pub fn display_name(url: &str) -> String {
    let segment = url.rsplit('/').next().unwrap_or(url);
    segment.split('.').next().unwrap_or(segment).to_string()
}

/// Map a granule metadata record.
///
/// East and west bounds populate `right` and `left` respectively.
pub fn map_granule(item: &Value) -> Result<Record, MappingError> {
    let path = GRANULE_URL.text(item)?;
    let extent = GRANULE_EXTENT.resolve(item)?;

    Ok(Record {
        name: display_name(&path),
        spatial_extent: SpatialExtent {
            top: GRANULE_NORTH.decimal(extent)?,
            bottom: GRANULE_SOUTH.decimal(extent)?,
            right: GRANULE_EAST.decimal(extent)?,
            left: GRANULE_WEST.decimal(extent)?,
            crs: DEFAULT_CRS.to_string(),
        },
        temporal_extent: TemporalExtent::new(
            GRANULE_BEGIN.text(extent)?,
            GRANULE_END.text(extent)?,
        ),
        path,
    })
}

/// A granule together with the version information snapshot filtering needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GranuleVersion {
    pub record: Record,
    /// Day of the granule's temporal start, `YYYY-MM-DD`.
    pub date: String,
    /// The catalog reported data version date, as reported.
    pub version_label: String,
    pub version_date: NaiveDate,
}

/// Map a granule metadata record including its data version date.
pub fn map_granule_version(item: &Value) -> Result<GranuleVersion, MappingError> {
    let record = map_granule(item)?;
    let extent = GRANULE_EXTENT.resolve(item)?;

    let begin = GRANULE_BEGIN.text(extent)?;
    let date = day_of(&begin).ok_or_else(|| MappingError::InvalidValue {
        field: GRANULE_BEGIN.field,
        value: begin.clone(),
    })?;

    let version_label = GRANULE_VERSION_DATE.text(item)?;
    let version_date = day_of(&version_label)
        .and_then(|day| NaiveDate::parse_from_str(&day, "%Y-%m-%d").ok())
        .ok_or_else(|| MappingError::InvalidValue {
            field: GRANULE_VERSION_DATE.field,
            value: version_label.clone(),
        })?;

    Ok(GranuleVersion {
        record,
        date,
        version_label,
        version_date,
    })
}

fn day_of(text: &str) -> Option<String> {
    text.trim().get(..10).map(str::to_string)
}
