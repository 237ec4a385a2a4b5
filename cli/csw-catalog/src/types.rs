//! Catalog discovery types.
//!
//! These types represent the stable domain model that heterogeneous catalog
//! responses are mapped into, together with the validated query arguments
//! accepted by [crate::DiscoveryApi].

use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use derive_more::Display as DeriveDisplay;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The coordinate reference system assumed when none is stated.
pub const DEFAULT_CRS: &str = "EPSG:4326";

// ---------------------------------------------------------------------------
// Identifiers and time
// ---------------------------------------------------------------------------

/// A catalog identifier of a product (dataset series).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, DeriveDisplay)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Validates a caller supplied identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyProduct);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidProduct(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Wraps an identifier reported by the catalog itself.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProductId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// An instant as used by the mutation record and snapshot cutoffs.
///
/// Displayed as `YYYY-MM-DD HH:MM:SS.ffffff`. Parsing also accepts a `T`
/// separator, a missing fraction, and RFC 3339 (converted to UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    pub fn new(instant: NaiveDateTime) -> Self {
        Self(instant)
    }

    pub fn now() -> Self {
        Self(chrono::Utc::now().naive_utc())
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%.6f"))
    }
}

impl FromStr for Timestamp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(instant.naive_utc()));
        }
        s.replacen(' ', "T", 1)
            .parse::<NaiveDateTime>()
            .map(Self)
            .map_err(|_| ValidationError::Timestamp(s.to_string()))
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(instant: NaiveDateTime) -> Self {
        Self(instant)
    }
}

/// The observation instant of a snapshot-aware listing.
///
/// A date-only cutoff makes the whole day visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    Date(NaiveDate),
    Instant(Timestamp),
}

impl Cutoff {
    pub fn date(&self) -> NaiveDate {
        match self {
            Cutoff::Date(date) => *date,
            Cutoff::Instant(instant) => instant.naive().date(),
        }
    }

    /// Whether data versioned at `date` is visible at this cutoff.
    pub fn admits_date(&self, date: NaiveDate) -> bool {
        date <= self.date()
    }

    /// Whether a change made at `instant` is visible at this cutoff.
    pub fn admits_instant(&self, instant: Timestamp) -> bool {
        match self {
            Cutoff::Date(date) => instant.naive().date() <= *date,
            Cutoff::Instant(cutoff) => instant <= *cutoff,
        }
    }
}

impl Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cutoff::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Cutoff::Instant(instant) => write!(f, "{instant}"),
        }
    }
}

impl FromStr for Cutoff {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Cutoff::Date(date));
        }
        s.parse::<Timestamp>().map(Cutoff::Instant)
    }
}

// ---------------------------------------------------------------------------
// Extents
// ---------------------------------------------------------------------------

/// A rectangular extent in decimal degrees of the stated CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    #[serde(default = "default_crs")]
    pub crs: String,
}

fn default_crs() -> String {
    DEFAULT_CRS.to_string()
}

impl SpatialExtent {
    fn validated(self, input: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::SpatialExtent {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        if ![self.top, self.bottom, self.left, self.right]
            .iter()
            .all(|bound| bound.is_finite())
        {
            return Err(invalid("bounds must be finite numbers"));
        }
        if self.top <= self.bottom {
            return Err(invalid("top must be greater than bottom"));
        }
        if self.crs.trim().is_empty() {
            return Err(invalid("crs must not be empty"));
        }
        Ok(self)
    }
}

/// Parses either a JSON object with `top`, `bottom`, `left`, `right` and an
/// optional `crs`, or `west,south,east,north[,crs]`.
impl FromStr for SpatialExtent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.starts_with('{') {
            let extent: SpatialExtent =
                serde_json::from_str(input).map_err(|err| ValidationError::SpatialExtent {
                    input: input.to_string(),
                    reason: err.to_string(),
                })?;
            return extent.validated(input);
        }

        let parts = input.split(',').map(str::trim).collect::<Vec<_>>();
        if !(4..=5).contains(&parts.len()) {
            return Err(ValidationError::SpatialExtent {
                input: input.to_string(),
                reason: "expected 'west,south,east,north[,crs]'".to_string(),
            });
        }
        let mut bounds = [0.0_f64; 4];
        for (bound, part) in bounds.iter_mut().zip(&parts) {
            *bound = part.parse().map_err(|_| ValidationError::SpatialExtent {
                input: input.to_string(),
                reason: format!("'{part}' is not a number"),
            })?;
        }
        let [west, south, east, north] = bounds;
        SpatialExtent {
            top: north,
            bottom: south,
            left: west,
            right: east,
            crs: parts.get(4).map_or_else(default_crs, |crs| crs.to_string()),
        }
        .validated(input)
    }
}

/// A `<start>/<end>` interval string; an open side is left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, DeriveDisplay)]
#[serde(transparent)]
pub struct TemporalExtent(String);

impl TemporalExtent {
    pub fn new(start: impl Display, end: impl Display) -> Self {
        Self(format!("{start}/{end}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A caller supplied temporal filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemporalRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl FromStr for TemporalRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = |reason: String| ValidationError::TemporalExtent {
            input: input.to_string(),
            reason,
        };
        let Some((start, end)) = input.split_once('/') else {
            return Err(invalid("expected '<start>/<end>'".to_string()));
        };

        let parse_side = |side: &str| -> Result<Option<(String, NaiveDateTime)>, ValidationError> {
            let side = side.trim();
            if side.is_empty() {
                return Ok(None);
            }
            let instant = match NaiveDate::parse_from_str(side, "%Y-%m-%d") {
                Ok(date) => date.and_time(NaiveTime::MIN),
                Err(_) => side
                    .parse::<Timestamp>()
                    .map_err(|_| invalid(format!("'{side}' is not an ISO-8601 date")))?
                    .naive(),
            };
            Ok(Some((side.to_string(), instant)))
        };

        let start = parse_side(start)?;
        let end = parse_side(end)?;
        if let (Some((_, start)), Some((_, end))) = (&start, &end) {
            if start > end {
                return Err(invalid("start must not be after end".to_string()));
            }
        }

        Ok(Self {
            start: start.map(|(raw, _)| raw),
            end: end.map(|(raw, _)| raw),
        })
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Metadata about a single band of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandInfo {
    pub band_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wavelength_nm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub res_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A product (dataset series) as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub data_id: String,
    pub description: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_extent: Option<SpatialExtent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_extent: Option<TemporalExtent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<BandInfo>>,
}

// ---------------------------------------------------------------------------
// Granules
// ---------------------------------------------------------------------------

/// A single downloadable granule of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub path: String,
    pub spatial_extent: SpatialExtent,
    pub temporal_extent: TemporalExtent,
}

/// A granule together with the raw catalog metadata it was mapped from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullRecord {
    #[serde(flatten)]
    pub record: Record,
    pub metadata: serde_json::Value,
}

/// A granule as visible in a snapshot of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePath {
    pub date: String,
    pub name: String,
    pub path: String,
    pub timestamp: String,
}

/// How much information a granule listing carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GranuleDetail {
    #[default]
    Full,
    Short,
    #[serde(rename = "file_path")]
    FilePaths,
}

impl FromStr for GranuleDetail {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "full" => Ok(GranuleDetail::Full),
            "short" => Ok(GranuleDetail::Short),
            "file_path" => Ok(GranuleDetail::FilePaths),
            other => Err(ValidationError::Detail(other.to_string())),
        }
    }
}

/// The result of a granule listing at the requested [GranuleDetail].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GranuleListing {
    Full(Vec<FullRecord>),
    Short(Vec<Record>),
    FilePaths(Vec<FilePath>),
}

impl GranuleListing {
    pub fn len(&self) -> usize {
        match self {
            GranuleListing::Full(records) => records.len(),
            GranuleListing::Short(records) => records.len(),
            GranuleListing::FilePaths(paths) => paths.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Constraints of a granule listing or query preview.
#[derive(Debug, Clone, PartialEq)]
pub struct GranuleQuery {
    pub product: ProductId,
    pub bbox: Option<SpatialExtent>,
    pub temporal: TemporalRange,
    pub cutoff: Option<Cutoff>,
}

impl GranuleQuery {
    pub fn new(product: ProductId) -> Self {
        Self {
            product,
            bbox: None,
            temporal: TemporalRange::default(),
            cutoff: None,
        }
    }

    pub fn with_bbox(mut self, bbox: SpatialExtent) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_temporal(mut self, temporal: TemporalRange) -> Self {
        self.temporal = temporal;
        self
    }

    pub fn with_cutoff(mut self, cutoff: Cutoff) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn product_id_rejects_blank_and_whitespace() {
        assert_eq!(ProductId::new("  "), Err(ValidationError::EmptyProduct));
        assert!(matches!(
            ProductId::new("s2a l1c"),
            Err(ValidationError::InvalidProduct(_))
        ));
        assert_eq!(ProductId::new(" s2a_prd_msil1c ").unwrap().as_str(), "s2a_prd_msil1c");
    }

    #[test]
    fn spatial_extent_from_comma_list() {
        let extent: SpatialExtent = "15, 5, 20, 10".parse().unwrap();
        assert_eq!(extent, SpatialExtent {
            top: 10.0,
            bottom: 5.0,
            left: 15.0,
            right: 20.0,
            crs: "EPSG:4326".to_string(),
        });

        let extent: SpatialExtent = "15,5,20,10,EPSG:3857".parse().unwrap();
        assert_eq!(extent.crs, "EPSG:3857");
    }

    #[test]
    fn spatial_extent_from_json() {
        let extent: SpatialExtent = r#"{"top": 48.5, "bottom": 47.1, "left": 9.5, "right": 17.2}"#
            .parse()
            .unwrap();
        assert_eq!(extent.top, 48.5);
        assert_eq!(extent.crs, DEFAULT_CRS);
    }

    #[test]
    fn spatial_extent_rejects_inverted_and_malformed() {
        assert!(matches!(
            "15,10,20,5".parse::<SpatialExtent>(),
            Err(ValidationError::SpatialExtent { .. })
        ));
        assert!(matches!(
            "15,5,east,10".parse::<SpatialExtent>(),
            Err(ValidationError::SpatialExtent { .. })
        ));
        assert!(matches!(
            "15,5,20".parse::<SpatialExtent>(),
            Err(ValidationError::SpatialExtent { .. })
        ));
        assert!(matches!(
            "15,5,NaN,10".parse::<SpatialExtent>(),
            Err(ValidationError::SpatialExtent { .. })
        ));
    }

    #[test]
    fn temporal_range_accepts_open_sides() {
        let range: TemporalRange = "2023-01-01/".parse().unwrap();
        assert_eq!(range, TemporalRange {
            start: Some("2023-01-01".to_string()),
            end: None,
        });

        let range: TemporalRange = "/2023-01-31T12:00:00".parse().unwrap();
        assert_eq!(range.start, None);
        assert_eq!(range.end.as_deref(), Some("2023-01-31T12:00:00"));
    }

    #[test]
    fn temporal_range_rejects_reversed_and_garbage() {
        assert!(matches!(
            "2023-02-01/2023-01-01".parse::<TemporalRange>(),
            Err(ValidationError::TemporalExtent { .. })
        ));
        assert!(matches!(
            "2023-02-01".parse::<TemporalRange>(),
            Err(ValidationError::TemporalExtent { .. })
        ));
        assert!(matches!(
            "yesterday/today".parse::<TemporalRange>(),
            Err(ValidationError::TemporalExtent { .. })
        ));
    }

    #[test]
    fn timestamp_accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        for input in [
            "2023-01-02 12:00:00.000000",
            "2023-01-02 12:00:00",
            "2023-01-02T12:00:00",
            "2023-01-02T12:00:00Z",
        ] {
            assert_eq!(input.parse::<Timestamp>().unwrap().naive(), expected, "{input}");
        }
        assert_eq!(
            Timestamp::new(expected).to_string(),
            "2023-01-02 12:00:00.000000"
        );
        assert!("2023-13-02 12:00:00".parse::<Timestamp>().is_err());
    }

    #[test]
    fn date_cutoff_covers_the_whole_day() {
        let cutoff: Cutoff = "2023-01-02".parse().unwrap();
        let noon = "2023-01-02T12:00:00".parse::<Timestamp>().unwrap();
        let next_day = "2023-01-03T00:00:00".parse::<Timestamp>().unwrap();
        assert!(cutoff.admits_instant(noon));
        assert!(!cutoff.admits_instant(next_day));
        assert!(cutoff.admits_date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()));
        assert!(!cutoff.admits_date(NaiveDate::from_ymd_opt(2023, 1, 3).unwrap()));
    }

    #[test]
    fn instant_cutoff_compares_instants() {
        let cutoff: Cutoff = "2023-01-02 08:00:00.000000".parse().unwrap();
        assert_eq!(cutoff.date(), NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert!(!cutoff.admits_instant("2023-01-02T12:00:00".parse().unwrap()));
        assert!(cutoff.admits_instant("2023-01-02T07:59:59".parse().unwrap()));
        assert!(cutoff.admits_date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()));
        assert_eq!(cutoff.to_string(), "2023-01-02 08:00:00.000000");
    }

    #[test]
    fn detail_levels_parse_and_serialize() {
        assert_eq!("short".parse::<GranuleDetail>().unwrap(), GranuleDetail::Short);
        assert_eq!(
            "file_path".parse::<GranuleDetail>().unwrap(),
            GranuleDetail::FilePaths
        );
        for unknown in ["verbose", "file_paths"] {
            assert!(matches!(
                unknown.parse::<GranuleDetail>(),
                Err(ValidationError::Detail(_))
            ));
        }
        assert_eq!(
            serde_json::to_string(&GranuleDetail::FilePaths).unwrap(),
            "\"file_path\""
        );
    }
}
