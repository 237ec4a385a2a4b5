//! Composition of catalog query filters.

use crate::error::FilterError;
use crate::types::{Cutoff, SpatialExtent};

/// A queryable catalog property compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    /// The identifier of a series.
    SeriesIdentifier,
    /// The identifier linking a granule to its parent series.
    ParentIdentifier,
}

impl Property {
    pub fn qualified_name(&self) -> &'static str {
        match self {
            Property::SeriesIdentifier => "dc:identifier",
            Property::ParentIdentifier => "apiso:ParentIdentifier",
        }
    }
}

/// A filter expression understood by the catalog protocol.
///
/// Built fresh per request and never mutated; see [crate::request] for the
/// wire rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    And(Vec<FilterExpression>),
    IsSeries,
    PropertyEquals { property: Property, value: String },
    TimeBegins(String),
    TimeEnds(String),
    BoundingBoxIntersects(SpatialExtent),
    SnapshotAsOf(Cutoff),
}

/// The optional constraints a query can be narrowed by.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryConstraints {
    pub identifier: Option<String>,
    pub bbox: Option<SpatialExtent>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub as_series: bool,
    pub snapshot_timestamp: Option<Cutoff>,
}

impl QueryConstraints {
    /// Constraints selecting series, optionally a single one.
    pub fn series(identifier: Option<String>) -> Self {
        Self {
            identifier,
            as_series: true,
            ..Default::default()
        }
    }

    /// Compose the constraints into a single expression.
    ///
    /// Series are not filtered spatio-temporally, so `bbox`, `start`, `end`
    /// and `snapshot_timestamp` only apply to granule queries. A single
    /// constraint is returned as is, several are wrapped in one
    /// [FilterExpression::And] in a fixed order.
    pub fn build(&self) -> Result<FilterExpression, FilterError> {
        let mut nodes = Vec::new();

        if self.as_series {
            nodes.push(FilterExpression::IsSeries);
        }

        if let Some(identifier) = &self.identifier {
            let property = if self.as_series {
                Property::SeriesIdentifier
            } else {
                Property::ParentIdentifier
            };
            nodes.push(FilterExpression::PropertyEquals {
                property,
                value: identifier.clone(),
            });
        }

        if !self.as_series {
            if let Some(start) = &self.start {
                nodes.push(FilterExpression::TimeBegins(start.clone()));
            }
            if let Some(end) = &self.end {
                nodes.push(FilterExpression::TimeEnds(end.clone()));
            }
            if let Some(bbox) = &self.bbox {
                nodes.push(FilterExpression::BoundingBoxIntersects(bbox.clone()));
            }
            if let Some(cutoff) = &self.snapshot_timestamp {
                nodes.push(FilterExpression::SnapshotAsOf(*cutoff));
            }
        }

        match nodes.len() {
            0 => Err(FilterError),
            1 => Ok(nodes.remove(0)),
            _ => Ok(FilterExpression::And(nodes)),
        }
    }
}
