//! Error handling for catalog discovery operations.

use http::StatusCode;
use thiserror::Error;

use crate::store::{BandsError, StoreError};
use crate::types::ProductId;

/// A query was composed without a single constraint.
///
/// This is a caller contract violation and never reaches the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at least one filter must be supplied (bounding box, start, end, identifier)")]
pub struct FilterError;

/// Malformed spatial, temporal or identifier arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("product identifier must not be empty")]
    EmptyProduct,
    #[error("product identifier '{0}' must not contain whitespace")]
    InvalidProduct(String),
    #[error("invalid spatial extent '{input}': {reason}")]
    SpatialExtent { input: String, reason: String },
    #[error("invalid temporal extent '{input}': {reason}")]
    TemporalExtent { input: String, reason: String },
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),
    #[error("unknown detail level '{0}', expected one of: full, short, file_path")]
    Detail(String),
    #[error("listing file paths requires a snapshot timestamp")]
    MissingCutoff,
}

/// Failures talking to the catalog server or understanding its envelope.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog url '{0}'")]
    InvalidUrl(String, #[source] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("error while communicating with CSW server")]
    Request(#[from] reqwest::Error),
    #[error("CSW server responded with status {status}")]
    Status { status: StatusCode },
    #[error("CSW server responded with an XML document instead of JSON")]
    XmlResponse,
    #[error("CSW server responded with malformed JSON")]
    MalformedResponse(#[source] serde_json::Error),
    #[error("CSW server reported an exception: {0}")]
    ExceptionReport(String),
    #[error("unexpected CSW response shape")]
    UnexpectedShape(#[source] MappingError),
    #[error("CSW server kept reporting more data after {0} pages")]
    PageLimitExceeded(u32),
}

/// An expected field is absent from an otherwise successful response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("missing field '{field}': key '{key}' not found at '{path}'")]
    MissingField {
        field: &'static str,
        key: String,
        path: String,
    },
    #[error("field '{field}' has an invalid value '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// Error type returned by every [crate::DiscoveryApi] operation.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("product '{0}' not found")]
    ProductNotFound(ProductId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Bands(#[from] BandsError),
}

impl DiscoveryError {
    /// The status code this error is reported with at the service boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DiscoveryError::Filter(_) | DiscoveryError::Validation(_) => StatusCode::BAD_REQUEST,
            DiscoveryError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            DiscoveryError::Catalog(_)
            | DiscoveryError::Mapping(_)
            | DiscoveryError::Store(_)
            | DiscoveryError::Bands(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure originates inside the service rather than from
    /// the caller's input.
    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_are_bad_requests() {
        assert_eq!(
            DiscoveryError::from(FilterError).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DiscoveryError::from(ValidationError::EmptyProduct).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert!(!DiscoveryError::from(FilterError).is_internal());
    }

    #[test]
    fn missing_product_is_not_found() {
        let err = DiscoveryError::ProductNotFound(ProductId::new_unchecked("s2a"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "product 's2a' not found");
    }

    #[test]
    fn server_side_errors_are_internal() {
        let err = DiscoveryError::from(CatalogError::XmlResponse);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_internal());

        let err = DiscoveryError::from(MappingError::InvalidValue {
            field: "north bound",
            value: "x".into(),
        });
        assert!(err.is_internal());
    }
}
