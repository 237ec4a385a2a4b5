//! Walking paginated `GetRecords` results.
//!
//! The catalog reports where the next page starts with each page it
//! returns; a non-positive position means there is no more data. Pages are
//! therefore fetched strictly in sequence.

use async_stream::try_stream;
use futures::{Stream, TryStreamExt};
use serde_json::Value;
use tracing::debug;

use crate::error::{CatalogError, MappingError};
use crate::request::GetRecords;
use crate::tree::{as_list, NodePath, Step};

/// The default ceiling on the number of pages a single walk may fetch.
pub const DEFAULT_MAX_PAGES: u32 = 1000;

const SEARCH_RESULTS: NodePath = NodePath::new("search results", &[
    Step::Key("csw:GetRecordsResponse"),
    Step::Key("csw:SearchResults"),
]);
const NEXT_RECORD: &str = "@nextRecord";
const ITEM_KEYS: [&str; 2] = ["gmd:MD_Metadata", "csw:Record"];
const EXCEPTION_REPORT: &str = "ows:ExceptionReport";

/// A single page of raw records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Start position of the following page, `0` when this was the last.
    pub next_position: i64,
}

impl Page {
    /// Extract the records and the next position from a decoded response.
    ///
    /// Records are reported either as ISO metadata or as Dublin Core; a
    /// single record is not wrapped in a list. Search results without
    /// records are an empty last page, whatever position they report.
    pub fn from_response(response: &Value) -> Result<Page, CatalogError> {
        if let Some(report) = response.get(EXCEPTION_REPORT) {
            return Err(CatalogError::ExceptionReport(exception_text(report)));
        }

        let results = SEARCH_RESULTS
            .resolve(response)
            .map_err(CatalogError::UnexpectedShape)?;

        let Some(items) = ITEM_KEYS.iter().find_map(|key| results.get(*key)) else {
            return Ok(Page::default());
        };

        Ok(Page {
            items: as_list(items),
            next_position: next_position(results).map_err(CatalogError::UnexpectedShape)?,
        })
    }
}

fn next_position(results: &Value) -> Result<i64, MappingError> {
    let invalid = |value: &Value| MappingError::InvalidValue {
        field: "next record",
        value: value.to_string(),
    };
    match results.get(NEXT_RECORD) {
        Some(value @ Value::Number(number)) => number.as_i64().ok_or_else(|| invalid(value)),
        Some(value @ Value::String(text)) => text.trim().parse().map_err(|_| invalid(value)),
        Some(Value::Null) | None => Err(MappingError::MissingField {
            field: "next record",
            key: NEXT_RECORD.to_string(),
            path: "csw:GetRecordsResponse/csw:SearchResults".to_string(),
        }),
        Some(value) => Err(invalid(value)),
    }
}

fn exception_text(report: &Value) -> String {
    fn collect(node: &Value, out: &mut Vec<String>) {
        match node {
            Value::String(text) => out.push(text.trim().to_string()),
            Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
            Value::Object(map) => {
                for (key, value) in map {
                    let is_text = key == "ows:ExceptionText" || key == "#text";
                    if is_text || value.is_object() || value.is_array() {
                        collect(value, out);
                    }
                }
            },
            _ => {},
        }
    }

    let mut texts = Vec::new();
    collect(report, &mut texts);
    texts.retain(|text| !text.is_empty());
    if texts.is_empty() {
        report.to_string()
    } else {
        texts.join("; ")
    }
}

/// Sends one page request to the catalog.
#[allow(async_fn_in_trait)]
pub trait PageTransport {
    async fn send_page(&self, request: &GetRecords) -> Result<Page, CatalogError>;
}

/// Create a stream of all records matching `request`, fetching pages as the
/// stream is consumed.
///
/// The stream fails with [CatalogError::PageLimitExceeded] if the catalog
/// still reports more data after `max_pages` pages.
pub fn make_paging_stream<'a, T: PageTransport>(
    transport: &'a T,
    request: &'a GetRecords,
    max_pages: u32,
) -> impl Stream<Item = Result<Value, CatalogError>> + 'a {
    try_stream! {
        let mut next_position = request.start_position();
        let mut pages = 0_u32;

        loop {
            if pages >= max_pages {
                Err::<(), _>(CatalogError::PageLimitExceeded(max_pages))?;
            }

            let page = transport.send_page(&request.at(next_position)).await?;
            pages += 1;
            debug!(
                start_position = next_position,
                items = page.items.len(),
                next_position = page.next_position,
                "received catalog page"
            );

            for item in page.items {
                yield item;
            }

            if page.next_position <= 0 {
                break;
            }
            next_position = page.next_position;
        }
    }
}

/// Fetch every record matching `request`.
///
/// A failing page fails the whole walk; records of earlier pages are
/// discarded.
pub async fn fetch_all<T: PageTransport>(
    transport: &T,
    request: &GetRecords,
    max_pages: u32,
) -> Result<Vec<Value>, CatalogError> {
    make_paging_stream(transport, request, max_pages)
        .try_collect()
        .await
}
