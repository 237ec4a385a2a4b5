//! Discovery operations composed from filters, paging, mapping and the
//! snapshot filter.

use std::fmt::Debug;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::client::HttpTransport;
use crate::config::CatalogClientConfig;
use crate::error::{CatalogError, DiscoveryError, ValidationError};
use crate::filter::QueryConstraints;
use crate::mapping::{map_granule, map_granule_version, map_product_detail, map_product_summary};
use crate::paging::{fetch_all, PageTransport};
use crate::request::{GetRecords, OutputSchema};
use crate::snapshot;
use crate::store::{BandLookup, MutationStore};
use crate::types::*;

/// The catalog discovery interface.
///
/// Every operation builds its own filter and runs its page walk to
/// completion; implementations hold no per-request state.
#[allow(async_fn_in_trait)]
pub trait DiscoveryApi {
    /// List all products (series) known to the catalog.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, DiscoveryError>;

    /// Describe a single product including its extents and bands.
    async fn product_detail(&self, product: &ProductId) -> Result<ProductRecord, DiscoveryError>;

    /// List the granules of a product matching `query`.
    async fn list_granules(
        &self,
        query: &GranuleQuery,
        detail: GranuleDetail,
    ) -> Result<GranuleListing, DiscoveryError>;

    /// Render the first page request a listing for `query` would send,
    /// without contacting the catalog.
    fn preview_query(&self, query: &GranuleQuery) -> Result<String, DiscoveryError>;
}

/// A [DiscoveryApi] backed by a catalog transport.
pub struct CatalogClient<T = HttpTransport> {
    transport: T,
    mutations: Box<dyn MutationStore + Send + Sync>,
    bands: Box<dyn BandLookup + Send + Sync>,
    page_size: u32,
    max_pages: u32,
}

impl<T: Debug> Debug for CatalogClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("transport", &self.transport)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

impl CatalogClient<HttpTransport> {
    /// Create a client talking HTTP to the configured catalog.
    pub fn new(
        config: CatalogClientConfig,
        mutations: impl MutationStore + Send + Sync + 'static,
        bands: impl BandLookup + Send + Sync + 'static,
    ) -> Result<Self, CatalogError> {
        let page_size = config.page_size;
        let max_pages = config.max_pages;
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(transport, mutations, bands)
            .with_page_size(page_size)
            .with_max_pages(max_pages))
    }
}

impl<T: PageTransport> CatalogClient<T> {
    /// Create a client on top of an arbitrary transport.
    pub fn with_transport(
        transport: T,
        mutations: impl MutationStore + Send + Sync + 'static,
        bands: impl BandLookup + Send + Sync + 'static,
    ) -> Self {
        Self {
            transport,
            mutations: Box::new(mutations),
            bands: Box::new(bands),
            page_size: crate::request::DEFAULT_PAGE_SIZE,
            max_pages: crate::paging::DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn granule_request(
        &self,
        query: &GranuleQuery,
        snapshot: Option<Cutoff>,
    ) -> Result<GetRecords, DiscoveryError> {
        let filter = QueryConstraints {
            identifier: Some(query.product.to_string()),
            bbox: query.bbox.clone(),
            start: query.temporal.start.clone(),
            end: query.temporal.end.clone(),
            as_series: false,
            snapshot_timestamp: snapshot,
        }
        .build()?;
        Ok(GetRecords::new(&filter, OutputSchema::Granule, self.page_size))
    }

    async fn fetch(&self, request: &GetRecords) -> Result<Vec<serde_json::Value>, DiscoveryError> {
        let items = fetch_all(&self.transport, request, self.max_pages).await?;
        debug!(items = items.len(), "fetched catalog records");
        Ok(items)
    }
}

impl<T: PageTransport> DiscoveryApi for CatalogClient<T> {
    #[instrument(skip_all)]
    async fn list_products(&self) -> Result<Vec<ProductRecord>, DiscoveryError> {
        let filter = QueryConstraints::series(None).build()?;
        let request = GetRecords::new(&filter, OutputSchema::Series, self.page_size);

        let products = self
            .fetch(&request)
            .await?
            .iter()
            .map(map_product_summary)
            .collect::<Result<Vec<_>, _>>()?;

        info!(products = products.len(), "listed products");
        Ok(products)
    }

    #[instrument(skip_all, fields(product = %product))]
    async fn product_detail(&self, product: &ProductId) -> Result<ProductRecord, DiscoveryError> {
        let filter = QueryConstraints::series(Some(product.to_string())).build()?;
        let request = GetRecords::new(&filter, OutputSchema::Series, self.page_size);

        let items = self.fetch(&request).await?;
        let Some(item) = items.first() else {
            return Err(DiscoveryError::ProductNotFound(product.clone()));
        };

        let mut detail = map_product_detail(item, Utc::now().date_naive())?;
        let bands = self.bands.get_bands(product)?;
        debug!(bands = bands.len(), "attached band metadata");
        detail.bands = Some(bands);

        Ok(detail)
    }

    #[instrument(skip(self, query), fields(product = %query.product))]
    async fn list_granules(
        &self,
        query: &GranuleQuery,
        detail: GranuleDetail,
    ) -> Result<GranuleListing, DiscoveryError> {
        let snapshot_cutoff = match detail {
            GranuleDetail::FilePaths => Some(query.cutoff.ok_or(ValidationError::MissingCutoff)?),
            GranuleDetail::Full | GranuleDetail::Short => None,
        };

        let request = self.granule_request(query, None)?;
        let items = self.fetch(&request).await?;

        // a snapshot cutoff is bound exactly for file path listings
        let listing = match (snapshot_cutoff, detail) {
            (Some(cutoff), _) => {
                let versions = items
                    .iter()
                    .map(map_granule_version)
                    .collect::<Result<Vec<_>, _>>()?;
                let mutation = self.mutations.read()?;
                debug!(%cutoff, ?mutation, granules = versions.len(), "applying snapshot");
                GranuleListing::FilePaths(snapshot::apply(&versions, &cutoff, &mutation))
            },
            (None, GranuleDetail::Short) => GranuleListing::Short(
                items
                    .iter()
                    .map(map_granule)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (None, _) => GranuleListing::Full(
                items
                    .into_iter()
                    .map(|metadata| -> Result<FullRecord, DiscoveryError> {
                        Ok(FullRecord {
                            record: map_granule(&metadata)?,
                            metadata,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        info!(records = listing.len(), "listed granules");
        Ok(listing)
    }

    fn preview_query(&self, query: &GranuleQuery) -> Result<String, DiscoveryError> {
        Ok(self.granule_request(query, query.cutoff)?.to_xml())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::error::MappingError;
    use crate::mapping::tests::{granule_json, series_json};
    use crate::paging::tests::StubTransport;
    use crate::paging::Page;
    use crate::store::{InMemoryMutationStore, MutationRecord, StaticBandCatalog};

    fn client(transport: StubTransport) -> CatalogClient<StubTransport> {
        client_with_mutation(transport, MutationRecord::default())
    }

    fn client_with_mutation(
        transport: StubTransport,
        mutation: MutationRecord,
    ) -> CatalogClient<StubTransport> {
        let bands = StaticBandCatalog::new(HashMap::from([(
            "s2a_prd_msil1c".to_string(),
            vec![BandInfo {
                band_id: "B02".to_string(),
                name: Some("blue".to_string()),
                wavelength_nm: Some(492.4),
                res_m: Some(10.0),
                scale: None,
                offset: None,
                data_type: None,
                unit: None,
            }],
        )]));
        CatalogClient::with_transport(transport, InMemoryMutationStore::new(mutation), bands)
            .with_page_size(2)
    }

    fn last_page(items: Vec<serde_json::Value>) -> Page {
        Page {
            items,
            next_position: 0,
        }
    }

    fn granule(day: u32) -> serde_json::Value {
        granule_json(
            &format!("https://data.example.org/products/S2A_202301{day:02}.tif"),
            &format!("2023-01-{day:02}T00:00:00"),
            &format!("2023-01-{day:02}T00:05:00"),
            &format!("2023-01-{day:02}"),
        )
    }

    fn query() -> GranuleQuery {
        GranuleQuery::new(ProductId::new("s2a_prd_msil1c").unwrap())
    }

    #[tokio::test]
    async fn lists_products_across_pages() {
        let transport = StubTransport::pages([
            Page {
                items: vec![series_json("a"), series_json("b")],
                next_position: 3,
            },
            last_page(vec![series_json("c")]),
        ]);
        let client = client(transport);

        let products = client.list_products().await.unwrap();

        let ids = products.iter().map(|p| p.data_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let requests = client.transport().requests.lock().unwrap();
        assert_eq!(requests[0].output_schema(), OutputSchema::Series);
        assert!(requests[0].filter_xml().contains("apiso:Type"));
    }

    #[tokio::test]
    async fn product_detail_attaches_bands() {
        let transport = StubTransport::pages([last_page(vec![series_json("s2a_prd_msil1c")])]);
        let client = client(transport);

        let detail = client
            .product_detail(&ProductId::new("s2a_prd_msil1c").unwrap())
            .await
            .unwrap();

        assert_eq!(detail.data_id, "s2a_prd_msil1c");
        assert_eq!(detail.bands.as_ref().map(Vec::len), Some(1));
        assert!(
            detail
                .temporal_extent
                .as_ref()
                .unwrap()
                .as_str()
                .starts_with("2015-06-23/")
        );
        let requests = client.transport().requests.lock().unwrap();
        assert!(requests[0].filter_xml().contains("<ogc:Literal>s2a_prd_msil1c</ogc:Literal>"));
    }

    #[tokio::test]
    async fn product_detail_of_unknown_product_has_no_bands() {
        let transport = StubTransport::pages([last_page(vec![series_json("other")])]);
        let detail = client(transport)
            .product_detail(&ProductId::new("other").unwrap())
            .await
            .unwrap();
        assert_eq!(detail.bands, Some(vec![]));
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let client = client(StubTransport::pages([last_page(vec![])]));
        let result = client
            .product_detail(&ProductId::new("nope").unwrap())
            .await;
        assert!(matches!(result, Err(DiscoveryError::ProductNotFound(id)) if id.as_str() == "nope"));
    }

    #[tokio::test]
    async fn short_listing_maps_records() {
        let client = client(StubTransport::pages([last_page(vec![granule(1), granule(2)])]));

        let listing = client
            .list_granules(&query(), GranuleDetail::Short)
            .await
            .unwrap();

        let GranuleListing::Short(records) = listing else {
            panic!("expected a short listing");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "S2A_20230102");
        let requests = client.transport().requests.lock().unwrap();
        assert_eq!(requests[0].output_schema(), OutputSchema::Granule);
        assert!(requests[0].filter_xml().contains("apiso:ParentIdentifier"));
    }

    #[tokio::test]
    async fn full_listing_keeps_metadata() {
        let client = client(StubTransport::pages([last_page(vec![granule(1)])]));

        let listing = client
            .list_granules(&query(), GranuleDetail::Full)
            .await
            .unwrap();

        let GranuleListing::Full(records) = listing else {
            panic!("expected a full listing");
        };
        assert_eq!(records[0].record.name, "S2A_20230101");
        assert_eq!(records[0].metadata, granule(1));
    }

    #[tokio::test]
    async fn file_paths_apply_snapshot() {
        let transport = StubTransport::pages([
            Page {
                items: vec![granule(1), granule(2)],
                next_position: 3,
            },
            last_page(vec![granule(3)]),
        ]);
        let mutation = MutationRecord {
            updated_at: None,
            deleted: true,
        };
        let client = client_with_mutation(transport, mutation);
        let query = query().with_cutoff("2023-01-03".parse().unwrap());

        let listing = client
            .list_granules(&query, GranuleDetail::FilePaths)
            .await
            .unwrap();

        let GranuleListing::FilePaths(paths) = listing else {
            panic!("expected file paths");
        };
        let names = paths.iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["S2A_20230102", "S2A_20230103"]);

        // listings are not filtered by modification date on the server
        let requests = client.transport().requests.lock().unwrap();
        assert!(!requests[0].filter_xml().contains("apiso:Modified"));
    }

    #[tokio::test]
    async fn file_paths_require_cutoff() {
        let client = client(StubTransport::pages([last_page(vec![granule(1)])]));

        let result = client.list_granules(&query(), GranuleDetail::FilePaths).await;

        assert!(matches!(
            result,
            Err(DiscoveryError::Validation(ValidationError::MissingCutoff))
        ));
        assert!(client.transport().requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cutoff_only_applies_to_file_paths() {
        let client = client(StubTransport::pages([last_page(vec![granule(1), granule(5)])]));
        let query = query().with_cutoff("2023-01-03".parse().unwrap());

        let listing = client
            .list_granules(&query, GranuleDetail::Short)
            .await
            .unwrap();

        let GranuleListing::Short(records) = listing else {
            panic!("expected a short listing");
        };
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn malformed_granule_fails_whole_listing() {
        let mut broken = granule(2);
        broken.as_object_mut().unwrap().remove("gmd:distributionInfo");
        let client = client(StubTransport::pages([last_page(vec![granule(1), broken])]));

        let result = client.list_granules(&query(), GranuleDetail::Short).await;

        assert!(matches!(
            result,
            Err(DiscoveryError::Mapping(MappingError::MissingField { field: "download url", .. }))
        ));
    }

    #[tokio::test]
    async fn catalog_failure_is_propagated() {
        let client = client(StubTransport::new([Err(CatalogError::ExceptionReport(
            "boom".to_string(),
        ))]));
        let result = client.list_granules(&query(), GranuleDetail::Short).await;
        assert!(matches!(
            result,
            Err(DiscoveryError::Catalog(CatalogError::ExceptionReport(_)))
        ));
    }

    #[test]
    fn preview_includes_snapshot_and_never_sends() {
        let client = client(StubTransport::default());
        let query = query()
            .with_bbox("15,5,20,10".parse().unwrap())
            .with_cutoff("2023-02-01".parse().unwrap());

        let preview = client.preview_query(&query).unwrap();

        assert!(preview.starts_with("<?xml"));
        assert!(preview.contains("<ogc:BBOX>"));
        assert!(preview.contains("<ogc:Literal>2023-02-01</ogc:Literal>"));
        assert!(preview.contains("maxRecords=\"2\""));
        assert!(client.transport().requests.lock().unwrap().is_empty());
    }

    #[test]
    fn full_record_serializes_flat() {
        let record = FullRecord {
            record: map_granule(&granule(1)).unwrap(),
            metadata: json!({"k": "v"}),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], json!("S2A_20230101"));
        assert_eq!(value["metadata"], json!({"k": "v"}));
    }
}
