//! The data discovery service: validates raw arguments, runs discovery
//! operations and answers every call with an [Envelope].

use csw_catalog::{
    Cutoff,
    DiscoveryApi,
    DiscoveryError,
    GranuleDetail,
    GranuleQuery,
    MutationRecord,
    MutationStore,
    ProductId,
    SpatialExtent,
    TemporalRange,
    Timestamp,
    ValidationError,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::envelope::{Envelope, Operation};

pub const DEFAULT_USER_ID: &str = "openeouser";

/// Unvalidated arguments of a granule listing or query preview.
///
/// Empty strings are treated like absent arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordsArgs {
    pub product: String,
    pub detail: Option<String>,
    pub spatial_extent: Option<String>,
    pub temporal_extent: Option<String>,
    pub timestamp: Option<String>,
}

fn non_empty(arg: &Option<String>) -> Option<&str> {
    arg.as_deref().map(str::trim).filter(|arg| !arg.is_empty())
}

impl RecordsArgs {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            ..Default::default()
        }
    }

    /// Validate the arguments into a query and the requested detail level.
    pub fn parse(&self) -> Result<(GranuleQuery, GranuleDetail), ValidationError> {
        let mut query = GranuleQuery::new(ProductId::new(self.product.as_str())?);
        if let Some(bbox) = non_empty(&self.spatial_extent) {
            query = query.with_bbox(bbox.parse::<SpatialExtent>()?);
        }
        if let Some(temporal) = non_empty(&self.temporal_extent) {
            query = query.with_temporal(temporal.parse::<TemporalRange>()?);
        }
        if let Some(timestamp) = non_empty(&self.timestamp) {
            query = query.with_cutoff(timestamp.parse::<Cutoff>()?);
        }
        let detail = non_empty(&self.detail)
            .map(str::parse::<GranuleDetail>)
            .transpose()?
            .unwrap_or_default();
        Ok((query, detail))
    }
}

pub struct DataService<C> {
    client: C,
    mutations: Box<dyn MutationStore + Send + Sync>,
    user_id: String,
}

impl<C: DiscoveryApi> DataService<C> {
    pub fn new(client: C, mutations: impl MutationStore + Send + Sync + 'static) -> Self {
        Self {
            client,
            mutations: Box::new(mutations),
            user_id: DEFAULT_USER_ID.to_string(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn respond<T: Serialize>(
        &self,
        result: Result<T, DiscoveryError>,
        operation: Operation,
    ) -> Envelope {
        match result {
            Ok(data) => Envelope::success(data, operation, &self.user_id),
            Err(err) => {
                if err.is_internal() {
                    error!(?operation, %err, "operation failed");
                } else {
                    warn!(?operation, %err, "rejected request");
                }
                Envelope::error(&err, operation, &self.user_id)
            },
        }
    }

    /// List all products available in the catalog.
    #[instrument(skip_all)]
    pub async fn products(&self) -> Envelope {
        let result = self.client.list_products().await;
        self.respond(result, Operation::Products)
    }

    /// Describe a single product.
    #[instrument(skip(self))]
    pub async fn product(&self, name: &str) -> Envelope {
        let result = async {
            let product = ProductId::new(name)?;
            self.client.product_detail(&product).await
        }
        .await;
        self.respond(result, Operation::ProductDetail)
    }

    /// List the granules of a product at the requested detail level.
    #[instrument(skip(self))]
    pub async fn records(&self, args: &RecordsArgs) -> Envelope {
        let result = async {
            let (query, detail) = args.parse()?;
            self.client.list_granules(&query, detail).await
        }
        .await;
        self.respond(result, Operation::Records)
    }

    /// Render the catalog request a listing would send.
    ///
    /// The detail level is validated but doesn't change the request.
    #[instrument(skip(self))]
    pub async fn query(&self, args: &RecordsArgs) -> Envelope {
        let result = args
            .parse()
            .map_err(DiscoveryError::from)
            .and_then(|(query, _)| self.client.preview_query(&query));
        self.respond(result, Operation::Query)
    }

    pub async fn mutation_state(&self) -> Envelope {
        let result = self.mutations.read().map_err(DiscoveryError::from);
        self.respond(result, Operation::MutationState)
    }

    /// Mark the archive as (no longer) having deletions.
    pub async fn set_deleted(&self, deleted: bool) -> Envelope {
        let result = self.update_state(|record| record.deleted = deleted);
        self.respond(result, Operation::MutationState)
    }

    /// Stamp the archive as updated now, or clear the stamp.
    pub async fn set_updated(&self, updated: bool) -> Envelope {
        let updated_at = updated.then(Timestamp::now);
        let result = self.update_state(|record| record.updated_at = updated_at);
        self.respond(result, Operation::MutationState)
    }

    fn update_state(
        &self,
        update: impl FnOnce(&mut MutationRecord),
    ) -> Result<MutationRecord, DiscoveryError> {
        let mut record = self.mutations.read()?;
        update(&mut record);
        self.mutations.write(&record)?;
        info!(?record, "updated mutation state");
        Ok(record)
    }
}
