//! HTTP transport to a CSW catalog endpoint.

use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{self, HeaderMap};
use tracing::{debug, instrument};

use crate::config::CatalogClientConfig;
use crate::error::CatalogError;
use crate::mock::MockGuard;
use crate::paging::{Page, PageTransport};
use crate::request::GetRecords;

const XML_CONTENT_TYPE: &str = "application/xml";

/// Posts `GetRecords` documents to a catalog endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    config: CatalogClientConfig,

    _mock_guard: Option<MockGuard>,
}

impl Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("catalog_url", &self.config.catalog_url)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogError> {
        let catalog_url = url::Url::parse(&config.catalog_url)
            .map_err(|err| CatalogError::InvalidUrl(config.catalog_url.clone(), err))?;

        // create a mock server if configured
        let mock_guard = MockGuard::new(&config);
        let endpoint = match mock_guard {
            Some(ref mock) => mock.endpoint(&catalog_url),
            None => catalog_url.to_string(),
        };

        let client = build_http_client(&config)?;

        Ok(Self {
            client,
            endpoint,
            config,
            _mock_guard: mock_guard,
        })
    }

    /// Get the configured catalog URL.
    pub fn catalog_url(&self) -> &str {
        &self.config.catalog_url
    }

    pub fn config(&self) -> &CatalogClientConfig {
        &self.config
    }
}

impl PageTransport for HttpTransport {
    #[instrument(skip_all, fields(
        start_position = request.start_position(),
        schema = request.output_schema().uri()))]
    async fn send_page(&self, request: &GetRecords) -> Result<Page, CatalogError> {
        debug!(endpoint = %self.endpoint, "sending GetRecords request");
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(request.to_xml())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "catalog responded with an error status");
            return Err(CatalogError::Status { status });
        }

        let body = response.text().await?;
        if body.trim_start().starts_with("<?xml") {
            debug!("catalog responded with an XML document");
            return Err(CatalogError::XmlResponse);
        }

        let value = serde_json::from_str(&body).map_err(CatalogError::MalformedResponse)?;
        let page = Page::from_response(&value)?;
        debug!(
            items = page.items.len(),
            next_position = page.next_position,
            "received page"
        );
        Ok(page)
    }
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

/// Build the HTTP client used for all catalog requests.
fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogError> {
    let mut headers = HeaderMap::new();

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key)
                .map_err(|e: header::InvalidHeaderName| CatalogError::Client(e.to_string()))?,
            header::HeaderValue::from_str(value)
                .map_err(|e: header::InvalidHeaderValue| CatalogError::Client(e.to_string()))?,
        );
    }

    debug!(
        catalog_url = %config.catalog_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder
        .build()
        .map_err(|e| CatalogError::Client(e.to_string()))
}
