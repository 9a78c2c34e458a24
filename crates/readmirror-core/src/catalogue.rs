//! NeoDB catalogue lookup.
//!
//! Finds the Douban page of a book by ISBN through NeoDB's public search.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::NetworkConfig;
use crate::error::{MirrorError, Result};
use crate::network::{retry_call, HttpClient, RetryConfig};
use crate::source::Catalogue;

const DOUBAN_BOOK_PREFIX: &str = "https://book.douban.com";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    data: Vec<CatalogueEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogueEntry {
    isbn: Option<String>,
    external_resources: Vec<ExternalResource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExternalResource {
    url: String,
}

/// Catalogue backed by the NeoDB search API.
pub struct NeoDbCatalogue {
    http: HttpClient,
    base_url: String,
    retry: RetryConfig,
}

impl NeoDbCatalogue {
    pub fn new() -> Result<Self> {
        Self::with_base_url(NetworkConfig::NEODB_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Catalogue for NeoDbCatalogue {
    async fn lookup_external_url(&self, isbn: &str) -> Result<Option<String>> {
        let mut url = url::Url::parse(&format!("{}/catalog/search", self.base_url)).map_err(|e| {
            MirrorError::Config {
                message: format!("Invalid catalogue URL {}: {}", self.base_url, e),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("query", isbn)
            .append_pair("page", "1")
            .append_pair("category", "book");

        let response: SearchResponse = retry_call(&self.retry, || {
            self.http.get_json(url.as_str(), &[])
        })
        .await
        .map_err(|e| MirrorError::Enrichment {
            message: format!("catalogue search for {}: {}", isbn, e),
        })?;

        let found = response
            .data
            .into_iter()
            .find(|entry| entry.isbn.as_deref() == Some(isbn))
            .and_then(|entry| {
                entry
                    .external_resources
                    .into_iter()
                    .map(|r| r.url)
                    .find(|u| u.starts_with(DOUBAN_BOOK_PREFIX))
            });

        debug!("Catalogue lookup for {}: {:?}", isbn, found);
        Ok(found)
    }
}
