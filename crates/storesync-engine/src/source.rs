//! HTTP client for the source catalog API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use storesync_types::ProductRecord;

use crate::config::SourceConfig;
use crate::error::{Result, SyncError};

/// Source of catalog records.
///
/// `acknowledge` confirms one synchronized item back to the source; it is
/// best-effort and must never fail the run.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the current catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Connectivity`] when the source is unreachable
    /// or responds with a non-success status.
    async fn fetch_catalog(&self) -> Result<Vec<ProductRecord>>;

    /// Confirm one item as synchronized (best-effort).
    async fn acknowledge(&self, natural_key: &str);
}

/// Envelope the catalog endpoint wraps its records in.
#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    value: Vec<ProductRecord>,
}

/// `reqwest`-backed [`CatalogSource`].
pub struct SourceClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SourceClient {
    /// Build a client with the configured per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(anyhow::Error::from)?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn products_url(&self) -> String {
        format!("{}/products", self.endpoint)
    }
}

#[async_trait]
impl CatalogSource for SourceClient {
    async fn fetch_catalog(&self) -> Result<Vec<ProductRecord>> {
        let url = self.products_url();
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::Connectivity(format!("catalog fetch failed: {e}")))?
            .error_for_status()
            .map_err(|e| SyncError::Connectivity(format!("catalog fetch failed: {e}")))?;

        let body: CatalogResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Connectivity(format!("catalog response malformed: {e}")))?;

        tracing::info!(count = body.value.len(), "Fetched catalog from source");
        Ok(body.value)
    }

    async fn acknowledge(&self, natural_key: &str) {
        let url = self.products_url();
        let result = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "id": natural_key }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        if let Err(e) = result {
            tracing::warn!(natural_key, error = %e, "Source acknowledgement failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_envelope_decodes_records() {
        let json = r#"{"value":[{"natural_key":"A1","display_name":"Widget","price":9.5}]}"#;
        let body: CatalogResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.value.len(), 1);
        assert_eq!(body.value[0].natural_key, "A1");
        assert_eq!(body.value[0].price, Some(9.5));
    }

    #[test]
    fn response_envelope_defaults_to_empty() {
        let body: CatalogResponse = serde_json::from_str("{}").unwrap();
        assert!(body.value.is_empty());
    }

    #[test]
    fn endpoint_trailing_slash_normalized() {
        let config = SourceConfig {
            endpoint: "http://erp.local/api/".into(),
            timeout_secs: 5,
        };
        let client = SourceClient::new(&config).unwrap();
        assert_eq!(client.products_url(), "http://erp.local/api/products");
    }
}
