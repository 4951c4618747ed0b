//! Omeka-S REST API client.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{encode_pairs, ItemsRequest, RawItem, RawMedia, RawSitePage};
use super::{ContentApi, UpstreamError};
use crate::config::UpstreamConfig;
use crate::metrics::{UPSTREAM_REQUESTS, UPSTREAM_REQUEST_DURATION};

/// Omeka-S API client.
pub struct OmekaClient {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl OmekaClient {
    /// Create a new client.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(UpstreamError::NotConfigured(format!(
                "upstream base_url must be an http(s) URL, got '{}'",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        let credentials = match (&config.key_identity, &config.key_credential) {
            (Some(identity), Some(credential)) => Some((identity.clone(), credential.clone())),
            _ => None,
        };

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// GET `{base_url}/{path}?{pairs}` and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        mut pairs: Vec<(String, String)>,
    ) -> Result<T, UpstreamError> {
        if let Some((identity, credential)) = &self.credentials {
            pairs.push(("key_identity".to_string(), identity.clone()));
            pairs.push(("key_credential".to_string(), credential.clone()));
        }

        let url = if pairs.is_empty() {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/{}?{}", self.base_url, path, encode_pairs(&pairs))
        };

        debug!("Upstream GET {}/{}", self.base_url, path);
        let started = Instant::now();
        let result = self.send(&url).await;
        UPSTREAM_REQUEST_DURATION
            .with_label_values(&[endpoint])
            .observe(started.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                UPSTREAM_REQUESTS.with_label_values(&[endpoint, "error"]).inc();
                return Err(e);
            }
        };

        let parsed = response.json::<T>().await.map_err(|e| {
            UpstreamError::ParseError(format!("Failed to parse {} response: {}", endpoint, e))
        });
        let outcome = if parsed.is_ok() { "ok" } else { "error" };
        UPSTREAM_REQUESTS.with_label_values(&[endpoint, outcome]).inc();
        parsed
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, UpstreamError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl ContentApi for OmekaClient {
    async fn list_items(&self, request: &ItemsRequest) -> Result<Vec<RawItem>, UpstreamError> {
        self.get_json("items", "items", request.to_query_pairs())
            .await
    }

    async fn get_item(&self, id: u64) -> Result<RawItem, UpstreamError> {
        self.get_json("item", &format!("items/{}", id), Vec::new())
            .await
    }

    async fn get_media(&self, ids: &[u64]) -> Result<Vec<RawMedia>, UpstreamError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = ids.iter().map(u64::to_string).collect();
        self.get_json("media", "media", vec![("id".to_string(), ids.join(","))])
            .await
    }

    async fn get_site_pages(
        &self,
        site: &str,
        slug: &str,
    ) -> Result<Vec<RawSitePage>, UpstreamError> {
        let pairs = vec![
            ("site".to_string(), site.to_string()),
            ("slug".to_string(), slug.to_string()),
        ];
        self.get_json("site_pages", "site_pages", pairs).await
    }
}
