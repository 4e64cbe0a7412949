use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::{Config, MAX_SEARCH_RESULTS};
use crate::data_models::RawSearchItem;
use crate::error::{AppError, ServiceError};
use crate::query::Locale;

/// A product search engine. Results come back best match first.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// An empty result is not an error. Failures are [`AppError::SearchUnavailable`].
    async fn search(&self, query: &str, count: usize) -> Result<Vec<RawSearchItem>, AppError>;
}

/// Google Programmable Search (Custom Search JSON API).
#[derive(Clone)]
pub struct GoogleSearchClient {
    http_client: Client,
    endpoint: String,
    api_key: Option<String>,
    engine_id: Option<String>,
    locale: Locale,
}

#[derive(Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RawSearchItem>,
}

impl GoogleSearchClient {
    pub fn new(http_client: Client, config: &Config) -> Self {
        Self {
            http_client,
            endpoint: config.search_endpoint.clone(),
            api_key: config.search_api_key.clone(),
            engine_id: config.search_engine_id.clone(),
            locale: config.locale,
        }
    }

    async fn fetch(&self, query: &str, count: usize) -> Result<Vec<RawSearchItem>, ServiceError> {
        let (Some(api_key), Some(engine_id)) = (self.api_key.as_deref(), self.engine_id.as_deref())
        else {
            return Err(ServiceError::NotConfigured);
        };

        let num = count.clamp(1, MAX_SEARCH_RESULTS).to_string();
        let response = self
            .http_client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("key", api_key),
                ("cx", engine_id),
                ("q", query),
                ("num", num.as_str()),
                ("hl", self.locale.code()),
                ("gl", self.locale.code()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let parsed: SearchResponse = response.json().await?;
                Ok(parsed.items)
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(ServiceError::UnexpectedStatus { status, text })
            }
        }
    }
}

#[async_trait]
impl SearchService for GoogleSearchClient {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<RawSearchItem>, AppError> {
        let items = self
            .fetch(query, count)
            .await
            .map_err(AppError::SearchUnavailable)?;
        log::info!("search for {query:?} returned {} items", items.len());
        Ok(items)
    }
}
