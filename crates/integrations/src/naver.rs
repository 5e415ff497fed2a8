//! Naver map links and place existence checks.

use std::time::Duration;

use async_trait::async_trait;
use pawtrip_core::{MapLinker, PlaceValidator, ServiceError};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::IntegrationConfig;
use crate::http::{build_client, ensure_success, map_transport_error};

const MAP_SEARCH_URL: &str = "https://map.naver.com/p/search";

#[derive(Debug, Default, Clone, Copy)]
pub struct NaverMapLinker;

impl MapLinker for NaverMapLinker {
    fn build_map_link(&self, title: &str, city: Option<&str>) -> Result<String, ServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidInput(
                "map link needs a place title".to_string(),
            ));
        }

        let query = match city.map(str::trim).filter(|city| !city.is_empty()) {
            Some(city) if !title.contains(city) => format!("{city} {title}"),
            _ => title.to_string(),
        };

        Ok(format!(
            "{MAP_SEARCH_URL}/{}",
            urlencoding::encode(&query)
        ))
    }
}

/// Checks a title against Naver local search; any hit counts as existing.
pub struct NaverPlaceValidator {
    http: Client,
    client_id: String,
    client_secret: String,
    search_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct LocalSearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

impl NaverPlaceValidator {
    pub fn from_config(config: &IntegrationConfig) -> Result<Self, ServiceError> {
        let (client_id, client_secret) = config
            .naver_credentials()
            .ok_or(ServiceError::NotConfigured("naver place validator"))?;

        Ok(Self {
            http: build_client(config.http_timeout)?,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            search_url: config.naver_search_url.clone(),
            timeout: config.http_timeout,
        })
    }
}

#[async_trait]
impl PlaceValidator for NaverPlaceValidator {
    async fn validate_place_exists(&self, title: &str) -> Result<bool, ServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(false);
        }

        let response = self
            .http
            .get(&self.search_url)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .query(&[("query", title), ("display", "1")])
            .send()
            .await
            .map_err(|error| map_transport_error(error, self.timeout))?;

        let body: LocalSearchResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|error| map_transport_error(error, self.timeout))?;

        let exists = body.total > 0 || !body.items.is_empty();
        debug!(title, exists, "validate_place_exists: checked");
        Ok(exists)
    }
}

/// Accepts every non-blank title. Used when no validator credentials exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughValidator;

#[async_trait]
impl PlaceValidator for PassThroughValidator {
    async fn validate_place_exists(&self, title: &str) -> Result<bool, ServiceError> {
        Ok(!title.trim().is_empty())
    }
}
