//! Pet-friendly places from the Korea Tourism pet travel API.

use std::time::Duration;

use async_trait::async_trait;
use pawtrip_core::{ParsedQuery, PlaceFetcher, RawPlace, ServiceError};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::IntegrationConfig;
use crate::http::{build_client, ensure_success, map_transport_error};

const MOBILE_APP: &str = "pawtrip";

pub struct PetPlacesClient {
    http: Client,
    service_key: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TourEnvelope {
    response: TourResponse,
}

#[derive(Debug, Deserialize)]
struct TourResponse {
    header: TourHeader,
    #[serde(default)]
    body: Option<TourBody>,
}

#[derive(Debug, Deserialize)]
struct TourHeader {
    #[serde(rename = "resultCode")]
    result_code: String,
    #[serde(rename = "resultMsg", default)]
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct TourBody {
    #[serde(default)]
    items: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TourItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    addr1: Option<String>,
    #[serde(default, rename = "acmpyPsblCpam")]
    companion_info: Option<String>,
}

impl From<TourItem> for RawPlace {
    fn from(item: TourItem) -> Self {
        RawPlace {
            title: item.title,
            address: item.addr1,
            pet_info: item.companion_info,
        }
    }
}

impl PetPlacesClient {
    pub fn new(
        service_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: build_client(timeout)?,
            service_key: service_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &IntegrationConfig) -> Result<Self, ServiceError> {
        let service_key = config
            .tour_api_key
            .clone()
            .ok_or(ServiceError::NotConfigured("pet places client"))?;
        Self::new(service_key, config.tour_api_base_url.clone(), config.http_timeout)
    }
}

/// Search keyword built from the parsed region, falling back to the pet type.
fn search_keyword(parsed: &ParsedQuery) -> Option<String> {
    parsed
        .region()
        .or_else(|| parsed.pet_type())
        .map(ToString::to_string)
}

/// `items` is `""` when empty and `item` is an object for a single hit.
fn parse_items(raw: &str) -> Result<Vec<RawPlace>, ServiceError> {
    let envelope: TourEnvelope = serde_json::from_str(raw)
        .map_err(|error| ServiceError::InvalidResponse(format!("places payload: {error}")))?;

    let header = envelope.response.header;
    if header.result_code != "0000" && header.result_code != "00" {
        return Err(ServiceError::InvalidResponse(format!(
            "places api result {}: {}",
            header.result_code, header.result_msg
        )));
    }

    let Some(item) = envelope
        .response
        .body
        .and_then(|body| body.items.get("item").cloned())
    else {
        return Ok(Vec::new());
    };

    let items: Vec<TourItem> = match item {
        serde_json::Value::Array(values) => values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect(),
        single @ serde_json::Value::Object(_) => {
            serde_json::from_value(single).into_iter().collect()
        }
        _ => Vec::new(),
    };

    Ok(items.into_iter().map(RawPlace::from).collect())
}

#[async_trait]
impl PlaceFetcher for PetPlacesClient {
    async fn fetch_places(
        &self,
        parsed: &ParsedQuery,
        n: usize,
    ) -> Result<Vec<RawPlace>, ServiceError> {
        let keyword = search_keyword(parsed).ok_or_else(|| {
            ServiceError::InvalidInput("parsed query has neither region nor pet type".to_string())
        })?;
        debug!(%keyword, n, "fetch_places: called");

        let rows = n.to_string();
        let response = self
            .http
            .get(format!("{}/searchKeyword", self.base_url))
            .query(&[
                ("serviceKey", self.service_key.as_str()),
                ("MobileOS", "ETC"),
                ("MobileApp", MOBILE_APP),
                ("_type", "json"),
                ("numOfRows", rows.as_str()),
                ("pageNo", "1"),
                ("keyword", keyword.as_str()),
            ])
            .send()
            .await
            .map_err(|error| map_transport_error(error, self.timeout))?;

        let raw = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(|error| map_transport_error(error, self.timeout))?;

        let mut places = parse_items(&raw)?;
        places.truncate(n);
        debug!(count = places.len(), "fetch_places: parsed");
        Ok(places)
    }
}
