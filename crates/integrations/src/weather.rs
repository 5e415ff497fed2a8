//! KMA ultra-short-term observation client.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeDelta, Timelike, Utc};
use pawtrip_core::{ServiceError, WeatherOutcome, WeatherService, WeatherSnapshot};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::IntegrationConfig;
use crate::http::{build_client, ensure_success, map_transport_error};

const KST_OFFSET_HOURS: i64 = 9;
/// Observations for hour H are published at H:40.
const PUBLISH_MINUTE: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CityCoordinates {
    pub lat: f64,
    pub lon: f64,
}

/// City name to coordinates, read from a `{ "서울": { "lat": .., "lon": .. } }`
/// JSON file. Values may be numbers or numeric strings.
#[derive(Debug, Clone, Default)]
pub struct CityCatalog {
    cities: BTreeMap<String, CityCoordinates>,
}

impl CityCatalog {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed reading city catalog: {}", path.as_ref().display()))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: BTreeMap<String, BTreeMap<String, serde_json::Value>> =
            serde_json::from_str(raw).context("city catalog is not valid JSON")?;

        let cities = value
            .into_iter()
            .filter_map(|(name, fields)| {
                let lat = fields.get("lat").and_then(coordinate)?;
                let lon = fields.get("lon").and_then(coordinate)?;
                Some((name, CityCoordinates { lat, lon }))
            })
            .collect();

        Ok(Self { cities })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, CityCoordinates)>) -> Self {
        Self {
            cities: entries.into_iter().collect(),
        }
    }

    /// Exact key first, then the first key containing `input`.
    pub fn resolve(&self, input: &str) -> Option<(&str, CityCoordinates)> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        self.cities
            .get_key_value(input)
            .or_else(|| self.cities.iter().find(|(name, _)| name.contains(input)))
            .map(|(name, coords)| (name.as_str(), *coords))
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

fn coordinate(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Lambert conformal conic projection onto the KMA 5 km forecast grid.
pub fn latlon_to_grid(lat: f64, lon: f64) -> (i32, i32) {
    const EARTH_RADIUS_KM: f64 = 6371.00877;
    const GRID_KM: f64 = 5.0;
    const SLAT1: f64 = 30.0;
    const SLAT2: f64 = 60.0;
    const OLON: f64 = 126.0;
    const OLAT: f64 = 38.0;
    const XO: f64 = 43.0;
    const YO: f64 = 136.0;

    let degrad = PI / 180.0;
    let re = EARTH_RADIUS_KM / GRID_KM;
    let slat1 = SLAT1 * degrad;
    let slat2 = SLAT2 * degrad;
    let olon = OLON * degrad;
    let olat = OLAT * degrad;

    let sn = (PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan();
    let sn = (slat1.cos() / slat2.cos()).ln() / sn.ln();
    let sf = (PI * 0.25 + slat1 * 0.5).tan().powf(sn) * slat1.cos() / sn;
    let ro = re * sf / (PI * 0.25 + olat * 0.5).tan().powf(sn);
    let ra = re * sf / (PI * 0.25 + lat * degrad * 0.5).tan().powf(sn);

    let mut theta = lon * degrad - olon;
    if theta > PI {
        theta -= 2.0 * PI;
    }
    if theta < -PI {
        theta += 2.0 * PI;
    }
    theta *= sn;

    let x = ra * theta.sin() + XO + 0.5;
    let y = ro - ra * theta.cos() + YO + 0.5;
    (x as i32, y as i32)
}

pub fn kst_now() -> NaiveDateTime {
    Utc::now().naive_utc() + TimeDelta::hours(KST_OFFSET_HOURS)
}

/// `(base_date, base_time)` of the latest published observation. Before
/// minute 40 the previous hour is used, crossing midnight when needed.
pub fn base_date_time(now: NaiveDateTime) -> (String, String) {
    let base = if now.minute() < PUBLISH_MINUTE {
        now - TimeDelta::hours(1)
    } else {
        now
    };
    (
        base.format("%Y%m%d").to_string(),
        format!("{:02}00", base.hour()),
    )
}

pub fn precipitation_label(code: &str) -> &'static str {
    match code.trim() {
        "0" => "맑음",
        "1" => "비",
        "2" => "비/눈",
        "3" => "눈",
        "4" => "소나기",
        _ => "알수없음",
    }
}

#[derive(Debug, Deserialize)]
struct KmaEnvelope {
    response: KmaResponse,
}

#[derive(Debug, Deserialize)]
struct KmaResponse {
    header: KmaHeader,
    #[serde(default)]
    body: Option<KmaBody>,
}

#[derive(Debug, Deserialize)]
struct KmaHeader {
    #[serde(rename = "resultCode")]
    result_code: String,
    #[serde(rename = "resultMsg", default)]
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct KmaBody {
    items: KmaItems,
}

#[derive(Debug, Deserialize)]
struct KmaItems {
    #[serde(default)]
    item: Vec<KmaItem>,
}

#[derive(Debug, Deserialize)]
struct KmaItem {
    category: String,
    #[serde(rename = "obsrValue")]
    obsr_value: String,
}

/// Category code to observed value, or the reason there is none.
fn parse_observations(raw: &str) -> Result<BTreeMap<String, String>, ServiceError> {
    let envelope: KmaEnvelope = serde_json::from_str(raw)
        .map_err(|error| ServiceError::InvalidResponse(format!("weather payload: {error}")))?;

    let header = envelope.response.header;
    if header.result_code != "00" {
        return Err(ServiceError::InvalidResponse(format!(
            "weather api result {}: {}",
            header.result_code, header.result_msg
        )));
    }

    Ok(envelope
        .response
        .body
        .map(|body| body.items.item)
        .unwrap_or_default()
        .into_iter()
        .map(|item| (item.category, item.obsr_value))
        .collect())
}

fn snapshot_from(city: &str, observations: &BTreeMap<String, String>) -> WeatherSnapshot {
    let reading = |code: &str| observations.get(code).cloned().unwrap_or_default();
    WeatherSnapshot {
        city: city.to_string(),
        temperature: reading("T1H"),
        humidity: reading("REH"),
        precipitation_kind: precipitation_label(
            observations.get("PTY").map(String::as_str).unwrap_or("0"),
        )
        .to_string(),
        wind_speed: reading("WSD"),
    }
}

pub struct KmaWeatherClient {
    http: Client,
    service_key: String,
    base_url: String,
    catalog: CityCatalog,
    timeout: Duration,
}

impl KmaWeatherClient {
    pub fn new(
        service_key: impl Into<String>,
        base_url: impl Into<String>,
        catalog: CityCatalog,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            http: build_client(timeout)?,
            service_key: service_key.into(),
            base_url: base_url.into(),
            catalog,
            timeout,
        })
    }

    pub fn from_config(config: &IntegrationConfig) -> Result<Self, ServiceError> {
        let service_key = config
            .kma_service_key
            .clone()
            .ok_or(ServiceError::NotConfigured("kma weather client"))?;
        let catalog = CityCatalog::from_json_file(&config.city_catalog)
            .map_err(|error| ServiceError::InvalidInput(format!("{error:#}")))?;
        info!(cities = catalog.len(), "weather city catalog loaded");

        Self::new(
            service_key,
            config.kma_base_url.clone(),
            catalog,
            config.http_timeout,
        )
    }
}

#[async_trait]
impl WeatherService for KmaWeatherClient {
    async fn get_weather(&self, region: &str) -> Result<WeatherOutcome, ServiceError> {
        let Some((city, coords)) = self.catalog.resolve(region) else {
            return Ok(WeatherOutcome::Unavailable {
                reason: format!("'{region}'에 해당하는 지역이 도시 목록에 없습니다."),
            });
        };

        let (nx, ny) = latlon_to_grid(coords.lat, coords.lon);
        let (base_date, base_time) = base_date_time(kst_now());
        debug!(city, nx, ny, %base_date, %base_time, "get_weather: requesting observation");

        let nx = nx.to_string();
        let ny = ny.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("serviceKey", self.service_key.as_str()),
                ("pageNo", "1"),
                ("numOfRows", "1000"),
                ("dataType", "JSON"),
                ("base_date", base_date.as_str()),
                ("base_time", base_time.as_str()),
                ("nx", nx.as_str()),
                ("ny", ny.as_str()),
            ])
            .send()
            .await
            .map_err(|error| map_transport_error(error, self.timeout))?;

        let raw = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(|error| map_transport_error(error, self.timeout))?;

        let observations = parse_observations(&raw)?;
        if observations.is_empty() {
            return Ok(WeatherOutcome::Unavailable {
                reason: "No weather data found for the given region.".to_string(),
            });
        }

        Ok(WeatherOutcome::Observed(snapshot_from(city, &observations)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn seoul_maps_to_its_published_grid_cell() {
        assert_eq!(latlon_to_grid(37.5665, 126.9780), (60, 127));
    }

    #[test]
    fn base_time_waits_for_publication() {
        assert_eq!(base_date_time(at(14, 39)), ("20261018".to_string(), "1300".to_string()));
        assert_eq!(base_date_time(at(14, 40)), ("20261018".to_string(), "1400".to_string()));
    }

    #[test]
    fn base_time_rolls_back_across_midnight() {
        assert_eq!(base_date_time(at(0, 10)), ("20261017".to_string(), "2300".to_string()));
    }

    #[test]
    fn precipitation_codes_map_to_korean_labels() {
        assert_eq!(precipitation_label("0"), "맑음");
        assert_eq!(precipitation_label("4"), "소나기");
        assert_eq!(precipitation_label("7"), "알수없음");
    }

    #[test]
    fn catalog_resolves_exact_then_partial() {
        let catalog = CityCatalog::from_json_str(
            r#"{"속초시": {"lat": "38.207", "lon": "128.5918"}, "속초": {"lat": 38.2, "lon": 128.59}, "서울특별시": {"lat": 37.5665, "lon": 126.978}, "broken": {"lat": "x"}}"#,
        )
        .expect("valid catalog");

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.resolve("속초").map(|(name, _)| name), Some("속초"));
        assert_eq!(catalog.resolve("서울").map(|(name, _)| name), Some("서울특별시"));
        assert!(catalog.resolve("부산").is_none());
        assert!(catalog.resolve("  ").is_none());
    }

    #[test]
    fn parses_observation_payload() {
        let raw = r#"{"response":{"header":{"resultCode":"00","resultMsg":"NORMAL_SERVICE"},
            "body":{"items":{"item":[
                {"category":"T1H","obsrValue":"18.5"},
                {"category":"REH","obsrValue":"55"},
                {"category":"PTY","obsrValue":"0"},
                {"category":"WSD","obsrValue":"1.5"}]}}}}"#;
        let observations = parse_observations(raw).expect("observations");
        let snapshot = snapshot_from("속초", &observations);
        assert_eq!(snapshot.temperature, "18.5");
        assert_eq!(snapshot.humidity, "55");
        assert_eq!(snapshot.precipitation_kind, "맑음");
        assert_eq!(snapshot.wind_speed, "1.5");
    }

    #[test]
    fn error_result_code_is_invalid_response() {
        let raw = r#"{"response":{"header":{"resultCode":"03","resultMsg":"NO_DATA"}}}"#;
        assert!(matches!(
            parse_observations(raw),
            Err(ServiceError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn unknown_region_is_reported_without_a_request() {
        let client = KmaWeatherClient::new(
            "key",
            "http://127.0.0.1:9/unused",
            CityCatalog::default(),
            Duration::from_secs(1),
        )
        .expect("client");
        let outcome = client.get_weather("아틀란티스").await.expect("outcome");
        assert!(matches!(outcome, WeatherOutcome::Unavailable { .. }));
    }
}
