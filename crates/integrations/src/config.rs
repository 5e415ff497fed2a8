use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TOUR_API_BASE_URL: &str = "https://apis.data.go.kr/B551011/KorPetTourService";
pub const DEFAULT_KMA_BASE_URL: &str =
    "http://apis.data.go.kr/1360000/VilageFcstInfoService_2.0/getUltraSrtNcst";
pub const DEFAULT_NAVER_SEARCH_URL: &str = "https://openapi.naver.com/v1/search/local.json";

/// Credentials and endpoints for the HTTP collaborators. Missing keys leave
/// the matching collaborator unconfigured; the pipeline then degrades.
#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
    pub naver_search_url: String,
    pub tour_api_key: Option<String>,
    pub tour_api_base_url: String,
    pub kma_service_key: Option<String>,
    pub kma_base_url: String,
    pub city_catalog: PathBuf,
    pub http_timeout: Duration,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            naver_client_id: None,
            naver_client_secret: None,
            naver_search_url: DEFAULT_NAVER_SEARCH_URL.to_string(),
            tour_api_key: None,
            tour_api_base_url: DEFAULT_TOUR_API_BASE_URL.to_string(),
            kma_service_key: None,
            kma_base_url: DEFAULT_KMA_BASE_URL.to_string(),
            city_catalog: PathBuf::from("data/city_info.json"),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl IntegrationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai_api_key: secret("PAWTRIP_OPENAI_API_KEY").or_else(|| secret("OPENAI_API_KEY")),
            openai_model: env::var("PAWTRIP_OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: env::var("PAWTRIP_OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            naver_client_id: secret("PAWTRIP_NAVER_CLIENT_ID"),
            naver_client_secret: secret("PAWTRIP_NAVER_CLIENT_SECRET"),
            naver_search_url: env::var("PAWTRIP_NAVER_SEARCH_URL")
                .unwrap_or(defaults.naver_search_url),
            tour_api_key: secret("PAWTRIP_TOUR_API_KEY"),
            tour_api_base_url: env::var("PAWTRIP_TOUR_API_BASE_URL")
                .unwrap_or(defaults.tour_api_base_url),
            kma_service_key: secret("PAWTRIP_KMA_SERVICE_KEY"),
            kma_base_url: env::var("PAWTRIP_KMA_BASE_URL").unwrap_or(defaults.kma_base_url),
            city_catalog: env::var("PAWTRIP_CITY_CATALOG")
                .map(PathBuf::from)
                .unwrap_or(defaults.city_catalog),
            http_timeout: env::var("PAWTRIP_HTTP_TIMEOUT_SECONDS")
                .ok()
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        }
    }

    pub fn naver_credentials(&self) -> Option<(&str, &str)> {
        self.naver_client_id
            .as_deref()
            .zip(self.naver_client_secret.as_deref())
    }
}

fn secret(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
