use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use pawtrip_core::{
    ParsedQuery, PipelineSettings, PlaceFetcher, PlaceValidator, PromptKind, PromptVars,
    RawPlace, ServiceError, TextGenerator, WeatherOutcome, WeatherService,
};
use pawtrip_integrations::{
    IntegrationConfig, KmaWeatherClient, LlmQueryAnalyzer, NaverMapLinker, NaverPlaceValidator,
    OpenAiTextGenerator, PassThroughValidator, PetPlacesClient,
};
use pawtrip_ml::PawMlStack;
use pawtrip_observability::AppMetrics;
use pawtrip_retrieval::PlaceIndex;
use serde::Serialize;
use tracing::{info, warn};

use crate::{Collaborators, PetTravelAgent};

const DEFAULT_PLACE_CATALOG: &str = "data/places";

/// What the environment provided, for startup logs and `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct AgentBootstrap {
    pub classifier: &'static str,
    pub llm_analysis: bool,
    pub places_indexed: usize,
    pub vector_enabled: bool,
    pub generator_configured: bool,
    pub places_api_configured: bool,
    pub validator: &'static str,
    pub weather_configured: bool,
}

/// Stands in for a collaborator whose credentials are missing. Every call
/// fails with a non-retryable `NotConfigured`, so sections degrade at once.
struct Unconfigured(&'static str);

#[async_trait]
impl TextGenerator for Unconfigured {
    async fn generate_text(
        &self,
        _kind: PromptKind,
        _vars: &PromptVars,
    ) -> Result<String, ServiceError> {
        Err(ServiceError::NotConfigured(self.0))
    }
}

#[async_trait]
impl PlaceFetcher for Unconfigured {
    async fn fetch_places(
        &self,
        _parsed: &ParsedQuery,
        _n: usize,
    ) -> Result<Vec<RawPlace>, ServiceError> {
        Err(ServiceError::NotConfigured(self.0))
    }
}

#[async_trait]
impl WeatherService for Unconfigured {
    async fn get_weather(&self, _region: &str) -> Result<WeatherOutcome, ServiceError> {
        Err(ServiceError::NotConfigured(self.0))
    }
}

/// Wires the pipeline from `PAWTRIP_*` variables. Missing credentials leave
/// the matching sections degraded instead of failing startup.
pub fn build_agent_from_env(metrics: Arc<AppMetrics>) -> Result<(PetTravelAgent, AgentBootstrap)> {
    let settings = PipelineSettings::from_env();
    let config = IntegrationConfig::from_env();
    let mut ml_stack = PawMlStack::load_default();

    let openai = configured(OpenAiTextGenerator::from_config(&config));
    let generator_configured = openai.is_some();
    let generator: Arc<dyn TextGenerator> = match openai {
        Some(client) => Arc::new(client),
        None => Arc::new(Unconfigured("text generator")),
    };

    let llm_analysis = generator_configured && env_flag("PAWTRIP_LLM_ANALYSIS");
    if llm_analysis {
        let analyzer = Arc::new(LlmQueryAnalyzer::new(generator.clone()));
        ml_stack = ml_stack
            .with_classifier(analyzer.clone())
            .with_extractor(analyzer);
    }

    let catalog_dir = env::var("PAWTRIP_PLACE_CATALOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_PLACE_CATALOG));
    let index = load_index(&catalog_dir, &ml_stack)?;
    let stats = index.stats();

    let places_client = configured(PetPlacesClient::from_config(&config));
    let places_api_configured = places_client.is_some();
    let fetcher: Arc<dyn PlaceFetcher> = match places_client {
        Some(client) => Arc::new(client),
        None => Arc::new(Unconfigured("places api")),
    };

    let (validator, validator_name): (Arc<dyn PlaceValidator>, &'static str) =
        match configured(NaverPlaceValidator::from_config(&config)) {
            Some(validator) => (Arc::new(validator), "naver-local-search"),
            None => (Arc::new(PassThroughValidator), "pass-through"),
        };

    let kma = configured(KmaWeatherClient::from_config(&config));
    let weather_configured = kma.is_some();
    let weather: Arc<dyn WeatherService> = match kma {
        Some(client) => Arc::new(client),
        None => Arc::new(Unconfigured("weather service")),
    };

    let report = AgentBootstrap {
        classifier: ml_stack.classifier.name(),
        llm_analysis,
        places_indexed: stats.places_loaded,
        vector_enabled: stats.vector_enabled,
        generator_configured,
        places_api_configured,
        validator: validator_name,
        weather_configured,
    };
    info!(bootstrap = ?report, "agent collaborators wired");

    let collaborators = Collaborators {
        classifier: ml_stack.classifier,
        extractor: ml_stack.extractor,
        vector: Arc::new(index),
        fetcher,
        validator,
        linker: Arc::new(NaverMapLinker),
        weather,
        generator,
    };

    Ok((PetTravelAgent::new(collaborators, settings, metrics), report))
}

fn load_index(catalog_dir: &Path, ml_stack: &PawMlStack) -> Result<PlaceIndex> {
    if !catalog_dir.exists() {
        warn!(path = %catalog_dir.display(), "place catalog missing, vector search will be empty");
        return Ok(PlaceIndex::from_places(
            Vec::new(),
            Some(ml_stack.embedder.clone()),
        ));
    }

    let index = PlaceIndex::from_catalog_dir(catalog_dir, Some(ml_stack.embedder.clone()))?;
    info!(
        path = %catalog_dir.display(),
        places = index.stats().places_loaded,
        "place catalog indexed"
    );
    Ok(index)
}

fn configured<T>(result: Result<T, ServiceError>) -> Option<T> {
    match result {
        Ok(client) => Some(client),
        Err(ServiceError::NotConfigured(name)) => {
            info!(collaborator = name, "not configured, section will degrade");
            None
        }
        Err(error) => {
            warn!(error = %error, "collaborator setup failed, section will degrade");
            None
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
