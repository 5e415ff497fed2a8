//! Scripted collaborators shared by the integration tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pawtrip_agents::{Collaborators, PetTravelAgent};
use pawtrip_core::{
    Category, CategoryClassifier, CategorySet, FieldExtractor, MapLinker, ParsedQuery,
    PipelineSettings, PlaceFetcher, PlaceRecord, PlaceValidator, PromptKind, PromptVars,
    RawPlace, ServiceError, SourceRank, TextGenerator, VectorSearch, WeatherOutcome,
    WeatherService, WeatherSnapshot,
};
use pawtrip_observability::AppMetrics;

pub struct MockClassifier {
    pub categories: CategorySet,
    pub panics: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl CategoryClassifier for MockClassifier {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn classify_semantic(&self, _query: &str) -> Result<CategorySet, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("classifier exploded");
        }
        Ok(self.categories.clone())
    }
}

pub struct MockExtractor {
    pub parsed: ParsedQuery,
}

#[async_trait]
impl FieldExtractor for MockExtractor {
    async fn extract_fields(&self, _query: &str) -> Result<ParsedQuery, ServiceError> {
        Ok(self.parsed.clone())
    }
}

#[derive(Default)]
pub struct MockVectorSearch {
    pub hits: BTreeMap<Category, Vec<PlaceRecord>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl VectorSearch for MockVectorSearch {
    async fn vector_search(
        &self,
        _query: &str,
        categories: &CategorySet,
        _k_each: usize,
        _top_k: usize,
    ) -> Result<BTreeMap<Category, Vec<PlaceRecord>>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .hits
            .iter()
            .filter(|(category, _)| categories.contains(category))
            .map(|(category, places)| (*category, places.clone()))
            .collect())
    }
}

/// Returns `places`, or fails with a network error on every call.
#[derive(Default)]
pub struct MockPlaceFetcher {
    pub places: Vec<RawPlace>,
    pub always_fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl PlaceFetcher for MockPlaceFetcher {
    async fn fetch_places(
        &self,
        _parsed: &ParsedQuery,
        n: usize,
    ) -> Result<Vec<RawPlace>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.always_fail {
            return Err(ServiceError::Network("connection reset".to_string()));
        }
        Ok(self.places.iter().take(n).cloned().collect())
    }
}

/// Accepts every title except those listed in `unknown`.
#[derive(Default)]
pub struct MockValidator {
    pub unknown: BTreeSet<String>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl PlaceValidator for MockValidator {
    async fn validate_place_exists(&self, title: &str) -> Result<bool, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(!self.unknown.contains(title))
    }
}

pub struct MockLinker;

impl MapLinker for MockLinker {
    fn build_map_link(&self, title: &str, _city: Option<&str>) -> Result<String, ServiceError> {
        if title.trim().is_empty() {
            return Err(ServiceError::InvalidInput("blank title".to_string()));
        }
        Ok(format!("https://maps.test/{}", title.trim()))
    }
}

#[derive(Default)]
pub struct MockWeather {
    pub snapshot: Option<WeatherSnapshot>,
    pub regions: Mutex<Vec<String>>,
}

impl MockWeather {
    pub fn requested_regions(&self) -> Vec<String> {
        self.regions
            .lock()
            .map(|regions| regions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl WeatherService for MockWeather {
    async fn get_weather(&self, region: &str) -> Result<WeatherOutcome, ServiceError> {
        if let Ok(mut regions) = self.regions.lock() {
            regions.push(region.to_string());
        }
        match &self.snapshot {
            Some(snapshot) => Ok(WeatherOutcome::Observed(snapshot.clone())),
            None => Err(ServiceError::Timeout(std::time::Duration::from_secs(10))),
        }
    }
}

/// Answers each prompt kind with a fixed marker; kinds in `failing` error.
#[derive(Default)]
pub struct MockGenerator {
    pub failing: HashSet<PromptKind>,
    pub calls: AtomicUsize,
}

impl MockGenerator {
    pub fn marker(kind: PromptKind) -> &'static str {
        match kind {
            PromptKind::Greeting => "속초 여행을 도와드릴게요",
            PromptKind::TransitRules => "[transit-rules]",
            PromptKind::TravelCourse => "[travel-course]",
            PromptKind::QueryAnalysis => "{}",
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate_text(
        &self,
        kind: PromptKind,
        _vars: &PromptVars,
    ) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&kind) {
            return Err(ServiceError::http(503, "overloaded"));
        }
        Ok(Self::marker(kind).to_string())
    }
}

pub fn place(title: &str, bucket: Category) -> PlaceRecord {
    PlaceRecord {
        title: title.to_string(),
        address: Some("강원특별자치도 속초시".to_string()),
        pet_info: Some("소형견 동반 가능".to_string()),
        bucket,
        source: SourceRank::Vector,
    }
}

pub fn raw_place(title: &str) -> RawPlace {
    RawPlace {
        title: title.to_string(),
        address: Some("강원특별자치도 속초시".to_string()),
        pet_info: None,
    }
}

pub fn sokcho_weather() -> WeatherSnapshot {
    WeatherSnapshot {
        city: "속초".to_string(),
        temperature: "18.5".to_string(),
        humidity: "55".to_string(),
        precipitation_kind: "맑음".to_string(),
        wind_speed: "1.5".to_string(),
    }
}

/// One set of mocks wired into an agent. Fields stay reachable for
/// call-count assertions.
pub struct MockWorld {
    pub classifier: Arc<MockClassifier>,
    pub extractor: Arc<MockExtractor>,
    pub vector: Arc<MockVectorSearch>,
    pub fetcher: Arc<MockPlaceFetcher>,
    pub validator: Arc<MockValidator>,
    pub weather: Arc<MockWeather>,
    pub generator: Arc<MockGenerator>,
    pub metrics: Arc<AppMetrics>,
}

impl Default for MockWorld {
    fn default() -> Self {
        Self {
            classifier: Arc::new(MockClassifier {
                categories: CategorySet::new(),
                panics: false,
                calls: AtomicUsize::new(0),
            }),
            extractor: Arc::new(MockExtractor {
                parsed: ParsedQuery::default(),
            }),
            vector: Arc::new(MockVectorSearch::default()),
            fetcher: Arc::new(MockPlaceFetcher::default()),
            validator: Arc::new(MockValidator::default()),
            weather: Arc::new(MockWeather::default()),
            generator: Arc::new(MockGenerator::default()),
            metrics: AppMetrics::shared(),
        }
    }
}

impl MockWorld {
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.classifier = Arc::new(MockClassifier {
            categories: categories.into_iter().collect(),
            panics: false,
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_panicking_classifier(mut self) -> Self {
        self.classifier = Arc::new(MockClassifier {
            categories: CategorySet::new(),
            panics: true,
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_parsed(mut self, parsed: ParsedQuery) -> Self {
        self.extractor = Arc::new(MockExtractor { parsed });
        self
    }

    pub fn with_vector_hits(mut self, hits: Vec<PlaceRecord>) -> Self {
        let mut grouped: BTreeMap<Category, Vec<PlaceRecord>> = BTreeMap::new();
        for hit in hits {
            grouped.entry(hit.bucket).or_default().push(hit);
        }
        self.vector = Arc::new(MockVectorSearch {
            hits: grouped,
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_api_places(mut self, places: Vec<RawPlace>) -> Self {
        self.fetcher = Arc::new(MockPlaceFetcher {
            places,
            always_fail: false,
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_failing_fetcher(mut self) -> Self {
        self.fetcher = Arc::new(MockPlaceFetcher {
            places: Vec::new(),
            always_fail: true,
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_unknown_places(mut self, titles: &[&str]) -> Self {
        self.validator = Arc::new(MockValidator {
            unknown: titles.iter().map(|title| title.to_string()).collect(),
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_weather(mut self, snapshot: WeatherSnapshot) -> Self {
        self.weather = Arc::new(MockWeather {
            snapshot: Some(snapshot),
            regions: Mutex::new(Vec::new()),
        });
        self
    }

    pub fn with_failing_generation(mut self, kinds: &[PromptKind]) -> Self {
        self.generator = Arc::new(MockGenerator {
            failing: kinds.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn settings() -> PipelineSettings {
        PipelineSettings::default().without_backoff()
    }

    pub fn agent(&self) -> PetTravelAgent {
        PetTravelAgent::new(
            Collaborators {
                classifier: self.classifier.clone(),
                extractor: self.extractor.clone(),
                vector: self.vector.clone(),
                fetcher: self.fetcher.clone(),
                validator: self.validator.clone(),
                linker: Arc::new(MockLinker),
                weather: self.weather.clone(),
                generator: self.generator.clone(),
            },
            Self::settings(),
            self.metrics.clone(),
        )
    }

    pub fn vector_calls(&self) -> usize {
        self.vector.calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetcher.calls.load(Ordering::SeqCst)
    }

    pub fn generation_calls(&self) -> usize {
        self.generator.calls.load(Ordering::SeqCst)
    }
}
