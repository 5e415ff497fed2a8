//! Contracts for the external collaborators the pipeline calls. Every
//! implementation is shared across in-flight queries behind an `Arc`.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::{Category, CategorySet, ParsedQuery, PlaceRecord, RawPlace, WeatherOutcome};
use crate::prompt::{PromptKind, PromptVars};

/// Semantic topic classifier. Deterministic for repeated identical input.
#[async_trait]
pub trait CategoryClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify_semantic(&self, query: &str) -> Result<CategorySet, ServiceError>;
}

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract_fields(&self, query: &str) -> Result<ParsedQuery, ServiceError>;
}

/// Similarity search over the place index. Results come pre-bucketed.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn vector_search(
        &self,
        query: &str,
        categories: &CategorySet,
        k_each: usize,
        top_k: usize,
    ) -> Result<BTreeMap<Category, Vec<PlaceRecord>>, ServiceError>;
}

/// Live places API. `Ok(vec![])` means zero results, not a failure.
#[async_trait]
pub trait PlaceFetcher: Send + Sync {
    async fn fetch_places(&self, parsed: &ParsedQuery, n: usize)
        -> Result<Vec<RawPlace>, ServiceError>;
}

#[async_trait]
pub trait PlaceValidator: Send + Sync {
    async fn validate_place_exists(&self, title: &str) -> Result<bool, ServiceError>;
}

pub trait MapLinker: Send + Sync {
    /// Fails with `ServiceError::InvalidInput` on a blank title.
    fn build_map_link(&self, title: &str, city: Option<&str>) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait WeatherService: Send + Sync {
    async fn get_weather(&self, region: &str) -> Result<WeatherOutcome, ServiceError>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, kind: PromptKind, vars: &PromptVars)
        -> Result<String, ServiceError>;
}
