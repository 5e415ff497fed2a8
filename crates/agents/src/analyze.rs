//! Category and field analysis: rules merged with the injected semantic
//! collaborators, run concurrently.

use std::sync::Arc;

use pawtrip_core::{
    classify_categories_rules, extract_fields_rules, extract_weather_region, retry_or_degrade,
    Category, CategoryClassifier, CategorySet, FieldExtractor, ParsedQuery, PipelineSettings,
};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAnalysis {
    pub categories: CategorySet,
    pub parsed: ParsedQuery,
    /// Region used for the weather lookup, when one could be found.
    pub weather_region: Option<String>,
    pub semantic_degraded: bool,
    pub extraction_degraded: bool,
}

#[derive(Clone)]
pub struct QueryAnalyzer {
    classifier: Arc<dyn CategoryClassifier>,
    extractor: Arc<dyn FieldExtractor>,
    settings: PipelineSettings,
}

impl QueryAnalyzer {
    pub fn new(
        classifier: Arc<dyn CategoryClassifier>,
        extractor: Arc<dyn FieldExtractor>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            classifier,
            extractor,
            settings,
        }
    }

    /// Never fails: a failing collaborator leaves the rule results in place.
    pub async fn analyze(&self, query: &str) -> QueryAnalysis {
        let policy = self.settings.analysis_policy();
        let (semantic, extracted) = tokio::join!(
            retry_or_degrade(
                "classify_semantic",
                &policy,
                || self.classifier.classify_semantic(query),
                |_| CategorySet::new(),
            ),
            retry_or_degrade(
                "extract_fields",
                &policy,
                || self.extractor.extract_fields(query),
                |_| ParsedQuery::default(),
            ),
        );

        let semantic_degraded = semantic.is_degraded();
        let extraction_degraded = extracted.is_degraded();

        let mut categories = classify_categories_rules(query);
        categories.extend(semantic.into_inner());

        let parsed = extracted
            .into_inner()
            .or_fill(&extract_fields_rules(query));
        let weather_region = resolve_weather_region(query, &categories, &parsed);

        debug!(
            classifier = self.classifier.name(),
            categories = ?categories,
            region = ?parsed.region(),
            weather_region = ?weather_region,
            "query analyzed"
        );

        QueryAnalysis {
            categories,
            parsed,
            weather_region,
            semantic_degraded,
            extraction_degraded,
        }
    }
}

/// The parsed region when present, otherwise the weather phrasing fallback.
/// Only resolved when weather was asked about.
pub fn resolve_weather_region(
    query: &str,
    categories: &CategorySet,
    parsed: &ParsedQuery,
) -> Option<String> {
    if !categories.contains(&Category::Weather) {
        return None;
    }

    parsed
        .region()
        .map(ToString::to_string)
        .or_else(|| extract_weather_region(query))
}
