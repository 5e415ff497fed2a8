//! Query analysis backed by a text generator returning JSON.

use std::sync::Arc;

use async_trait::async_trait;
use pawtrip_core::prompt::analysis_vars;
use pawtrip_core::{
    Category, CategoryClassifier, CategorySet, FieldExtractor, ParsedQuery, PromptKind,
    ServiceError, TextGenerator,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct Analysis {
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    pet_type: Option<String>,
    #[serde(default)]
    days: Option<serde_json::Value>,
}

impl Analysis {
    fn categories(&self) -> CategorySet {
        self.categories
            .iter()
            .filter_map(|label| Category::parse(label))
            .collect()
    }

    fn parsed(self) -> ParsedQuery {
        let days = self.days.as_ref().and_then(|value| match value {
            serde_json::Value::Number(number) => number.as_u64(),
            serde_json::Value::String(text) => text
                .trim()
                .trim_end_matches('일')
                .parse::<u64>()
                .ok(),
            _ => None,
        });

        ParsedQuery {
            region: self.region,
            pet_type: self.pet_type,
            days: days.and_then(|days| u32::try_from(days).ok()).filter(|d| *d > 0),
        }
    }
}

/// Classifier and extractor over one generator. Each trait call issues its
/// own analysis request.
#[derive(Clone)]
pub struct LlmQueryAnalyzer {
    generator: Arc<dyn TextGenerator>,
}

impl LlmQueryAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    async fn analyze(&self, query: &str) -> Result<Analysis, ServiceError> {
        let text = self
            .generator
            .generate_text(PromptKind::QueryAnalysis, &analysis_vars(query))
            .await?;
        let analysis = parse_analysis(&text)?;
        debug!(categories = ?analysis.categories, "query analysis parsed");
        Ok(analysis)
    }
}

/// Accepts bare JSON or JSON wrapped in prose or a code fence.
fn parse_analysis(text: &str) -> Result<Analysis, ServiceError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(ServiceError::InvalidResponse(
                "analysis reply contained no JSON object".to_string(),
            ))
        }
    };

    serde_json::from_str(json)
        .map_err(|error| ServiceError::InvalidResponse(format!("analysis reply: {error}")))
}

#[async_trait]
impl CategoryClassifier for LlmQueryAnalyzer {
    fn name(&self) -> &'static str {
        "llm-analysis"
    }

    async fn classify_semantic(&self, query: &str) -> Result<CategorySet, ServiceError> {
        Ok(self.analyze(query).await?.categories())
    }
}

#[async_trait]
impl FieldExtractor for LlmQueryAnalyzer {
    async fn extract_fields(&self, query: &str) -> Result<ParsedQuery, ServiceError> {
        Ok(self.analyze(query).await?.parsed())
    }
}

#[cfg(test)]
mod tests {
    use pawtrip_core::PromptVars;

    use super::*;

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate_text(
            &self,
            kind: PromptKind,
            vars: &PromptVars,
        ) -> Result<String, ServiceError> {
            assert_eq!(kind, PromptKind::QueryAnalysis);
            assert!(vars.get("query").is_some());
            Ok(self.0.to_string())
        }
    }

    fn analyzer(reply: &'static str) -> LlmQueryAnalyzer {
        LlmQueryAnalyzer::new(Arc::new(CannedGenerator(reply)))
    }

    #[tokio::test]
    async fn reads_fenced_json() {
        let analyzer = analyzer(
            "```json\n{\"categories\": [\"숙박\", \"날씨\", \"unknown\"], \"region\": \"속초\", \"pet_type\": \"강아지\", \"days\": \"3일\"}\n```",
        );

        let categories = analyzer.classify_semantic("q").await.expect("categories");
        assert_eq!(
            categories,
            CategorySet::from([Category::Lodging, Category::Weather])
        );

        let parsed = analyzer.extract_fields("q").await.expect("parsed");
        assert_eq!(parsed.region(), Some("속초"));
        assert_eq!(parsed.pet_type(), Some("강아지"));
        assert_eq!(parsed.days, Some(3));
    }

    #[tokio::test]
    async fn zero_days_is_dropped() {
        let parsed = analyzer(r#"{"categories": [], "region": null, "days": 0}"#)
            .extract_fields("q")
            .await
            .expect("parsed");
        assert_eq!(parsed.days, None);
        assert_eq!(parsed.region(), None);
    }

    #[tokio::test]
    async fn prose_without_json_is_invalid_response() {
        let result = analyzer("잘 모르겠어요").classify_semantic("q").await;
        assert!(matches!(result, Err(ServiceError::InvalidResponse(_))));
    }
}
