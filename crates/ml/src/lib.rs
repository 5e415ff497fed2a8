mod cache;
mod centroid;
mod extract;
mod fallback;

use std::env;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pawtrip_core::{classify_categories_rules, CategoryClassifier, CategorySet, FieldExtractor, ServiceError};
use pawtrip_retrieval::EmbeddingModel;
use tracing::warn;

pub use cache::CachedCategoryClassifier;
pub use centroid::CentroidCategoryClassifier;
pub use extract::RuleFieldExtractor;
pub use fallback::HashEmbeddingModel;

const EMBEDDING_DIMS: usize = 192;
const CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
pub struct RuleCategoryClassifier;

#[async_trait]
impl CategoryClassifier for RuleCategoryClassifier {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn classify_semantic(&self, query: &str) -> Result<CategorySet, ServiceError> {
        Ok(classify_categories_rules(query))
    }
}

/// Local models shared by the pipeline and the place index.
#[derive(Clone)]
pub struct PawMlStack {
    pub embedder: Arc<dyn EmbeddingModel>,
    pub classifier: Arc<dyn CategoryClassifier>,
    pub extractor: Arc<dyn FieldExtractor>,
}

impl PawMlStack {
    /// Centroid classifier over `PAWTRIP_CATEGORY_DATASET` when the file
    /// loads, keyword rules otherwise.
    pub fn load_default() -> Self {
        let dataset_path = env::var("PAWTRIP_CATEGORY_DATASET")
            .unwrap_or_else(|_| "data/training/categories_ko.jsonl".to_string());

        let embedder: Arc<dyn EmbeddingModel> = Arc::new(HashEmbeddingModel::new(EMBEDDING_DIMS));
        let semantic: Arc<dyn CategoryClassifier> = if Path::new(&dataset_path).exists() {
            match CentroidCategoryClassifier::from_jsonl(
                &dataset_path,
                embedder.clone(),
                "hash-centroid-category",
            ) {
                Ok(classifier) => Arc::new(classifier),
                Err(error) => {
                    warn!(path = %dataset_path, error = ?error, "category dataset unusable, using rules");
                    Arc::new(RuleCategoryClassifier)
                }
            }
        } else {
            Arc::new(RuleCategoryClassifier)
        };

        Self {
            embedder,
            classifier: Arc::new(CachedCategoryClassifier::new(semantic, CACHE_CAPACITY)),
            extractor: Arc::new(RuleFieldExtractor),
        }
    }

    /// Replaces the semantic classifier, keeping the cache in front of it.
    pub fn with_classifier(mut self, classifier: Arc<dyn CategoryClassifier>) -> Self {
        self.classifier = Arc::new(CachedCategoryClassifier::new(classifier, CACHE_CAPACITY));
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
        self.extractor = extractor;
        self
    }
}
