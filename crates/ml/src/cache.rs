use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use pawtrip_core::{normalize_text, CategoryClassifier, CategorySet, ServiceError};

/// Memoizes successful classifications by normalized query text, so a
/// remote classifier answers identically for repeated input.
pub struct CachedCategoryClassifier {
    inner: Arc<dyn CategoryClassifier>,
    entries: RwLock<HashMap<String, CategorySet>>,
    capacity: usize,
}

impl CachedCategoryClassifier {
    pub fn new(inner: Arc<dyn CategoryClassifier>, capacity: usize) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CategoryClassifier for CachedCategoryClassifier {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn classify_semantic(&self, query: &str) -> Result<CategorySet, ServiceError> {
        let key = normalize_text(query);
        let cached = self.entries.read().get(&key).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let categories = self.inner.classify_semantic(&key).await?;

        let mut entries = self.entries.write();
        if entries.len() >= self.capacity {
            // No recency tracking; a full cache starts over.
            entries.clear();
        }
        Ok(entries.entry(key).or_insert(categories).clone())
    }
}
