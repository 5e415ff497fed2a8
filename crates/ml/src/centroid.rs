use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pawtrip_core::{Category, CategoryClassifier, CategorySet, ServiceError};
use pawtrip_retrieval::EmbeddingModel;
use serde::Deserialize;

use crate::fallback::normalize;

#[derive(Debug, Deserialize)]
struct LabeledExample {
    text: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    category: Option<String>,
}

impl LabeledExample {
    fn labels(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories
            .iter()
            .map(String::as_str)
            .chain(self.category.as_deref())
            .filter_map(Category::parse)
    }
}

/// Nearest-centroid classifier. Returns the best category plus any other
/// within `margin` of it, as long as they clear `min_score`.
#[derive(Clone)]
pub struct CentroidCategoryClassifier {
    model_name: &'static str,
    centroids: Vec<(Category, Vec<f32>)>,
    embedder: Arc<dyn EmbeddingModel>,
    min_score: f32,
    margin: f32,
}

impl CentroidCategoryClassifier {
    pub fn from_jsonl(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingModel>,
        model_name: &'static str,
    ) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "failed reading category training dataset at {}",
                path.as_ref().display()
            )
        })?;

        let mut examples = Vec::new();
        for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let example: LabeledExample =
                serde_json::from_str(line).context("invalid jsonl training line")?;
            examples.push(example);
        }

        Self::from_examples(
            examples
                .iter()
                .map(|example| (example.text.as_str(), example.labels().collect::<Vec<_>>())),
            embedder,
            model_name,
        )
    }

    pub fn from_examples<'a>(
        examples: impl IntoIterator<Item = (&'a str, Vec<Category>)>,
        embedder: Arc<dyn EmbeddingModel>,
        model_name: &'static str,
    ) -> Result<Self> {
        let mut by_category: HashMap<Category, Vec<Vec<f32>>> = HashMap::new();

        for (text, labels) in examples {
            let vector = embedder.embed(text);
            for label in labels {
                by_category.entry(label).or_default().push(vector.clone());
            }
        }

        let mut centroids = by_category
            .into_iter()
            .filter(|(_, vectors)| !vectors.is_empty())
            .map(|(category, vectors)| (category, centroid(&vectors)))
            .collect::<Vec<_>>();
        centroids.sort_by_key(|(category, _)| *category);

        if centroids.is_empty() {
            anyhow::bail!("training dataset produced zero category centroids");
        }

        Ok(Self {
            model_name,
            centroids,
            embedder,
            min_score: 0.15,
            margin: 0.08,
        })
    }

    pub fn with_thresholds(mut self, min_score: f32, margin: f32) -> Self {
        self.min_score = min_score;
        self.margin = margin;
        self
    }

    pub fn predict(&self, text: &str) -> CategorySet {
        let query = self.embedder.embed(text);
        let scored = self
            .centroids
            .iter()
            .map(|(category, center)| (*category, cosine_similarity(&query, center)))
            .collect::<Vec<_>>();

        let best = scored
            .iter()
            .map(|(_, score)| *score)
            .fold(f32::MIN, f32::max);

        if best < self.min_score {
            return CategorySet::new();
        }

        scored
            .into_iter()
            .filter(|(_, score)| *score >= self.min_score && best - *score <= self.margin)
            .map(|(category, _)| category)
            .collect()
    }
}

#[async_trait]
impl CategoryClassifier for CentroidCategoryClassifier {
    fn name(&self) -> &'static str {
        self.model_name
    }

    async fn classify_semantic(&self, query: &str) -> Result<CategorySet, ServiceError> {
        Ok(self.predict(query))
    }
}

fn centroid(vectors: &[Vec<f32>]) -> Vec<f32> {
    let dims = vectors.first().map(Vec::len).unwrap_or(0);
    let mut acc = vec![0.0_f32; dims];

    for vector in vectors {
        for (idx, value) in vector.iter().enumerate() {
            acc[idx] += value;
        }
    }

    for value in &mut acc {
        *value /= vectors.len() as f32;
    }
    normalize(&mut acc);
    acc
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut a_norm = 0.0;
    let mut b_norm = 0.0;
    for (lhs, rhs) in a.iter().zip(b.iter()) {
        dot += lhs * rhs;
        a_norm += lhs * lhs;
        b_norm += rhs * rhs;
    }

    if a_norm == 0.0 || b_norm == 0.0 {
        0.0
    } else {
        dot / (a_norm.sqrt() * b_norm.sqrt())
    }
}
