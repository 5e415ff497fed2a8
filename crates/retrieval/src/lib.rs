mod aggregate;
mod tokenize;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pawtrip_core::{Category, CategorySet, PlaceRecord, ServiceError, SourceRank, VectorSearch};
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

pub use aggregate::{Aggregation, AggregationReport, PlacesFetch, RetrievalAggregator};
pub use tokenize::{keyword_set, tokenize};

pub trait EmbeddingModel: Send + Sync {
    fn model_name(&self) -> &'static str;
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// One entry of the place catalog as stored on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPlace {
    pub title: String,
    #[serde(default, alias = "addr1")]
    pub address: Option<String>,
    #[serde(default)]
    pub pet_info: Option<String>,
    pub category: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl CatalogPlace {
    fn search_text(&self) -> String {
        [
            self.title.as_str(),
            self.region.as_deref().unwrap_or_default(),
            self.address.as_deref().unwrap_or_default(),
            self.description.as_str(),
        ]
        .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct IndexedPlace {
    pub record: PlaceRecord,
    pub keywords: HashSet<String>,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct IndexStats {
    pub places_loaded: usize,
    pub lodging: usize,
    pub attraction: usize,
    pub vector_enabled: bool,
}

/// In-memory place index scored by keyword overlap blended with embedding
/// similarity.
#[derive(Clone)]
pub struct PlaceIndex {
    places: Vec<IndexedPlace>,
    embedder: Option<Arc<dyn EmbeddingModel>>,
}

impl PlaceIndex {
    pub fn from_catalog_dir(
        path: impl AsRef<Path>,
        embedder: Option<Arc<dyn EmbeddingModel>>,
    ) -> Result<Self> {
        let places = load_catalog(path.as_ref())?;
        Ok(Self::from_places(places, embedder))
    }

    /// Entries without a title or with a non-place category are skipped.
    pub fn from_places(
        places: Vec<CatalogPlace>,
        embedder: Option<Arc<dyn EmbeddingModel>>,
    ) -> Self {
        let places = places
            .into_iter()
            .filter_map(|place| {
                let bucket = Category::parse(&place.category).filter(|c| c.is_place_bucket());
                let Some(bucket) = bucket else {
                    debug!(title = %place.title, category = %place.category, "skipping non-place catalog entry");
                    return None;
                };

                let title = place.title.trim().to_string();
                if title.is_empty() {
                    return None;
                }

                let text = place.search_text();
                Some(IndexedPlace {
                    keywords: keyword_set(&text),
                    embedding: embedder.as_ref().map(|model| model.embed(&text)),
                    record: PlaceRecord {
                        title,
                        address: place.address.filter(|v| !v.trim().is_empty()),
                        pet_info: place.pet_info.filter(|v| !v.trim().is_empty()),
                        bucket,
                        source: SourceRank::Vector,
                    },
                })
            })
            .collect();

        Self { places, embedder }
    }

    pub fn stats(&self) -> IndexStats {
        let count = |bucket| {
            self.places
                .iter()
                .filter(|place| place.record.bucket == bucket)
                .count()
        };

        IndexStats {
            places_loaded: self.places.len(),
            lodging: count(Category::Lodging),
            attraction: count(Category::Attraction),
            vector_enabled: self.embedder.is_some(),
        }
    }

    /// Best `k` places of one bucket, highest score first.
    pub fn search(&self, query: &str, bucket: Category, k: usize) -> Vec<(f32, PlaceRecord)> {
        let query_tokens = keyword_set(query);
        let query_embedding = self.embedder.as_ref().map(|model| model.embed(query));

        let mut scored = self
            .places
            .iter()
            .filter(|place| place.record.bucket == bucket)
            .map(|place| {
                let keyword_score = keyword_score(&query_tokens, &place.keywords);
                let vector_score = match (&query_embedding, &place.embedding) {
                    (Some(q), Some(p)) => cosine_similarity(q, p).max(0.0),
                    _ => 0.0,
                };

                let score = if query_embedding.is_some() {
                    (0.65 * keyword_score) + (0.35 * vector_score)
                } else {
                    keyword_score
                };

                (score, place)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect::<Vec<_>>();

        scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(score, place)| (score, place.record.clone()))
            .collect()
    }

    /// Up to `k_each` hits per requested place bucket, then the best `top_k`
    /// overall. Each bucket keeps its rank order.
    pub fn search_by_category(
        &self,
        query: &str,
        categories: &CategorySet,
        k_each: usize,
        top_k: usize,
    ) -> BTreeMap<Category, Vec<PlaceRecord>> {
        let mut hits = categories
            .iter()
            .filter(|category| category.is_place_bucket())
            .flat_map(|category| self.search(query, *category, k_each))
            .collect::<Vec<_>>();

        hits.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);

        let mut grouped: BTreeMap<Category, Vec<PlaceRecord>> = BTreeMap::new();
        for (_, record) in hits {
            grouped.entry(record.bucket).or_default().push(record);
        }
        grouped
    }

    pub fn places(&self) -> impl Iterator<Item = &PlaceRecord> {
        self.places.iter().map(|place| &place.record)
    }
}

#[async_trait]
impl VectorSearch for PlaceIndex {
    async fn vector_search(
        &self,
        query: &str,
        categories: &CategorySet,
        k_each: usize,
        top_k: usize,
    ) -> Result<BTreeMap<Category, Vec<PlaceRecord>>, ServiceError> {
        Ok(self.search_by_category(query, categories, k_each, top_k))
    }
}

/// Reads every `.json` (single object or array) and `.jsonl` file under `root`.
fn load_catalog(root: &Path) -> Result<Vec<CatalogPlace>> {
    let mut places = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        let path = entry.path();
        let extension = path.extension().and_then(|ext| ext.to_str());
        if !matches!(extension, Some("json") | Some("jsonl")) {
            continue;
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading place catalog: {}", path.display()))?;

        if extension == Some("jsonl") {
            for (line_no, line) in raw.lines().map(str::trim).enumerate() {
                if line.is_empty() {
                    continue;
                }
                let place = serde_json::from_str::<CatalogPlace>(line).with_context(|| {
                    format!("invalid catalog line {} in {}", line_no + 1, path.display())
                })?;
                places.push(place);
            }
            continue;
        }

        let value = serde_json::from_str::<serde_json::Value>(&raw)
            .with_context(|| format!("invalid catalog json: {}", path.display()))?;
        match value {
            serde_json::Value::Array(items) => {
                for item in items {
                    places.push(
                        serde_json::from_value(item)
                            .with_context(|| format!("invalid catalog entry in {}", path.display()))?,
                    );
                }
            }
            other => places.push(
                serde_json::from_value(other)
                    .with_context(|| format!("invalid catalog entry in {}", path.display()))?,
            ),
        }
    }

    Ok(places)
}

fn keyword_score(query_tokens: &HashSet<String>, doc_tokens: &HashSet<String>) -> f32 {
    if query_tokens.is_empty() || doc_tokens.is_empty() {
        return 0.0;
    }

    let overlap = query_tokens
        .iter()
        .filter(|token| doc_tokens.contains(*token))
        .count() as f32;

    overlap / query_tokens.len() as f32
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
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
