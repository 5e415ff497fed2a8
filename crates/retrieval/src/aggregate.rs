//! Merges vector-search hits and live API places into one validated,
//! deduplicated, bucketed result set.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use pawtrip_core::{
    bucket_for_title, call_with_retry, retry_or_degrade, wants_places, BucketInsert, Category,
    CategorySet, Notice, ParsedQuery, PipelineSettings, PlaceFetcher, PlaceRecord, PlaceValidator,
    RawPlace, ResultBundle, SourceRank, VectorSearch,
};
use tracing::{debug, info, instrument, warn};

/// What the guarded places fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacesFetch {
    Places(Vec<RawPlace>),
    /// Rejected before dispatch; nothing was sent.
    Rejected(Notice),
    /// Retries exhausted or nothing found.
    NoValidPlaces,
}

impl PlacesFetch {
    pub fn places(&self) -> &[RawPlace] {
        match self {
            Self::Places(places) => places,
            Self::Rejected(_) | Self::NoValidPlaces => &[],
        }
    }

    /// User-facing text for the non-place outcomes.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::Places(_) => None,
            Self::Rejected(notice) => Some(*notice),
            Self::NoValidPlaces => Some(Notice::NoValidPlaces),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationReport {
    pub vector_candidates: usize,
    pub api_candidates: usize,
    pub validation_drops: usize,
    pub duplicates: usize,
    pub unrequested: usize,
    pub vector_degraded: bool,
    pub api_notice: Option<Notice>,
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub bundle: ResultBundle,
    pub report: AggregationReport,
}

#[derive(Clone)]
pub struct RetrievalAggregator {
    vector: Arc<dyn VectorSearch>,
    fetcher: Arc<dyn PlaceFetcher>,
    validator: Arc<dyn PlaceValidator>,
    settings: PipelineSettings,
}

impl RetrievalAggregator {
    pub fn new(
        vector: Arc<dyn VectorSearch>,
        fetcher: Arc<dyn PlaceFetcher>,
        validator: Arc<dyn PlaceValidator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            vector,
            fetcher,
            validator,
            settings,
        }
    }

    /// Places API call behind its preconditions and retry cap. Never fails.
    pub async fn fetch_places_guarded(&self, parsed: Option<&ParsedQuery>, n: i64) -> PlacesFetch {
        if n <= 0 {
            warn!(n, "rejecting places fetch with non-positive candidate count");
            return PlacesFetch::Rejected(Notice::InvalidCandidateCount);
        }

        let Some(parsed) = parsed.filter(|parsed| parsed.is_well_formed()) else {
            warn!("rejecting places fetch with missing or malformed parsed query");
            return PlacesFetch::Rejected(Notice::InvalidParsedQuery);
        };

        let count = usize::try_from(n).unwrap_or(usize::MAX);
        let policy = self.settings.places_policy();
        match call_with_retry("fetch_places", &policy, || {
            self.fetcher.fetch_places(parsed, count)
        })
        .await
        {
            Ok(places) if places.is_empty() => PlacesFetch::NoValidPlaces,
            Ok(places) => PlacesFetch::Places(places),
            Err(error) => {
                warn!(error = %error, attempts = policy.max_attempts, "places fetch exhausted");
                PlacesFetch::NoValidPlaces
            }
        }
    }

    #[instrument(skip(self, categories, parsed), fields(categories = ?categories))]
    pub async fn aggregate(
        &self,
        query: &str,
        categories: &CategorySet,
        parsed: &ParsedQuery,
    ) -> Aggregation {
        let mut bundle = ResultBundle::for_categories(categories);
        let mut report = AggregationReport::default();

        if !wants_places(categories) {
            return Aggregation { bundle, report };
        }

        let vector_policy = self.settings.vector_policy();
        let (vector_outcome, fetched) = tokio::join!(
            retry_or_degrade(
                "vector_search",
                &vector_policy,
                || {
                    self.vector.vector_search(
                        query,
                        categories,
                        self.settings.vector_k_each,
                        self.settings.vector_top_k,
                    )
                },
                |_| BTreeMap::new(),
            ),
            self.fetch_places_guarded(Some(parsed), self.settings.candidate_count),
        );

        report.vector_degraded = vector_outcome.is_degraded();
        report.api_notice = fetched.notice();

        let vector_candidates = relabel_vector_hits(vector_outcome.into_inner(), categories);
        report.vector_candidates = vector_candidates.len();

        let mut api_candidates = Vec::new();
        for raw in fetched.places().iter().cloned() {
            let bucket = bucket_for_title(&raw.title);
            let Some(record) = PlaceRecord::from_raw(raw, bucket) else {
                continue;
            };
            if !bundle.contains(bucket) {
                debug!(title = %record.title, bucket = ?bucket, "api place filed under an unrequested bucket");
                report.unrequested += 1;
                continue;
            }
            api_candidates.push(record);
        }
        report.api_candidates = api_candidates.len();

        // Vector hits first so they win title collisions.
        let candidates = vector_candidates
            .into_iter()
            .chain(api_candidates)
            .collect::<Vec<_>>();
        let verdicts = join_all(candidates.iter().map(|candidate| self.validate(candidate))).await;

        for (candidate, valid) in candidates.into_iter().zip(verdicts) {
            if !valid {
                report.validation_drops += 1;
                continue;
            }
            match bundle.insert(candidate) {
                BucketInsert::Inserted => {}
                BucketInsert::Duplicate => report.duplicates += 1,
                BucketInsert::NotRequested => report.unrequested += 1,
            }
        }

        info!(
            total = bundle.total(),
            vector = report.vector_candidates,
            api = report.api_candidates,
            dropped = report.validation_drops,
            duplicates = report.duplicates,
            "aggregation complete"
        );

        Aggregation { bundle, report }
    }

    async fn validate(&self, candidate: &PlaceRecord) -> bool {
        let policy = self.settings.validator_policy();
        match call_with_retry("validate_place", &policy, || {
            self.validator.validate_place_exists(&candidate.title)
        })
        .await
        {
            Ok(true) => true,
            Ok(false) => {
                warn!(title = %candidate.title, source = ?candidate.source, "place failed validation");
                false
            }
            Err(error) => {
                warn!(title = %candidate.title, error = %error, "place validation unavailable, dropping");
                false
            }
        }
    }
}

/// Vector hits for requested place buckets, relabelled with the bucket they
/// were returned under.
fn relabel_vector_hits(
    hits: BTreeMap<Category, Vec<PlaceRecord>>,
    categories: &CategorySet,
) -> Vec<PlaceRecord> {
    hits.into_iter()
        .filter(|(category, _)| category.is_place_bucket() && categories.contains(category))
        .flat_map(|(category, records)| {
            records.into_iter().map(move |mut record| {
                record.bucket = category;
                record.source = SourceRank::Vector;
                record
            })
        })
        .filter(|record| !record.title.trim().is_empty())
        .collect()
}
