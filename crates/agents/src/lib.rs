mod analyze;
mod bootstrap;
mod dispatch;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use futures::FutureExt;
use pawtrip_core::{
    is_transit_only, small_talk_reply, wants_places, CategoryClassifier, ChatInput,
    ConciergeReply, FieldExtractor, MapLinker, Notice, PipelineSettings, PlaceFetcher,
    PlaceValidator, Query, ReplyOutcome, ResultBundle, TextGenerator, VectorSearch,
    WeatherService,
};
use pawtrip_observability::AppMetrics;
use pawtrip_retrieval::RetrievalAggregator;
use tracing::{error, info, instrument};
use uuid::Uuid;

pub use analyze::{resolve_weather_region, QueryAnalysis, QueryAnalyzer};
pub use bootstrap::{build_agent_from_env, AgentBootstrap};
pub use dispatch::{plan_sections, ContentDispatcher, Dispatched, SectionOutput};

/// Every external collaborator the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn CategoryClassifier>,
    pub extractor: Arc<dyn FieldExtractor>,
    pub vector: Arc<dyn VectorSearch>,
    pub fetcher: Arc<dyn PlaceFetcher>,
    pub validator: Arc<dyn PlaceValidator>,
    pub linker: Arc<dyn MapLinker>,
    pub weather: Arc<dyn WeatherService>,
    pub generator: Arc<dyn TextGenerator>,
}

#[derive(Clone)]
pub struct PetTravelAgent {
    analyzer: QueryAnalyzer,
    aggregator: RetrievalAggregator,
    dispatcher: ContentDispatcher,
    metrics: Arc<AppMetrics>,
}

impl PetTravelAgent {
    pub fn new(
        collaborators: Collaborators,
        settings: PipelineSettings,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            analyzer: QueryAnalyzer::new(
                collaborators.classifier,
                collaborators.extractor,
                settings.clone(),
            ),
            aggregator: RetrievalAggregator::new(
                collaborators.vector,
                collaborators.fetcher,
                collaborators.validator,
                settings.clone(),
            ),
            dispatcher: ContentDispatcher::new(
                collaborators.generator,
                collaborators.weather,
                collaborators.linker,
                settings,
            ),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    pub fn aggregator(&self) -> &RetrievalAggregator {
        &self.aggregator
    }

    pub fn dispatcher(&self) -> &ContentDispatcher {
        &self.dispatcher
    }

    pub async fn analyze(&self, text: &str) -> QueryAnalysis {
        self.analyzer.analyze(Query::new(text).text()).await
    }

    /// Pipeline entry point. Any failure, panics included, becomes the fixed
    /// apology reply.
    #[instrument(skip(self, input), fields(query_id))]
    pub async fn handle_query(&self, input: ChatInput) -> ConciergeReply {
        let started = Instant::now();
        let query_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("query_id", query_id.as_str());
        self.metrics.inc_query();

        let outcome = AssertUnwindSafe(self.run_pipeline(&query_id, &input.text))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(anyhow!(
                    "pipeline panicked: {}",
                    panic_message(panic.as_ref())
                ))
            });

        let reply = match outcome {
            Ok(reply) => reply,
            Err(error) => {
                error!(query_id = %query_id, error = ?error, "query failed, returning apology");
                self.metrics.inc_apology();
                apology_reply(query_id)
            }
        };

        self.metrics.observe_latency(started.elapsed());
        reply
    }

    async fn run_pipeline(&self, query_id: &str, raw: &str) -> Result<ConciergeReply> {
        let query = Query::new(raw);
        if query.is_empty() {
            bail!("empty query");
        }

        if let Some(kind) = query.small_talk() {
            info!(query_id, kind = ?kind, "small talk reply");
            self.metrics.inc_small_talk();
            return Ok(ConciergeReply {
                query_id: query_id.to_string(),
                reply_text: small_talk_reply(kind).to_string(),
                outcome: ReplyOutcome::SmallTalk,
                categories: Vec::new(),
                parsed: None,
                sections: Vec::new(),
                degraded_sections: Vec::new(),
                retrieved_places: 0,
            });
        }

        let analysis = self.analyzer.analyze(query.text()).await;
        if analysis.categories.is_empty() {
            bail!("no categories identified for query");
        }
        info!(
            query_id,
            categories = ?analysis.categories,
            region = ?analysis.parsed.region(),
            "query classified"
        );

        let bundle = if is_transit_only(&analysis.categories) {
            self.metrics.inc_fast_path();
            ResultBundle::default()
        } else if wants_places(&analysis.categories) {
            let aggregation = self
                .aggregator
                .aggregate(query.text(), &analysis.categories, &analysis.parsed)
                .await;
            self.metrics.add_retrieval_hits(aggregation.bundle.total());
            self.metrics
                .add_validation_drops(aggregation.report.validation_drops);
            aggregation.bundle
        } else {
            ResultBundle::for_categories(&analysis.categories)
        };

        let dispatched = self
            .dispatcher
            .build_response(query.text(), &analysis.categories, &analysis.parsed, &bundle)
            .await;

        for _ in 0..dispatched.generation_calls {
            self.metrics.inc_generation_call();
        }
        let degraded_sections = dispatched.degraded();
        self.metrics.add_degraded_sections(degraded_sections.len());

        Ok(ConciergeReply {
            query_id: query_id.to_string(),
            reply_text: dispatched.text.clone(),
            outcome: if dispatched.fast_path {
                ReplyOutcome::FastPath
            } else {
                ReplyOutcome::Composed
            },
            categories: analysis.categories.iter().copied().collect(),
            parsed: Some(analysis.parsed),
            sections: dispatched.kinds(),
            degraded_sections,
            retrieved_places: bundle.total(),
        })
    }
}

fn apology_reply(query_id: String) -> ConciergeReply {
    ConciergeReply {
        query_id,
        reply_text: Notice::Apology.text().to_string(),
        outcome: ReplyOutcome::Apology,
        categories: Vec::new(),
        parsed: None,
        sections: Vec::new(),
        degraded_sections: Vec::new(),
        retrieved_places: 0,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
