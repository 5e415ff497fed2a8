use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Pipeline counters. Each increment is also forwarded to the `metrics`
/// facade so an installed recorder sees the same numbers.
#[derive(Debug, Default)]
pub struct AppMetrics {
    queries_total: AtomicU64,
    small_talk_total: AtomicU64,
    fast_path_total: AtomicU64,
    retrieval_hits_total: AtomicU64,
    validation_drops_total: AtomicU64,
    degraded_sections_total: AtomicU64,
    generation_calls_total: AtomicU64,
    apologies_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub small_talk_total: u64,
    pub fast_path_total: u64,
    pub retrieval_hits_total: u64,
    pub validation_drops_total: u64,
    pub degraded_sections_total: u64,
    pub generation_calls_total: u64,
    pub apologies_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_query(&self) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("pawtrip_queries_total").increment(1);
    }

    pub fn inc_small_talk(&self) {
        self.small_talk_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("pawtrip_small_talk_total").increment(1);
    }

    pub fn inc_fast_path(&self) {
        self.fast_path_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("pawtrip_fast_path_total").increment(1);
    }

    pub fn add_retrieval_hits(&self, hits: usize) {
        self.retrieval_hits_total
            .fetch_add(hits as u64, Ordering::Relaxed);
        metrics::counter!("pawtrip_retrieval_hits_total").increment(hits as u64);
    }

    pub fn add_validation_drops(&self, drops: usize) {
        self.validation_drops_total
            .fetch_add(drops as u64, Ordering::Relaxed);
        metrics::counter!("pawtrip_validation_drops_total").increment(drops as u64);
    }

    pub fn add_degraded_sections(&self, sections: usize) {
        self.degraded_sections_total
            .fetch_add(sections as u64, Ordering::Relaxed);
        metrics::counter!("pawtrip_degraded_sections_total").increment(sections as u64);
    }

    pub fn inc_generation_call(&self) {
        self.generation_calls_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("pawtrip_generation_calls_total").increment(1);
    }

    pub fn inc_apology(&self) {
        self.apologies_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("pawtrip_apologies_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        metrics::histogram!("pawtrip_query_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let queries = self.queries_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            queries_total: queries,
            small_talk_total: self.small_talk_total.load(Ordering::Relaxed),
            fast_path_total: self.fast_path_total.load(Ordering::Relaxed),
            retrieval_hits_total: self.retrieval_hits_total.load(Ordering::Relaxed),
            validation_drops_total: self.validation_drops_total.load(Ordering::Relaxed),
            degraded_sections_total: self.degraded_sections_total.load(Ordering::Relaxed),
            generation_calls_total: self.generation_calls_total.load(Ordering::Relaxed),
            apologies_total: self.apologies_total.load(Ordering::Relaxed),
            avg_latency_millis: if queries == 0 {
                0.0
            } else {
                latency as f64 / queries as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,pawtrip_api=info,pawtrip_agents=info,pawtrip_retrieval=info,pawtrip_integrations=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
