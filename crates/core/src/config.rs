use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::resilience::RetryPolicy;

/// Knobs for one pipeline run. Every external call site derives its
/// `RetryPolicy` from here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub candidate_count: i64,
    pub vector_k_each: usize,
    pub vector_top_k: usize,
    pub max_attempts: u32,
    pub places_timeout: Duration,
    pub weather_timeout: Duration,
    pub generation_timeout: Duration,
    pub validator_timeout: Duration,
    pub retry_backoff: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            candidate_count: 5,
            vector_k_each: 10,
            vector_top_k: 10,
            max_attempts: 3,
            places_timeout: Duration::from_secs(10),
            weather_timeout: Duration::from_secs(10),
            generation_timeout: Duration::from_secs(30),
            validator_timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl PipelineSettings {
    /// Reads `PAWTRIP_*` overrides; unset or unparsable values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            candidate_count: env_or("PAWTRIP_CANDIDATE_COUNT", defaults.candidate_count),
            vector_k_each: env_or("PAWTRIP_VECTOR_K_EACH", defaults.vector_k_each),
            vector_top_k: env_or("PAWTRIP_VECTOR_TOP_K", defaults.vector_top_k),
            max_attempts: env_or("PAWTRIP_MAX_ATTEMPTS", defaults.max_attempts).max(1),
            places_timeout: env_secs("PAWTRIP_PLACES_TIMEOUT_SECONDS", defaults.places_timeout),
            weather_timeout: env_secs("PAWTRIP_WEATHER_TIMEOUT_SECONDS", defaults.weather_timeout),
            generation_timeout: env_secs(
                "PAWTRIP_GENERATION_TIMEOUT_SECONDS",
                defaults.generation_timeout,
            ),
            validator_timeout: env_secs(
                "PAWTRIP_VALIDATOR_TIMEOUT_SECONDS",
                defaults.validator_timeout,
            ),
            retry_backoff: Duration::from_millis(env_or(
                "PAWTRIP_RETRY_BACKOFF_MILLIS",
                defaults.retry_backoff.as_millis() as u64,
            )),
        }
    }

    pub fn places_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.places_timeout, self.retry_backoff)
    }

    pub fn weather_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.weather_timeout, self.retry_backoff)
    }

    pub fn generation_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.generation_timeout, self.retry_backoff)
    }

    pub fn validator_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.validator_timeout, self.retry_backoff)
    }

    /// Vector search runs against a local or remote index with no own timeout.
    pub fn vector_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.places_timeout, self.retry_backoff)
    }

    /// Classification and extraction get one shot; rules cover the failure.
    pub fn analysis_policy(&self) -> RetryPolicy {
        RetryPolicy::once(self.generation_timeout)
    }

    /// Variant used by tests and the CLI: no waiting between attempts.
    pub fn without_backoff(mut self) -> Self {
        self.retry_backoff = Duration::ZERO;
        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
