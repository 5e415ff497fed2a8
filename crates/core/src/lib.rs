pub mod compose;
pub mod config;
pub mod error;
pub mod intent;
pub mod lexicon;
pub mod models;
pub mod notice;
pub mod prompt;
pub mod region;
pub mod resilience;
pub mod services;

pub use config::PipelineSettings;
pub use error::ServiceError;
pub use intent::{
    classify_categories_rules, detect_pet_type, detect_small_talk, detect_transport_mode,
    extract_fields_rules, nights_to_days, normalize_text, trip_days,
};
pub use lexicon::bucket_for_title;
pub use models::*;
pub use notice::{fallback_greeting, small_talk_reply, Notice};
pub use prompt::{render_prompt, PromptKind, PromptVars};
pub use region::extract_weather_region;
pub use resilience::{call_with_retry, retry_or_degrade, Outcome, RetryPolicy};
pub use services::{
    CategoryClassifier, FieldExtractor, MapLinker, PlaceFetcher, PlaceValidator, TextGenerator,
    VectorSearch, WeatherService,
};
