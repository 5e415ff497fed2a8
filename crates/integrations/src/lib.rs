//! HTTP-backed collaborators: text generation, places, weather, maps.

mod analyzer;
mod config;
mod http;
mod naver;
mod openai;
mod tour;
mod weather;

pub use analyzer::LlmQueryAnalyzer;
pub use config::IntegrationConfig;
pub use naver::{NaverMapLinker, NaverPlaceValidator, PassThroughValidator};
pub use openai::OpenAiTextGenerator;
pub use tour::PetPlacesClient;
pub use weather::{
    base_date_time, kst_now, latlon_to_grid, precipitation_label, CityCatalog, CityCoordinates,
    KmaWeatherClient,
};
