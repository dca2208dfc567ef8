//! Core library of the weather agent.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap client and the response normalizer / daily aggregator
//! - The agent service object, artifact persistence and the tool-call surface
//!
//! It is used by `weather-agent-cli`, but any agent host can embed [`WeatherTools`].

pub mod artifact;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod service;
pub mod summary;
pub mod tools;

pub use artifact::{ArtifactScope, ArtifactStore, FsArtifactStore};
pub use config::AgentConfig;
pub use error::WeatherError;
pub use model::{CurrentWeatherRecord, DailyForecastRecord, ForecastDays, ForecastResult, Units};
pub use normalize::TimeBasis;
pub use provider::{WeatherProvider, openweather::OpenWeatherClient};
pub use service::WeatherAgent;
pub use tools::{ToolResponse, WeatherTools};
