use crate::{
    AgentConfig,
    error::WeatherError,
    model::{CurrentWeatherRecord, ForecastDays, ForecastResult, Units},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Source of normalized weather data. Implemented by [`OpenWeatherClient`];
/// hosts and tests may inject their own.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(
        &self,
        location: &str,
        units: Units,
    ) -> Result<CurrentWeatherRecord, WeatherError>;

    /// `days` is already validated; the provider never sees an out-of-range value.
    async fn forecast(
        &self,
        location: &str,
        days: ForecastDays,
        units: Units,
    ) -> Result<ForecastResult, WeatherError>;

    /// Release network resources. Must be idempotent.
    fn close(&self) {}
}

/// Construct the OpenWeatherMap provider from config.
pub fn provider_from_config(config: &AgentConfig) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    Ok(Arc::new(OpenWeatherClient::from_config(config)?))
}
