//! Agent lifecycle: owns the weather provider and the request counter.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    config::AgentConfig,
    error::WeatherError,
    provider::{WeatherProvider, provider_from_config},
};

#[derive(Debug)]
pub struct WeatherAgent {
    name: String,
    provider: Arc<dyn WeatherProvider>,
    requests: AtomicU64,
    initialized_at: DateTime<Utc>,
    closed: AtomicBool,
}

impl WeatherAgent {
    /// Build the agent and its OpenWeatherMap client from config.
    pub fn initialize(name: impl Into<String>, config: &AgentConfig) -> anyhow::Result<Self> {
        let name = name.into();
        info!(agent = %name, "Starting Weather Agent initialization");

        let agent = Self::with_provider(name, provider_from_config(config)?);

        info!(agent = %agent.name, "{}", config.startup_message);
        Ok(agent)
    }

    pub fn with_provider(name: impl Into<String>, provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
            requests: AtomicU64::new(0),
            initialized_at: Utc::now(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initialized_at(&self) -> DateTime<Utc> {
        self.initialized_at
    }

    /// The provider, unless the agent has been cleaned up.
    pub fn provider(&self) -> Result<&dyn WeatherProvider, WeatherError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(WeatherError::context_unavailable("Weather service not initialized"));
        }
        Ok(self.provider.as_ref())
    }

    pub fn record_request(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the provider and log lifetime statistics. Idempotent.
    pub fn cleanup(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(agent = %self.name, "Starting Weather Agent cleanup");
        self.provider.close();
        info!(
            agent = %self.name,
            requests = self.request_count(),
            "Agent processed {} weather requests during its lifetime",
            self.request_count()
        );
    }
}
