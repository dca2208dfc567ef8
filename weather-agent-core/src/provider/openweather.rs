use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, error, info, instrument};

use crate::{
    config::{AgentConfig, DEFAULT_BASE_URL},
    error::WeatherError,
    model::{CurrentWeatherRecord, ForecastDays, ForecastResult, Units},
    normalize::{self, RawCurrent, RawForecast, TimeBasis},
};

use super::WeatherProvider;

/// OpenWeatherMap client with one lazily opened, reusable HTTP session.
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
    time_basis: TimeBasis,
    session: Mutex<Option<Client>>,
    sessions_opened: AtomicUsize,
}

impl fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("time_basis", &self.time_basis)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            time_basis: TimeBasis::default(),
            session: Mutex::new(None),
            sessions_opened: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &AgentConfig) -> anyhow::Result<Self> {
        let mut client = Self::new(config.require_api_key()?.to_owned())
            .with_base_url(&config.base_url)
            .with_time_basis(config.time_basis);
        if let Some(secs) = config.timeout_secs {
            client = client.with_timeout(Duration::from_secs(secs));
        }
        Ok(client)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_time_basis(mut self, time_basis: TimeBasis) -> Self {
        self.time_basis = time_basis;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    /// How many HTTP sessions this client has created over its lifetime.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::Relaxed)
    }

    /// Current session, creating it on first use. Creation happens under the lock,
    /// so racing callers share a single session.
    fn session(&self) -> Result<Client, WeatherError> {
        let mut guard = self.session.lock();
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(WeatherError::Network)?;

        let opened = self.sessions_opened.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(opened, "HTTP session opened");

        *guard = Some(client.clone());
        Ok(client)
    }

    /// Release the HTTP session. Safe to call repeatedly or before any request.
    pub fn close(&self) {
        if self.session.lock().take().is_some() {
            info!("HTTP session closed");
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        location: &str,
        units: Units,
        extra: &[(&str, &str)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(url = %url, "Sending request to OpenWeatherMap");

        let res = self
            .session()?
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", units.api_value()),
            ])
            .query(extra)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Network error talking to OpenWeatherMap");
                WeatherError::Network(e)
            })?;

        let status = res.status();
        let body = res.text().await.map_err(WeatherError::Network)?;

        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::LocationNotFound(location.to_string()));
        }

        if !status.is_success() {
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            debug!(body = %truncate_body(&body), "Unexpected OpenWeatherMap body");
            WeatherError::Decode(e.to_string())
        })
    }

    #[instrument(skip(self))]
    pub async fn current(
        &self,
        location: &str,
        units: Units,
    ) -> Result<CurrentWeatherRecord, WeatherError> {
        info!("Fetching current weather");

        let raw: RawCurrent = self.get_json("weather", location, units, &[]).await?;
        let record = normalize::normalize_current(&raw, units, self.time_basis)?;

        info!(resolved = %record.location, "Fetched current weather");
        Ok(record)
    }

    #[instrument(skip(self), fields(days = days.get()))]
    pub async fn forecast(
        &self,
        location: &str,
        days: ForecastDays,
        units: Units,
    ) -> Result<ForecastResult, WeatherError> {
        info!("Fetching forecast");

        let cnt = days.raw_sample_count().to_string();
        let raw: RawForecast =
            self.get_json("forecast", location, units, &[("cnt", cnt.as_str())]).await?;
        let result = normalize::normalize_forecast(&raw, days, units, self.time_basis)?;

        info!(resolved = %result.location, days = result.forecasts.len(), "Fetched forecast");
        Ok(result)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(
        &self,
        location: &str,
        units: Units,
    ) -> Result<CurrentWeatherRecord, WeatherError> {
        OpenWeatherClient::current(self, location, units).await
    }

    async fn forecast(
        &self,
        location: &str,
        days: ForecastDays,
        units: Units,
    ) -> Result<ForecastResult, WeatherError> {
        OpenWeatherClient::forecast(self, location, days, units).await
    }

    fn close(&self) {
        OpenWeatherClient::close(self);
    }
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: Option<String>,
}

/// Provider-reported message, falling back to the raw body.
fn upstream_message(body: &str) -> String {
    let parsed = serde_json::from_str::<OwErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty());

    match parsed {
        Some(message) => message,
        None if !body.trim().is_empty() => truncate_body(body),
        None => "Unknown error".to_string(),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
