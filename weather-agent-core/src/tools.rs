//! Tool-call surface exposed to the host agent runtime.
//!
//! Every entry point returns a [`ToolResponse`]; failures never escape as `Err`.
//! Collaborators (the agent and the artifact store) are injected into
//! [`WeatherTools`] rather than looked up from an untyped host context.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use crate::{
    artifact::{ArtifactRequest, ArtifactScope, ArtifactStore},
    error::WeatherError,
    model::{CurrentWeatherRecord, ForecastDays, ForecastResult, Units},
    service::WeatherAgent,
    summary,
};

pub const CURRENT_WEATHER_TOOL: &str = "get_current_weather";
pub const WEATHER_FORECAST_TOOL: &str = "get_weather_forecast";

const ARTIFACT_DESCRIPTION: &str = "Weather data report";
const ARTIFACT_SOURCE: &str = "Weather Agent";

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeatherArgs {
    pub location: String,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub save_to_file: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastArgs {
    pub location: String,
    /// Validated against `1..=5` before any request is made.
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub save_to_file: bool,
}

fn default_days() -> i64 {
    i64::from(ForecastDays::MAX)
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WeatherData {
    Current(CurrentWeatherRecord),
    Forecast(ForecastResult),
}

/// Result of the optional persist step, nested in a successful response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ArtifactOutcome {
    Success {
        filename: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResponse {
    Success {
        location: String,
        summary: String,
        data: WeatherData,
        #[serde(skip_serializing_if = "Option::is_none")]
        artifact: Option<ArtifactOutcome>,
    },
    Error {
        message: String,
    },
}

impl ToolResponse {
    pub fn from_error(err: &WeatherError) -> Self {
        Self::Error { message: err.tool_message() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self)
            .unwrap_or_else(|e| json!({ "status": "error", "message": e.to_string() }))
    }
}

/// Descriptor a host hands to its model so it can call the tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct WeatherTools {
    agent: Arc<WeatherAgent>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
    scope: ArtifactScope,
}

impl WeatherTools {
    pub fn new(agent: Arc<WeatherAgent>) -> Self {
        Self { agent, artifacts: None, scope: ArtifactScope::default() }
    }

    pub fn with_artifact_store(mut self, store: Arc<dyn ArtifactStore>, scope: ArtifactScope) -> Self {
        self.artifacts = Some(store);
        self.scope = scope;
        self
    }

    pub fn agent(&self) -> &WeatherAgent {
        &self.agent
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        let units = json!({
            "type": "string",
            "enum": ["metric", "imperial", "kelvin"],
            "default": "metric",
            "description": "Temperature units: metric (Celsius), imperial (Fahrenheit) or kelvin"
        });
        let save = json!({
            "type": "boolean",
            "default": false,
            "description": "Whether to save the weather report as an artifact"
        });

        vec![
            ToolDefinition {
                name: CURRENT_WEATHER_TOOL,
                description: "Get current weather conditions for a specified location.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "location": {
                            "type": "string",
                            "description": "City name, state and country, for example \"London,UK\""
                        },
                        "units": units,
                        "save_to_file": save,
                    },
                    "required": ["location"]
                }),
            },
            ToolDefinition {
                name: WEATHER_FORECAST_TOOL,
                description: "Get a daily weather forecast (1-5 days) for a specified location.",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "location": {
                            "type": "string",
                            "description": "City name, state and country"
                        },
                        "days": {
                            "type": "integer",
                            "minimum": ForecastDays::MIN,
                            "maximum": ForecastDays::MAX,
                            "default": ForecastDays::MAX,
                            "description": "Number of days for the forecast"
                        },
                        "units": units,
                        "save_to_file": save,
                    },
                    "required": ["location"]
                }),
            },
        ]
    }

    /// Dispatch a tool call by name with raw JSON arguments.
    pub async fn call(&self, name: &str, args: Value) -> ToolResponse {
        match name {
            CURRENT_WEATHER_TOOL => match parse_args(name, args) {
                Ok(args) => self.get_current_weather(args).await,
                Err(e) => self.fail(e),
            },
            WEATHER_FORECAST_TOOL => match parse_args(name, args) {
                Ok(args) => self.get_weather_forecast(args).await,
                Err(e) => self.fail(e),
            },
            other => self.fail(WeatherError::validation(format!("Unknown tool '{other}'"))),
        }
    }

    #[instrument(skip(self), fields(location = %args.location))]
    pub async fn get_current_weather(&self, args: CurrentWeatherArgs) -> ToolResponse {
        info!("Getting current weather");
        match self.current(&args).await {
            Ok(response) => response,
            Err(e) => self.fail(e),
        }
    }

    #[instrument(skip(self), fields(location = %args.location, days = args.days))]
    pub async fn get_weather_forecast(&self, args: ForecastArgs) -> ToolResponse {
        info!("Getting weather forecast");
        match self.forecast(&args).await {
            Ok(response) => response,
            Err(e) => self.fail(e),
        }
    }

    async fn current(&self, args: &CurrentWeatherArgs) -> Result<ToolResponse, WeatherError> {
        let location = validate_location(&args.location)?;
        let provider = self.agent.provider()?;

        self.agent.record_request();
        let record = provider.current(location, args.units).await?;
        let summary = summary::current_summary(&record);

        let artifact = if args.save_to_file {
            Some(self.save_artifact(&format!("current_weather_{location}"), &record).await)
        } else {
            None
        };

        info!("Successfully retrieved current weather");
        Ok(ToolResponse::Success {
            location: record.location.clone(),
            summary,
            data: WeatherData::Current(record),
            artifact,
        })
    }

    async fn forecast(&self, args: &ForecastArgs) -> Result<ToolResponse, WeatherError> {
        let days = ForecastDays::new(args.days)?;
        let location = validate_location(&args.location)?;
        let provider = self.agent.provider()?;

        self.agent.record_request();
        let result = provider.forecast(location, days, args.units).await?;
        let summary = summary::forecast_summary(&result);

        let artifact = if args.save_to_file {
            Some(self.save_artifact(&format!("forecast_{location}_{days}day"), &result).await)
        } else {
            None
        };

        info!("Successfully retrieved forecast");
        Ok(ToolResponse::Success {
            location: result.location.clone(),
            summary,
            data: WeatherData::Forecast(result),
            artifact,
        })
    }

    /// Persist `value` as JSON. A failure here never fails the surrounding call.
    async fn save_artifact<T: Serialize>(&self, base: &str, value: &T) -> ArtifactOutcome {
        let Some(store) = &self.artifacts else {
            let err = WeatherError::context_unavailable("Artifact service not available");
            warn!(error = %err, "Cannot save artifact");
            return ArtifactOutcome::Error { message: format!("Failed to save artifact: {err}") };
        };

        let request = match ArtifactRequest::json(self.scope.clone(), base, value, Utc::now()) {
            Ok(req) => req
                .with_metadata("description", ARTIFACT_DESCRIPTION)
                .with_metadata("source", ARTIFACT_SOURCE),
            Err(e) => {
                error!(error = %e, "Error preparing artifact");
                return ArtifactOutcome::Error { message: format!("Failed to save artifact: {e}") };
            }
        };
        let filename = request.filename.clone();

        match store.save(request).await {
            Ok(receipt) if receipt.status == "success" => {
                ArtifactOutcome::Success { filename, uri: receipt.uri }
            }
            Ok(receipt) => ArtifactOutcome::Error {
                message: format!("Artifact service reported status '{}'", receipt.status),
            },
            Err(e) => {
                error!(error = %e, "Error saving artifact");
                ArtifactOutcome::Error { message: format!("Failed to save artifact: {e}") }
            }
        }
    }

    fn fail(&self, err: WeatherError) -> ToolResponse {
        match &err {
            WeatherError::LocationNotFound(_) => warn!(error = %err, "Invalid location"),
            WeatherError::Validation(_) => warn!(error = %err, "Rejected tool arguments"),
            _ => error!(error = %err, "Weather tool failed"),
        }
        ToolResponse::from_error(&err)
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, args: Value) -> Result<T, WeatherError> {
    serde_json::from_value(args)
        .map_err(|e| WeatherError::validation(format!("Invalid arguments for {tool}: {e}")))
}

fn validate_location(location: &str) -> Result<&str, WeatherError> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(WeatherError::validation("Location must not be empty"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifact::{ArtifactError, ArtifactReceipt},
        model::DailyForecastRecord,
        provider::WeatherProvider,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct StubProvider {
        calls: AtomicUsize,
    }

    fn current_record(location: &str, units: Units) -> CurrentWeatherRecord {
        let at = DateTime::parse_from_rfc3339("2024-01-15T12:00:00+00:00").unwrap();
        CurrentWeatherRecord {
            location: format!("{location}, GB"),
            units,
            temperature: 5.5,
            feels_like: 2.0,
            humidity: 81,
            pressure: 1012.0,
            description: "Light Rain".into(),
            wind_speed: 4.1,
            wind_direction: 250.0,
            visibility: 10.0,
            timestamp: at,
            sunrise: at,
            sunset: at,
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn current(&self, location: &str, units: Units) -> Result<CurrentWeatherRecord, WeatherError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if location == "Nowhereville" {
                return Err(WeatherError::LocationNotFound(location.to_string()));
            }
            Ok(current_record(location, units))
        }

        async fn forecast(
            &self,
            location: &str,
            days: ForecastDays,
            units: Units,
        ) -> Result<ForecastResult, WeatherError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if location == "Nowhereville" {
                return Err(WeatherError::LocationNotFound(location.to_string()));
            }
            let forecasts = (0..days.get())
                .map(|i| DailyForecastRecord {
                    date: NaiveDate::from_ymd_opt(2024, 1, 15 + u32::from(i)).unwrap(),
                    temperature_min: 1.0,
                    temperature_max: 8.0,
                    description: "Clear Sky".into(),
                    humidity: 60,
                    wind_speed: 2.0,
                    wind_direction: 90.0,
                    precipitation_probability: 20.0,
                })
                .collect();
            Ok(ForecastResult { location: format!("{location}, NO"), units, forecasts })
        }
    }

    #[derive(Debug, Default)]
    struct MemoryStore {
        saved: Mutex<Vec<ArtifactRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl ArtifactStore for MemoryStore {
        async fn save(&self, request: ArtifactRequest) -> Result<ArtifactReceipt, ArtifactError> {
            if self.fail {
                return Err(ArtifactError::Rejected("quota exceeded".into()));
            }
            self.saved.lock().push(request);
            Ok(ArtifactReceipt { status: "success".into(), uri: None })
        }
    }

    fn tools() -> (WeatherTools, Arc<StubProvider>) {
        let provider = Arc::new(StubProvider::default());
        let agent = Arc::new(WeatherAgent::with_provider("weather", provider.clone()));
        (WeatherTools::new(agent), provider)
    }

    fn scope() -> ArtifactScope {
        ArtifactScope { app_name: "app".into(), user_id: "user".into(), session_id: "sess".into() }
    }

    fn forecast_args(location: &str, days: i64) -> ForecastArgs {
        ForecastArgs { location: location.into(), days, units: Units::Metric, save_to_file: false }
    }

    #[tokio::test]
    async fn current_weather_success_shape() {
        let (tools, _) = tools();
        let response = tools
            .get_current_weather(CurrentWeatherArgs {
                location: "London".into(),
                units: Units::Metric,
                save_to_file: false,
            })
            .await;

        let json = response.to_json();
        assert_eq!(json["status"], "success");
        assert_eq!(json["location"], "London, GB");
        assert_eq!(json["data"]["temperature"], 5.5);
        assert!(json["summary"].as_str().unwrap().starts_with("Current weather in London, GB:"));
        assert!(json.get("artifact").is_none());
        assert_eq!(tools.agent().request_count(), 1);
    }

    #[tokio::test]
    async fn out_of_range_days_never_reach_the_provider() {
        let (tools, provider) = tools();

        for days in [0, 6, -1] {
            let response = tools.get_weather_forecast(forecast_args("Oslo", days)).await;
            match response {
                ToolResponse::Error { message } => assert_eq!(message, "Days must be between 1 and 5"),
                other => panic!("expected error, got {other:?}"),
            }
        }

        assert_eq!(provider.calls.load(Ordering::Relaxed), 0);
        assert_eq!(tools.agent().request_count(), 0);
    }

    #[tokio::test]
    async fn unknown_location_is_a_location_error() {
        let (tools, _) = tools();
        let response = tools.get_weather_forecast(forecast_args("Nowhereville", 3)).await;

        let json = response.to_json();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Location error: Location 'Nowhereville' not found");
    }

    #[tokio::test]
    async fn blank_location_is_rejected() {
        let (tools, provider) = tools();
        let response = tools.get_weather_forecast(forecast_args("   ", 3)).await;

        assert!(!response.is_success());
        assert_eq!(provider.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn forecast_is_saved_as_artifact() {
        let (tools, _) = tools();
        let store = Arc::new(MemoryStore::default());
        let tools = tools.with_artifact_store(store.clone(), scope());

        let mut args = forecast_args("Oslo", 3);
        args.save_to_file = true;
        let response = tools.get_weather_forecast(args).await;

        let ToolResponse::Success { artifact: Some(ArtifactOutcome::Success { filename, .. }), .. } = &response
        else {
            panic!("expected saved artifact, got {response:?}");
        };
        assert!(filename.starts_with("forecast_Oslo_3day_"));
        assert!(filename.ends_with(".json"));

        let saved = store.saved.lock();
        assert_eq!(saved.len(), 1);
        assert_eq!(&saved[0].filename, filename);
        assert_eq!(saved[0].mime_type, "application/json");
        assert_eq!(saved[0].scope, scope());
        assert_eq!(saved[0].metadata["description"], "Weather data report");
        assert_eq!(saved[0].metadata["source"], "Weather Agent");

        let body: Value = serde_json::from_slice(&saved[0].content).unwrap();
        assert_eq!(body["location"], "Oslo, NO");
        assert_eq!(body["forecasts"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_save_keeps_the_fetch_successful() {
        let (tools, _) = tools();
        let store = Arc::new(MemoryStore { fail: true, ..Default::default() });
        let tools = tools.with_artifact_store(store, scope());

        let response = tools
            .get_current_weather(CurrentWeatherArgs {
                location: "London".into(),
                units: Units::Metric,
                save_to_file: true,
            })
            .await;

        let json = response.to_json();
        assert_eq!(json["status"], "success");
        assert_eq!(json["artifact"]["status"], "error");
        assert!(json["artifact"]["message"].as_str().unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn save_without_store_reports_nested_error() {
        let (tools, _) = tools();
        let response = tools
            .get_current_weather(CurrentWeatherArgs {
                location: "London".into(),
                units: Units::Metric,
                save_to_file: true,
            })
            .await;

        let json = response.to_json();
        assert_eq!(json["status"], "success");
        assert_eq!(json["artifact"]["status"], "error");
        assert!(json["artifact"]["message"].as_str().unwrap().contains("Artifact service not available"));
    }

    #[tokio::test]
    async fn tools_fail_after_cleanup() {
        let (tools, provider) = tools();
        tools.agent().cleanup();

        let response = tools.get_weather_forecast(forecast_args("Oslo", 2)).await;
        let json = response.to_json();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Weather service not initialized");
        assert_eq!(provider.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn call_applies_argument_defaults() {
        let (tools, _) = tools();
        let response = tools.call(WEATHER_FORECAST_TOOL, json!({ "location": "Oslo" })).await;

        let json = response.to_json();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["units"], "metric");
        assert_eq!(json["data"]["forecasts"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn call_rejects_bad_arguments_and_unknown_tools() {
        let (tools, provider) = tools();

        let bad_units = tools
            .call(CURRENT_WEATHER_TOOL, json!({ "location": "Oslo", "units": "rankine" }))
            .await
            .to_json();
        assert!(bad_units["message"].as_str().unwrap().starts_with("Invalid arguments for get_current_weather"));

        let missing = tools.call(WEATHER_FORECAST_TOOL, json!({})).await;
        assert!(!missing.is_success());

        let unknown = tools.call("get_tide_tables", json!({})).await.to_json();
        assert_eq!(unknown["message"], "Unknown tool 'get_tide_tables'");

        assert_eq!(provider.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn definitions_cover_both_tools() {
        let defs = WeatherTools::definitions();
        let names: Vec<_> = defs.iter().map(|d| d.name).collect();
        assert_eq!(names, [CURRENT_WEATHER_TOOL, WEATHER_FORECAST_TOOL]);
        assert_eq!(defs[1].parameters["properties"]["days"]["maximum"], 5);
        assert_eq!(defs[0].parameters["required"][0], "location");
    }
}
