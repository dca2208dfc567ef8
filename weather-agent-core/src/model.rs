use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// Measurement system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Kelvin,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Kelvin => "kelvin",
        }
    }

    /// Value of the `units` query parameter. OpenWeatherMap calls Kelvin "standard".
    pub fn api_value(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Kelvin => "standard",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Kelvin => "K",
        }
    }

    pub fn speed_symbol(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric | Units::Kelvin => "m/s",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "kelvin" => Ok(Units::Kelvin),
            _ => Err(WeatherError::validation(format!(
                "Unknown units '{s}'. Supported units: metric, imperial, kelvin."
            ))),
        }
    }
}

/// Number of forecast days, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastDays(u8);

impl ForecastDays {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// The provider returns one sample every three hours.
    pub const SAMPLES_PER_DAY: usize = 8;
    /// Hard cap of the free five-day forecast endpoint.
    pub const MAX_SAMPLES: usize = 40;

    pub fn new(days: i64) -> Result<Self, WeatherError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&days) {
            Ok(Self(days as u8))
        } else {
            Err(WeatherError::validation(format!(
                "Days must be between {} and {}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// `cnt` query parameter: `min(days * 8, 40)`.
    pub fn raw_sample_count(&self) -> usize {
        (usize::from(self.0) * Self::SAMPLES_PER_DAY).min(Self::MAX_SAMPLES)
    }
}

impl Default for ForecastDays {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl fmt::Display for ForecastDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized current conditions for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeatherRecord {
    /// `"<city>, <country code>"`
    pub location: String,
    pub units: Units,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    /// hPa
    pub pressure: f64,
    pub description: String,
    pub wind_speed: f64,
    /// Meteorological degrees.
    pub wind_direction: f64,
    /// Kilometers.
    pub visibility: f64,
    pub timestamp: DateTime<FixedOffset>,
    pub sunrise: DateTime<FixedOffset>,
    pub sunset: DateTime<FixedOffset>,
}

/// Summary of the 3-hour samples that share one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastRecord {
    pub date: NaiveDate,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub description: String,
    pub humidity: u8,
    pub wind_speed: f64,
    pub wind_direction: f64,
    /// Percent, 0–100, unrounded.
    pub precipitation_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub location: String,
    pub units: Units,
    pub forecasts: Vec<DailyForecastRecord>,
}
