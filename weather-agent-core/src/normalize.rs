//! Conversion of raw OpenWeatherMap payloads into the records handed to callers.
//!
//! The forecast endpoint returns one sample every three hours. [`aggregate_daily`]
//! folds contiguous runs of samples sharing a calendar date into one
//! [`DailyForecastRecord`], using the sample closest to noon as the
//! representative for the descriptive fields.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::WeatherError,
    model::{CurrentWeatherRecord, DailyForecastRecord, ForecastDays, ForecastResult, Units},
};

const REPRESENTATIVE_HOUR: i64 = 12;

/// Which clock epoch seconds are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
    Utc,
    /// Timezone of the machine running the agent.
    Local,
    /// UTC shift reported by the provider for the queried place.
    #[default]
    Location,
}

/// Turns epoch seconds into offset-aware timestamps for one response.
#[derive(Debug, Clone, Copy)]
pub struct Localizer {
    basis: TimeBasis,
    location_offset: Option<FixedOffset>,
}

impl Localizer {
    pub fn new(basis: TimeBasis, location_offset_secs: Option<i32>) -> Self {
        Self {
            basis,
            location_offset: location_offset_secs.and_then(FixedOffset::east_opt),
        }
    }

    pub fn utc() -> Self {
        Self::new(TimeBasis::Utc, None)
    }

    pub fn localize(&self, epoch: i64) -> Result<DateTime<FixedOffset>, WeatherError> {
        let utc = DateTime::<Utc>::from_timestamp(epoch, 0)
            .ok_or_else(|| WeatherError::Decode(format!("timestamp {epoch} is out of range")))?;

        let localized = match self.basis {
            TimeBasis::Utc => utc.with_timezone(&Utc.fix()),
            TimeBasis::Local => utc.with_timezone(&Local).fixed_offset(),
            // Provider omitted its shift: fall back to UTC rather than the host clock.
            TimeBasis::Location => utc.with_timezone(&self.location_offset.unwrap_or(Utc.fix())),
        };

        Ok(localized)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMain {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: f64,
    #[serde(default)]
    pub humidity: u8,
    #[serde(default)]
    pub pressure: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCondition {
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSys {
    #[serde(default)]
    pub country: String,
    pub sunrise: i64,
    pub sunset: i64,
}

/// Body of the `/weather` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCurrent {
    pub name: String,
    pub dt: i64,
    /// Shift in seconds from UTC.
    #[serde(default)]
    pub timezone: Option<i32>,
    pub main: RawMain,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
    #[serde(default)]
    pub wind: RawWind,
    /// Meters.
    #[serde(default)]
    pub visibility: f64,
    pub sys: RawSys,
}

/// One 3-hour entry of the `/forecast` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSample {
    pub dt: i64,
    pub main: RawMain,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
    #[serde(default)]
    pub wind: RawWind,
    /// Probability of precipitation, 0.0–1.0.
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCity {
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub timezone: Option<i32>,
}

/// Body of the `/forecast` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecast {
    pub city: RawCity,
    #[serde(default)]
    pub list: Vec<RawSample>,
}

pub fn normalize_current(
    raw: &RawCurrent,
    units: Units,
    basis: TimeBasis,
) -> Result<CurrentWeatherRecord, WeatherError> {
    let localizer = Localizer::new(basis, raw.timezone);

    Ok(CurrentWeatherRecord {
        location: location_label(&raw.name, &raw.sys.country),
        units,
        temperature: raw.main.temp,
        feels_like: raw.main.feels_like,
        humidity: raw.main.humidity,
        pressure: raw.main.pressure,
        description: describe(&raw.weather),
        wind_speed: raw.wind.speed,
        wind_direction: raw.wind.deg,
        visibility: raw.visibility / 1000.0,
        timestamp: localizer.localize(raw.dt)?,
        sunrise: localizer.localize(raw.sys.sunrise)?,
        sunset: localizer.localize(raw.sys.sunset)?,
    })
}

/// Normalize a forecast body, keeping at most `days * 8` samples and `days` daily records.
pub fn normalize_forecast(
    raw: &RawForecast,
    days: ForecastDays,
    units: Units,
    basis: TimeBasis,
) -> Result<ForecastResult, WeatherError> {
    let localizer = Localizer::new(basis, raw.city.timezone);
    let limit = raw.list.len().min(days.raw_sample_count());
    let forecasts = aggregate_daily(&raw.list[..limit], usize::from(days.get()), &localizer)?;

    Ok(ForecastResult {
        location: location_label(&raw.city.name, &raw.city.country),
        units,
        forecasts,
    })
}

/// Group chronologically ordered samples into calendar days.
///
/// A new group starts whenever a sample's local date differs from the previous
/// sample's, so every group is a non-empty contiguous run. Partial first or last
/// days are kept as-is. Only the first `days` groups are returned.
pub fn aggregate_daily(
    samples: &[RawSample],
    days: usize,
    localizer: &Localizer,
) -> Result<Vec<DailyForecastRecord>, WeatherError> {
    let mut groups: Vec<Vec<(&RawSample, DateTime<FixedOffset>)>> = Vec::new();
    let mut current_date: Option<NaiveDate> = None;

    for sample in samples {
        let at = localizer.localize(sample.dt)?;
        let date = at.date_naive();

        if current_date != Some(date) {
            if groups.len() == days {
                break;
            }
            groups.push(Vec::new());
            current_date = Some(date);
        }

        if let Some(group) = groups.last_mut() {
            group.push((sample, at));
        }
    }

    Ok(groups.iter().filter_map(|group| summarize_day(group)).collect())
}

fn summarize_day(group: &[(&RawSample, DateTime<FixedOffset>)]) -> Option<DailyForecastRecord> {
    let (_, first_at) = group.first()?;

    let (temperature_min, temperature_max) = group
        .iter()
        .map(|(sample, _)| sample.main.temp)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));

    // min_by_key keeps the first of equally distant samples.
    let (noon, _) = group
        .iter()
        .min_by_key(|(_, at)| (i64::from(at.hour()) - REPRESENTATIVE_HOUR).abs())?;

    Some(DailyForecastRecord {
        date: first_at.date_naive(),
        temperature_min,
        temperature_max,
        description: describe(&noon.weather),
        humidity: noon.main.humidity,
        wind_speed: noon.wind.speed,
        wind_direction: noon.wind.deg,
        precipitation_probability: noon.pop * 100.0,
    })
}

fn describe(conditions: &[RawCondition]) -> String {
    conditions
        .first()
        .map(|c| title_case(&c.description))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn location_label(name: &str, country: &str) -> String {
    if country.is_empty() {
        name.to_string()
    } else {
        format!("{name}, {country}")
    }
}

/// Upper-case the first letter of every word and lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;

    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}
