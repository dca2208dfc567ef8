//! Human-readable text for tool results. Advisory only, never parsed back.

use crate::model::{CurrentWeatherRecord, ForecastResult};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M %:z";

pub fn current_summary(record: &CurrentWeatherRecord) -> String {
    let temp = record.units.temperature_symbol();
    let speed = record.units.speed_symbol();

    [
        format!("Current weather in {}:", record.location),
        format!("• Temperature: {:.1}{temp} (feels like {:.1}{temp})", record.temperature, record.feels_like),
        format!("• Humidity: {}%", record.humidity),
        format!("• Pressure: {:.0} hPa", record.pressure),
        format!("• Conditions: {}", record.description),
        format!("• Wind: {:.1} {speed} from {:.0}°", record.wind_speed, record.wind_direction),
        format!("• Visibility: {:.1} km", record.visibility),
        format!("• Observed: {}", record.timestamp.format(TIME_FORMAT)),
        format!(
            "• Sunrise: {}, Sunset: {}",
            record.sunrise.format(TIME_FORMAT),
            record.sunset.format(TIME_FORMAT)
        ),
    ]
    .join("\n")
}

/// One block per day; precipitation is listed only for days with a non-zero chance.
pub fn forecast_summary(result: &ForecastResult) -> String {
    let temp = result.units.temperature_symbol();
    let mut blocks = vec![format!("Weather forecast for {}:", result.location)];

    for day in &result.forecasts {
        let mut lines = vec![
            format!("• {}: {}", day.date.format("%A, %B %d"), day.description),
            format!("  High: {:.1}{temp}, Low: {:.1}{temp}", day.temperature_max, day.temperature_min),
        ];
        if day.precipitation_probability > 0.0 {
            lines.push(format!("  Precipitation: {:.0}% chance", day.precipitation_probability));
        }
        blocks.push(lines.join("\n"));
    }

    blocks.join("\n\n")
}
