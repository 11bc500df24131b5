//! Turns a weather snapshot into the response shape served to callers.

use serde_json::Number;

use crate::model::{FormattedResponse, WeatherSnapshot};

pub const RAIN_ADVICE: &str = "Rain expected: take an umbrella.";
pub const HEAT_ADVICE: &str = "Heat warning: stay hydrated and avoid the midday sun.";
pub const COLD_ADVICE: &str = "Cold warning: dress warmly.";
pub const WIND_ADVICE: &str = "Wind warning: strong winds expected.";
pub const NO_ADVICE: &str = "No special advice.";

const HOT_ABOVE_C: f64 = 35.0;
const COLD_BELOW_C: f64 = 10.0;
const WINDY_ABOVE_MPS: f64 = 10.0;

/// Build the response for `location` from `snapshot`.
pub fn format_response(location: &str, snapshot: &WeatherSnapshot) -> FormattedResponse {
    let values = &snapshot.values;

    FormattedResponse {
        location: location.to_string(),
        temperature: values.temperature.clone(),
        humidity: values.humidity.clone(),
        wind_speed: values.wind_speed.clone(),
        rain_intensity: values.rain_intensity.clone(),
        advice: advice_for(snapshot),
        resolved_location: snapshot.resolved_location.clone(),
        observed_at: snapshot.observed_at,
    }
}

/// Advisories in fixed order: rain, heat, cold, wind. Never empty.
pub fn advice_for(snapshot: &WeatherSnapshot) -> Vec<String> {
    let values = &snapshot.values;
    let temperature = metric(&values.temperature);

    let mut advice = Vec::new();
    if metric(&values.rain_intensity) > 0.0 {
        advice.push(RAIN_ADVICE.to_string());
    }
    if temperature > HOT_ABOVE_C {
        advice.push(HEAT_ADVICE.to_string());
    }
    if temperature < COLD_BELOW_C {
        advice.push(COLD_ADVICE.to_string());
    }
    if metric(&values.wind_speed) > WINDY_ABOVE_MPS {
        advice.push(WIND_ADVICE.to_string());
    }

    if advice.is_empty() {
        advice.push(NO_ADVICE.to_string());
    }
    advice
}

// Absent metrics count as zero for thresholds only.
fn metric(value: &Option<Number>) -> f64 {
    value.as_ref().and_then(Number::as_f64).unwrap_or(0.0)
}
