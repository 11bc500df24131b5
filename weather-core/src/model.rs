use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::WeatherError;

const CACHE_KEY_PREFIX: &str = "weather:";
const MIN_LOCATION_LEN: usize = 2;

/// A place name as typed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery {
    raw: String,
}

impl LocationQuery {
    pub fn new(raw: impl Into<String>) -> Result<Self, WeatherError> {
        let raw = raw.into();
        if raw.trim().chars().count() < MIN_LOCATION_LEN {
            return Err(WeatherError::InvalidInput(format!(
                "location must be at least {MIN_LOCATION_LEN} characters long"
            )));
        }
        Ok(Self { raw })
    }

    /// The input exactly as supplied, used for display and outbound queries.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_location(&self.raw)
    }
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Cache key of the form `weather:<lowercased trimmed location>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_location(location: &str) -> Self {
        Self(format!("{CACHE_KEY_PREFIX}{}", location.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metrics reported by the realtime endpoint. Numbers are kept as the
/// upstream wrote them so that the response echoes them unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherValues {
    pub temperature: Option<Number>,
    pub humidity: Option<Number>,
    pub wind_speed: Option<Number>,
    pub rain_intensity: Option<Number>,
}

/// Structured view over a raw realtime payload.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub values: WeatherValues,
    pub resolved_location: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    data: Option<RawData>,
    location: Option<RawLocation>,
}

#[derive(Debug, Deserialize)]
struct RawData {
    time: Option<String>,
    values: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    name: Option<String>,
}

impl WeatherSnapshot {
    /// Interpret a raw payload. A missing, empty or malformed `data.values`
    /// object means there is nothing to report for `location`.
    pub fn from_payload(location: &str, payload: &Value) -> Result<Self, WeatherError> {
        let no_data = || WeatherError::NoDataFound(location.to_string());

        let raw = RawPayload::deserialize(payload).map_err(|_| no_data())?;
        let data = raw.data.ok_or_else(no_data)?;
        let values = data.values.filter(|v| !v.is_empty()).ok_or_else(no_data)?;

        let values = WeatherValues::deserialize(Value::Object(values)).map_err(|e| {
            tracing::warn!(location, error = %e, "malformed weather values");
            no_data()
        })?;

        Ok(Self {
            values,
            resolved_location: raw.location.and_then(|l| l.name),
            observed_at: data
                .time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc)),
        })
    }
}

/// The normalized answer handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedResponse {
    pub location: String,
    pub temperature: Option<Number>,
    pub humidity: Option<Number>,
    pub wind_speed: Option<Number>,
    pub rain_intensity: Option<Number>,
    pub advice: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_key_ignores_case_and_surrounding_whitespace() {
        let a = LocationQuery::new("Paris").unwrap();
        let b = LocationQuery::new("  pARIS \t").unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key().as_str(), "weather:paris");
    }

    #[test]
    fn cache_key_keeps_inner_whitespace() {
        let key = CacheKey::for_location(" New York ");
        assert_eq!(key.as_str(), "weather:new york");
    }

    #[test]
    fn query_preserves_case_for_display() {
        let q = LocationQuery::new("São Paulo").unwrap();
        assert_eq!(q.as_str(), "São Paulo");
        assert_eq!(q.to_string(), "São Paulo");
    }

    #[test]
    fn query_rejects_short_input() {
        assert!(LocationQuery::new("").is_err());
        assert!(LocationQuery::new("  x ").is_err());
        assert!(LocationQuery::new("Ry").is_ok());
    }

    #[test]
    fn snapshot_reads_realtime_payload() {
        let payload = json!({
            "data": {
                "time": "2024-05-01T12:00:00Z",
                "values": {
                    "temperature": 18,
                    "humidity": 60,
                    "windSpeed": 4.2,
                    "rainIntensity": 0,
                    "cloudCover": 12
                }
            },
            "location": { "lat": 48.85, "lon": 2.35, "name": "Paris, France" }
        });

        let snapshot = WeatherSnapshot::from_payload("Paris", &payload).unwrap();
        assert_eq!(snapshot.values.temperature, Some(Number::from(18_i64)));
        assert_eq!(snapshot.values.wind_speed.as_ref().and_then(Number::as_f64), Some(4.2));
        assert_eq!(snapshot.resolved_location.as_deref(), Some("Paris, France"));
        assert!(snapshot.observed_at.is_some());
    }

    #[test]
    fn snapshot_keeps_missing_metrics_absent() {
        let payload = json!({ "data": { "values": { "temperature": 3 } } });
        let snapshot = WeatherSnapshot::from_payload("Oslo", &payload).unwrap();
        assert_eq!(snapshot.values.humidity, None);
        assert_eq!(snapshot.values.rain_intensity, None);
    }

    #[test]
    fn snapshot_with_non_numeric_metric_is_no_data() {
        let payload = json!({ "data": { "values": { "temperature": "n/a", "humidity": 60 } } });

        let err = WeatherSnapshot::from_payload("Paris", &payload).unwrap_err();

        assert!(matches!(err, WeatherError::NoDataFound(ref l) if l == "Paris"));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn snapshot_without_values_is_no_data() {
        for payload in [
            json!({}),
            json!({ "data": {} }),
            json!({ "data": { "values": {} } }),
            json!({ "data": { "values": null } }),
            json!([1, 2, 3]),
        ] {
            let err = WeatherSnapshot::from_payload("Nowhere", &payload).unwrap_err();
            assert!(matches!(err, WeatherError::NoDataFound(ref l) if l == "Nowhere"));
        }
    }
}
