//! Place-name validation against a Nominatim-compatible geocoder.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::{config::GeocodingConfig, error::WeatherError};

/// Place granularities accepted as a weather location.
const PLACE_TYPES: &[&str] = &[
    "city",
    "town",
    "village",
    "hamlet",
    "suburb",
    "state",
    "country",
    "administrative",
    "province",
    "region",
    "island",
    "territory",
    "county",
    "municipality",
];

#[async_trait]
pub trait LocationValidator: Send + Sync + Debug {
    /// `Ok(false)` means the geocoder answered but the input is not a
    /// recognized place.
    async fn validate(&self, location: &str) -> Result<bool, WeatherError>;
}

#[derive(Debug, Clone)]
pub struct NominatimValidator {
    search_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(rename = "type")]
    place_type: Option<String>,
    addresstype: Option<String>,
}

impl NominatimPlace {
    fn is_place(&self) -> bool {
        [&self.place_type, &self.addresstype]
            .into_iter()
            .flatten()
            .any(|t| PLACE_TYPES.iter().any(|allowed| t.eq_ignore_ascii_case(allowed)))
    }
}

impl NominatimValidator {
    pub fn new(config: &GeocodingConfig) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| WeatherError::Internal(format!("Failed to build geocoding client: {e}")))?;

        Ok(Self {
            search_url: format!("{}/search", config.base_url.trim_end_matches('/')),
            http,
        })
    }
}

#[async_trait]
impl LocationValidator for NominatimValidator {
    async fn validate(&self, location: &str) -> Result<bool, WeatherError> {
        let res = self
            .http
            .get(&self.search_url)
            .query(&[
                ("q", location),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::from_transport("geocoding", e))?;

        let status = res.status();
        if !status.is_success() {
            tracing::warn!(%status, location, "geocoding request failed");
            return Err(WeatherError::UpstreamError {
                status: status.as_u16(),
                message: format!("Geocoding lookup for '{location}' failed"),
            });
        }

        let body = res.text().await.map_err(|e| WeatherError::from_transport("geocoding", e))?;
        let places: Vec<NominatimPlace> = serde_json::from_str(&body)
            .map_err(|e| WeatherError::Internal(format!("Failed to parse geocoding JSON: {e}")))?;

        let valid = places.first().is_some_and(NominatimPlace::is_place);
        tracing::debug!(location, valid, "geocoding validation");

        Ok(valid)
    }
}
