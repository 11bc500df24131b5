use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::{config::WeatherApiConfig, error::WeatherError};

use super::WeatherProvider;

/// Tomorrow.io realtime endpoint.
#[derive(Clone)]
pub struct TomorrowIoProvider {
    realtime_url: String,
    api_key: String,
    http: Client,
}

impl std::fmt::Debug for TomorrowIoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TomorrowIoProvider")
            .field("realtime_url", &self.realtime_url)
            .finish_non_exhaustive()
    }
}

impl TomorrowIoProvider {
    pub fn new(config: &WeatherApiConfig, api_key: String) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WeatherError::Internal(format!("Failed to build weather client: {e}")))?;

        Ok(Self {
            realtime_url: format!("{}/v4/weather/realtime", config.base_url.trim_end_matches('/')),
            api_key,
            http,
        })
    }
}

#[async_trait]
impl WeatherProvider for TomorrowIoProvider {
    async fn fetch(&self, location: &str) -> Result<Value, WeatherError> {
        let res = self
            .http
            .get(&self.realtime_url)
            .query(&[
                ("location", location),
                ("units", "metric"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::from_transport("weather provider", e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::from_transport("weather provider", e))?;

        if !status.is_success() {
            tracing::warn!(%status, location, "weather provider request failed");
            return Err(WeatherError::UpstreamError {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        tracing::info!(%status, location, "fetched realtime weather");

        serde_json::from_str(&body)
            .map_err(|e| WeatherError::Internal(format!("Failed to parse weather JSON: {e}")))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
