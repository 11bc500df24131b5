use async_trait::async_trait;
use serde_json::Value;
use std::{fmt::Debug, sync::Arc};

use crate::{Config, error::WeatherError, provider::tomorrow::TomorrowIoProvider};

pub mod tomorrow;

/// Source of realtime weather payloads.
///
/// Implementations return the decoded body untouched; deciding whether it
/// actually holds data is up to the caller.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, location: &str) -> Result<Value, WeatherError>;
}

/// Construct the realtime provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.weather.api_key.as_deref().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for the weather provider.\n\
             Hint: set TOMORROW_API_KEY or `api_key` under [weather] in the config file."
        )
    })?;

    Ok(Arc::new(TomorrowIoProvider::new(&config.weather, api_key.to_owned())?))
}
