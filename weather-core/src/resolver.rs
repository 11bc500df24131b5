//! The cache-aside resolution pipeline.
//!
//! validate -> cache lookup -> (miss) upstream fetch -> payload check ->
//! cache write -> format. Nothing is retried; the first failure is returned.

use serde_json::Value;
use std::{sync::Arc, time::Duration};

use crate::{
    Config,
    cache::{self, CacheStore},
    error::WeatherError,
    format::format_response,
    geocode::{LocationValidator, NominatimValidator},
    model::{FormattedResponse, LocationQuery, WeatherSnapshot},
    provider::{self, WeatherProvider},
};

#[derive(Debug, Clone)]
pub struct WeatherResolver {
    validator: Arc<dyn LocationValidator>,
    cache: Arc<dyn CacheStore>,
    provider: Arc<dyn WeatherProvider>,
    ttl: Duration,
}

impl WeatherResolver {
    pub fn new(
        validator: Arc<dyn LocationValidator>,
        cache: Arc<dyn CacheStore>,
        provider: Arc<dyn WeatherProvider>,
        ttl: Duration,
    ) -> Self {
        Self {
            validator,
            cache,
            provider,
            ttl,
        }
    }

    /// Wire the production collaborators described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            Arc::new(NominatimValidator::new(&config.geocoding)?),
            cache::cache_from_config(config)?,
            provider::provider_from_config(config)?,
            config.cache.ttl(),
        ))
    }

    /// Resolve a free-text location into current weather.
    pub async fn resolve(&self, location: &str) -> Result<FormattedResponse, WeatherError> {
        let query = LocationQuery::new(location)?;
        self.resolve_query(&query).await
    }

    pub async fn resolve_query(
        &self,
        query: &LocationQuery,
    ) -> Result<FormattedResponse, WeatherError> {
        let location = query.as_str();

        if !self.validator.validate(location).await? {
            tracing::info!(location, "rejected location");
            return Err(WeatherError::InvalidLocation(location.to_string()));
        }

        let key = query.cache_key();
        let snapshot = match self.cache.get(key.as_str()).await? {
            Some(cached) => {
                tracing::debug!(%key, "cache hit");
                let payload: Value = serde_json::from_str(&cached).map_err(|e| {
                    WeatherError::Internal(format!("Corrupt cache entry under {key}: {e}"))
                })?;
                WeatherSnapshot::from_payload(location, &payload)?
            }
            None => {
                tracing::debug!(%key, "cache miss");
                let payload = self.provider.fetch(location).await?;
                let snapshot = WeatherSnapshot::from_payload(location, &payload)?;

                let serialized = serde_json::to_string(&payload).map_err(|e| {
                    WeatherError::Internal(format!("Failed to serialize payload: {e}"))
                })?;
                self.cache.set(key.as_str(), &serialized, self.ttl).await?;
                tracing::info!(%key, ttl_secs = self.ttl.as_secs(), "cached weather payload");

                snapshot
            }
        };

        Ok(format_response(location, &snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::{CacheError, ErrorKind};
    use crate::format::{NO_ADVICE, RAIN_ADVICE};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{Number, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct FakeValidator {
        answer: Result<bool, ErrorKind>,
        calls: AtomicUsize,
    }

    impl FakeValidator {
        fn answering(answer: Result<bool, ErrorKind>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }

        fn accepting() -> Arc<Self> {
            Self::answering(Ok(true))
        }

        fn rejecting() -> Arc<Self> {
            Self::answering(Ok(false))
        }

        fn unavailable() -> Arc<Self> {
            Self::answering(Err(ErrorKind::UpstreamUnavailable))
        }
    }

    #[async_trait]
    impl LocationValidator for FakeValidator {
        async fn validate(&self, _location: &str) -> Result<bool, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.map_err(|_| WeatherError::UpstreamUnavailable("geocoder down".into()))
        }
    }

    #[derive(Debug)]
    struct FakeProvider {
        answer: Mutex<Option<Result<Value, WeatherError>>>,
        payload: Value,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn returning(payload: Value) -> Arc<Self> {
            Arc::new(Self {
                answer: Mutex::new(None),
                payload,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(err: WeatherError) -> Arc<Self> {
            Arc::new(Self {
                answer: Mutex::new(Some(Err(err))),
                payload: Value::Null,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch(&self, _location: &str) -> Result<Value, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answer.lock().take() {
                Some(answer) => answer,
                None => Ok(self.payload.clone()),
            }
        }
    }

    /// Records every call and delegates to an in-memory store.
    #[derive(Debug, Default)]
    struct RecordingCache {
        inner: MemoryCache,
        gets: AtomicUsize,
        sets: Mutex<Vec<(String, String, Duration)>>,
    }

    impl RecordingCache {
        fn touched(&self) -> bool {
            self.gets.load(Ordering::SeqCst) > 0 || !self.sets.lock().is_empty()
        }
    }

    #[async_trait]
    impl CacheStore for RecordingCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
            self.sets.lock().push((key.to_string(), value.to_string(), ttl));
            self.inner.set(key, value, ttl).await
        }
    }

    #[derive(Debug)]
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection reset".into()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection reset".into()))
        }
    }

    const TTL: Duration = Duration::from_secs(600);

    fn paris_payload() -> Value {
        json!({
            "data": {
                "time": "2024-05-01T12:00:00Z",
                "values": { "temperature": 18, "humidity": 60, "windSpeed": 4, "rainIntensity": 0 }
            }
        })
    }

    fn resolver(
        validator: Arc<FakeValidator>,
        cache: Arc<RecordingCache>,
        provider: Arc<FakeProvider>,
    ) -> WeatherResolver {
        WeatherResolver::new(validator, cache, provider, TTL)
    }

    #[tokio::test]
    async fn miss_fetches_caches_and_formats() {
        let cache = Arc::new(RecordingCache::default());
        let provider = FakeProvider::returning(paris_payload());
        let resolver = resolver(FakeValidator::accepting(), cache.clone(), provider.clone());

        let response = resolver.resolve("Paris").await.unwrap();

        assert_eq!(response.location, "Paris");
        assert_eq!(response.temperature, Some(Number::from(18_u64)));
        assert_eq!(response.humidity, Some(Number::from(60_u64)));
        assert_eq!(response.wind_speed, Some(Number::from(4_u64)));
        assert_eq!(response.rain_intensity, Some(Number::from(0_u64)));
        assert_eq!(response.advice, vec![NO_ADVICE]);

        assert_eq!(provider.calls(), 1);
        {
            let sets = cache.sets.lock();
            assert_eq!(sets.len(), 1);
            assert_eq!(sets[0].0, "weather:paris");
            assert_eq!(sets[0].2, TTL);
            assert_eq!(serde_json::from_str::<Value>(&sets[0].1).unwrap(), paris_payload());
        }
        assert!(cache.inner.ttl_of("weather:paris").await.is_some());
    }

    #[tokio::test]
    async fn hit_skips_provider() {
        let cache = Arc::new(RecordingCache::default());
        let cached = json!({ "data": { "values": {
            "temperature": 12, "humidity": 80, "windSpeed": 3, "rainIntensity": 1.5
        } } });
        cache.inner.set("weather:london", &cached.to_string(), TTL).await.unwrap();

        let provider = FakeProvider::returning(paris_payload());
        let resolver = resolver(FakeValidator::accepting(), cache.clone(), provider.clone());

        let response = resolver.resolve("  LONDON ").await.unwrap();
        let expected = format_response(
            "  LONDON ",
            &WeatherSnapshot::from_payload("  LONDON ", &cached).unwrap(),
        );

        assert_eq!(response, expected);
        assert_eq!(response.advice, vec![RAIN_ADVICE]);
        assert_eq!(provider.calls(), 0);
        assert!(cache.sets.lock().is_empty());
    }

    #[tokio::test]
    async fn second_resolution_is_served_from_cache() {
        let cache = Arc::new(RecordingCache::default());
        let provider = FakeProvider::returning(paris_payload());
        let resolver = resolver(FakeValidator::accepting(), cache.clone(), provider.clone());

        let first = resolver.resolve("Paris").await.unwrap();
        let second = resolver.resolve("paris").await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(first.temperature, second.temperature);
        assert_eq!(second.location, "paris");
    }

    #[tokio::test]
    async fn no_dedup_without_cache_write() {
        // Two resolvers over separate empty caches model two requests racing
        // before either has written its entry.
        let provider = FakeProvider::returning(paris_payload());
        let a = resolver(FakeValidator::accepting(), Arc::default(), provider.clone());
        let b = resolver(FakeValidator::accepting(), Arc::default(), provider.clone());

        let (first, second) = tokio::join!(a.resolve("Paris"), b.resolve("Paris"));

        assert_eq!(provider.calls(), 2);
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[tokio::test]
    async fn invalid_location_short_circuits() {
        let cache = Arc::new(RecordingCache::default());
        let provider = FakeProvider::returning(paris_payload());
        let resolver = resolver(FakeValidator::rejecting(), cache.clone(), provider.clone());

        let err = resolver.resolve("Narnia").await.unwrap_err();

        assert!(matches!(err, WeatherError::InvalidLocation(ref l) if l == "Narnia"));
        assert!(!cache.touched());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn short_input_never_reaches_validator() {
        let validator = FakeValidator::accepting();
        let resolver =
            resolver(validator.clone(), Arc::default(), FakeProvider::returning(paris_payload()));

        let err = resolver.resolve("X").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn validator_outage_is_surfaced() {
        let cache = Arc::new(RecordingCache::default());
        let resolver = resolver(
            FakeValidator::unavailable(),
            cache.clone(),
            FakeProvider::returning(paris_payload()),
        );

        let err = resolver.resolve("Paris").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        assert!(!cache.touched());
    }

    #[tokio::test]
    async fn empty_payload_is_no_data_and_not_cached() {
        let cache = Arc::new(RecordingCache::default());
        let provider = FakeProvider::returning(json!({ "data": { "values": {} } }));
        let resolver = resolver(FakeValidator::accepting(), cache.clone(), provider.clone());

        let err = resolver.resolve("Paris").await.unwrap_err();

        assert!(matches!(err, WeatherError::NoDataFound(ref l) if l == "Paris"));
        assert!(cache.sets.lock().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_skips_cache_write() {
        let cache = Arc::new(RecordingCache::default());
        let provider =
            FakeProvider::failing(WeatherError::UpstreamUnavailable("timed out".into()));
        let resolver = resolver(FakeValidator::accepting(), cache.clone(), provider.clone());

        let err = resolver.resolve("Paris").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        assert!(cache.sets.lock().is_empty());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn upstream_status_is_passed_through() {
        let provider = FakeProvider::failing(WeatherError::UpstreamError {
            status: 429,
            message: "Too Many Calls".into(),
        });
        let resolver = resolver(FakeValidator::accepting(), Arc::default(), provider);

        let err = resolver.resolve("Paris").await.unwrap_err();
        assert_eq!(err.status_code(), 429);
    }

    #[tokio::test]
    async fn cached_payload_without_values_is_no_data() {
        let cache = Arc::new(RecordingCache::default());
        let cached = json!({ "data": { "values": {} } });
        cache.inner.set("weather:paris", &cached.to_string(), TTL).await.unwrap();
        let provider = FakeProvider::returning(paris_payload());
        let resolver = resolver(FakeValidator::accepting(), cache.clone(), provider.clone());

        let err = resolver.resolve("Paris").await.unwrap_err();

        assert!(matches!(err, WeatherError::NoDataFound(ref l) if l == "Paris"));
        assert_eq!(provider.calls(), 0);
        assert!(cache.sets.lock().is_empty());
    }

    #[tokio::test]
    async fn malformed_upstream_metrics_are_no_data() {
        let cache = Arc::new(RecordingCache::default());
        let provider = FakeProvider::returning(json!({
            "data": { "values": { "temperature": "n/a", "humidity": 60 } }
        }));
        let resolver = resolver(FakeValidator::accepting(), cache.clone(), provider);

        let err = resolver.resolve("Paris").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoDataFound);
        assert!(cache.sets.lock().is_empty());
    }

    #[tokio::test]
    async fn corrupt_cache_entry_is_internal() {
        let cache = Arc::new(RecordingCache::default());
        cache.inner.set("weather:paris", "not json", TTL).await.unwrap();
        let provider = FakeProvider::returning(paris_payload());
        let resolver = resolver(FakeValidator::accepting(), cache, provider.clone());

        let err = resolver.resolve("Paris").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn cache_failure_is_internal() {
        let resolver = WeatherResolver::new(
            FakeValidator::accepting(),
            Arc::new(BrokenCache),
            FakeProvider::returning(paris_payload()),
            TTL,
        );

        let err = resolver.resolve("Paris").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
