//! Core library for the weather gateway.
//!
//! This crate defines:
//! - Configuration read once at startup
//! - Place-name validation through a geocoder
//! - Cache stores with expiring entries
//! - The realtime weather provider
//! - The cache-aside resolution pipeline and response shaping
//!
//! It is used by the `weather-gateway` HTTP server, but can also be reused by
//! other binaries or services.

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod geocode;
pub mod model;
pub mod provider;
pub mod resolver;

pub use cache::{CacheStore, MemoryCache, UpstashCache};
pub use config::Config;
pub use error::{CacheError, ErrorKind, WeatherError};
pub use geocode::{LocationValidator, NominatimValidator};
pub use model::{CacheKey, FormattedResponse, LocationQuery, WeatherSnapshot};
pub use provider::WeatherProvider;
pub use resolver::WeatherResolver;
