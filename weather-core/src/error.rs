use thiserror::Error;

/// Stable classification of a failed resolution, exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    InvalidLocation,
    NoDataFound,
    UpstreamUnavailable,
    UpstreamError,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidLocation => "invalid_location",
            ErrorKind::NoDataFound => "no_data_found",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way a resolution can fail. Exactly one of these is returned per
/// failed request.
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("'{0}' is not a recognized place")]
    InvalidLocation(String),

    #[error("No weather data found for '{0}'")]
    NoDataFound(String),

    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream service responded with status {status}: {message}")]
    UpstreamError { status: u16, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InvalidLocation(_) => ErrorKind::InvalidLocation,
            Self::NoDataFound(_) => ErrorKind::NoDataFound,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::UpstreamError { .. } => ErrorKind::UpstreamError,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status a front-end should answer with for this error.
    ///
    /// `UpstreamError` passes the upstream code through; codes outside the
    /// valid HTTP range fall back to 502.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 422,
            Self::InvalidLocation(_) | Self::NoDataFound(_) => 404,
            Self::UpstreamUnavailable(_) => 503,
            Self::UpstreamError { status, .. } if (100..=599).contains(status) => *status,
            Self::UpstreamError { .. } => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Classify a reqwest failure that happened before a status was received.
    pub(crate) fn from_transport(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamUnavailable(format!("{service} request timed out"))
        } else if err.is_decode() {
            Self::Internal(format!("Failed to decode {service} response: {err}"))
        } else {
            Self::UpstreamUnavailable(format!("Failed to reach {service}: {err}"))
        }
    }
}

/// Failure inside a cache store backend.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Cache backend returned status {0}")]
    Status(u16),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl From<CacheError> for WeatherError {
    fn from(err: CacheError) -> Self {
        WeatherError::Internal(err.to_string())
    }
}
