use std::fmt;

use thiserror::Error;

/// Why a credential was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialProblem {
    /// Nothing was supplied from the flag, the environment or the config file.
    Missing,
    /// Something was supplied but is too short to be an OpenWeatherMap key.
    Malformed,
    /// The provider answered 401 for the supplied key.
    Rejected,
}

impl fmt::Display for CredentialProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialProblem::Missing => f.write_str(
                "API key is required. Set OPENWEATHER_API_KEY, pass --api-key, \
                 or run `weather configure`.",
            ),
            CredentialProblem::Malformed => f.write_str("API key appears to be invalid format"),
            CredentialProblem::Rejected => f.write_str("Invalid API key provided"),
        }
    }
}

/// Underlying cause of a `RequestFailed` error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    Timeout,
    Connection,
    Status(u16),
    InvalidResponse(String),
    Transport(String),
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestFailure::Timeout => {
                f.write_str("Request timeout - weather service is not responding")
            }
            RequestFailure::Connection => {
                f.write_str("Cannot connect to weather service - check internet connection")
            }
            RequestFailure::Status(code) => {
                write!(f, "Weather service request failed with HTTP {code}")
            }
            RequestFailure::InvalidResponse(detail) => {
                write!(f, "Invalid response from weather service: {detail}")
            }
            RequestFailure::Transport(detail) => {
                write!(f, "Weather service request failed: {detail}")
            }
        }
    }
}

/// Every failure the core can report. Each variant is terminal for the call
/// that produced it.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("{0}")]
    InvalidCredential(CredentialProblem),

    #[error("Invalid {field}: '{value}'. {reason}")]
    Validation {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error(
        "City '{city}' in country '{country}' not found. \
         Please check spelling and use 2-letter country codes (e.g., 'US', 'GB', 'MY')."
    )]
    LocationNotFound { city: String, country: String },

    #[error("API rate limit exceeded. Please retry after {retry_after_secs} seconds.")]
    RateLimited {
        retry_after_secs: u64,
        endpoint: String,
    },

    #[error("Weather service is temporarily unavailable (HTTP {status}, endpoint: {endpoint})")]
    ServiceUnavailable { status: u16, endpoint: String },

    #[error("{cause} (endpoint: {endpoint})")]
    RequestFailed {
        endpoint: String,
        cause: RequestFailure,
        source: Option<reqwest::Error>,
    },
}

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;

impl WeatherError {
    pub(crate) fn validation(
        field: &'static str,
        value: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        WeatherError::Validation { field, value: value.to_string(), reason: reason.into() }
    }

    pub(crate) fn request_failed(endpoint: &str, cause: RequestFailure) -> Self {
        WeatherError::RequestFailed { endpoint: endpoint.to_string(), cause, source: None }
    }

    /// Stable machine-readable code, suitable for scripts.
    pub fn code(&self) -> &'static str {
        match self {
            WeatherError::InvalidCredential(_) => "INVALID_API_KEY",
            WeatherError::Validation { .. } => "VALIDATION_ERROR",
            WeatherError::LocationNotFound { .. } => "CITY_NOT_FOUND",
            WeatherError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            WeatherError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            WeatherError::RequestFailed { .. } => "API_REQUEST_FAILED",
        }
    }

    /// What the user should do next.
    pub fn hint(&self) -> String {
        match self {
            WeatherError::InvalidCredential(_) => {
                "Provide a valid OpenWeatherMap API key.".to_string()
            }
            WeatherError::Validation { .. } => "Fix the input and try again.".to_string(),
            WeatherError::LocationNotFound { .. } => {
                "Check the city name and the 2-letter country code.".to_string()
            }
            WeatherError::RateLimited { retry_after_secs, .. } => {
                format!("Wait {retry_after_secs} seconds before the next request.")
            }
            WeatherError::ServiceUnavailable { .. } => "Try again later.".to_string(),
            WeatherError::RequestFailed { cause: RequestFailure::Connection, .. } => {
                "Check your internet connection.".to_string()
            }
            WeatherError::RequestFailed { .. } => {
                "Try again, or increase the timeout with --timeout.".to_string()
            }
        }
    }

    /// HTTP status involved in the failure, if the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            WeatherError::InvalidCredential(CredentialProblem::Rejected) => Some(401),
            WeatherError::RateLimited { .. } => Some(429),
            WeatherError::ServiceUnavailable { status, .. } => Some(*status),
            WeatherError::RequestFailed { cause: RequestFailure::Status(code), .. } => Some(*code),
            _ => None,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            WeatherError::RateLimited { endpoint, .. }
            | WeatherError::ServiceUnavailable { endpoint, .. }
            | WeatherError::RequestFailed { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_messages_distinguish_missing_and_malformed() {
        let missing = WeatherError::InvalidCredential(CredentialProblem::Missing).to_string();
        let malformed = WeatherError::InvalidCredential(CredentialProblem::Malformed).to_string();

        assert!(missing.contains("API key is required"));
        assert!(malformed.contains("invalid format"));
        assert_ne!(missing, malformed);
    }

    #[test]
    fn location_not_found_mentions_city_and_country() {
        let err = WeatherError::LocationNotFound {
            city: "InvalidCity".into(),
            country: "XX".into(),
        };

        let msg = err.to_string();
        assert!(msg.contains("InvalidCity"));
        assert!(msg.contains("XX"));
        assert_eq!(err.code(), "CITY_NOT_FOUND");
    }

    #[test]
    fn rate_limited_surfaces_retry_after() {
        let err = WeatherError::RateLimited { retry_after_secs: 45, endpoint: "weather".into() };

        assert!(err.to_string().contains("45 seconds"));
        assert!(err.hint().contains("45"));
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.endpoint(), Some("weather"));
    }

    #[test]
    fn request_failed_carries_endpoint_and_status() {
        let err = WeatherError::request_failed("forecast", RequestFailure::Status(404));

        assert_eq!(err.status(), Some(404));
        assert_eq!(err.endpoint(), Some("forecast"));
        assert!(err.to_string().contains("HTTP 404"));
        assert!(err.to_string().contains("forecast"));
    }

    #[test]
    fn codes_are_distinct_per_kind() {
        let errors = [
            WeatherError::InvalidCredential(CredentialProblem::Rejected),
            WeatherError::validation("city", "", "City name cannot be empty"),
            WeatherError::LocationNotFound { city: "a".into(), country: "BB".into() },
            WeatherError::RateLimited { retry_after_secs: 60, endpoint: "weather".into() },
            WeatherError::ServiceUnavailable { status: 503, endpoint: "weather".into() },
            WeatherError::request_failed("weather", RequestFailure::Timeout),
        ];

        let mut codes: Vec<_> = errors.iter().map(WeatherError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
