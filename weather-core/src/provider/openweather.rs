use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Utc};
use reqwest::{
    Response, StatusCode,
    header::{HeaderMap, RETRY_AFTER},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    credential::ApiKey,
    error::{CredentialProblem, RequestFailure, Result, WeatherError},
    forecast::aggregate_daily,
    model::{Coordinates, CurrentConditions, GeoResult, WeatherReport},
    session::{HttpSession, RetryPolicy},
};

use super::WeatherProvider;

pub const DATA_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const GEO_BASE_URL: &str = "https://api.openweathermap.org/geo/1.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Used when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Geocoding,
    CurrentWeather,
    Forecast,
}

impl Endpoint {
    fn name(self) -> &'static str {
        match self {
            Endpoint::Geocoding => "geocoding",
            Endpoint::CurrentWeather => "weather",
            Endpoint::Forecast => "forecast",
        }
    }

    fn url(self, config: &ClientConfig) -> String {
        match self {
            Endpoint::Geocoding => format!("{}/direct", config.geo_base_url),
            Endpoint::CurrentWeather => format!("{}/weather", config.data_base_url),
            Endpoint::Forecast => format!("{}/forecast", config.data_base_url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bounds each individual attempt, not the whole retry sequence.
    pub timeout: Duration,
    pub data_base_url: String,
    pub geo_base_url: String,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            data_base_url: DATA_BASE_URL.to_string(),
            geo_base_url: GEO_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Client for the OpenWeatherMap geocoding, current weather and 5-day forecast APIs.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: ApiKey,
    config: ClientConfig,
    session: HttpSession,
}

impl OpenWeatherClient {
    pub fn new(api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        Self::with_config(api_key, ClientConfig { timeout, ..ClientConfig::default() })
    }

    pub fn with_config(api_key: Option<&str>, config: ClientConfig) -> Result<Self> {
        let api_key = ApiKey::parse(api_key)?;

        if config.timeout.is_zero() {
            return Err(WeatherError::validation(
                "timeout",
                format!("{:?}", config.timeout),
                "Timeout must be positive.",
            ));
        }

        let session = HttpSession::new(config.timeout, config.retry.clone()).map_err(|err| {
            WeatherError::RequestFailed {
                endpoint: "session".to_string(),
                cause: RequestFailure::Transport(err.to_string()),
                source: Some(err),
            }
        })?;

        tracing::info!(
            "OpenWeather client initialized with key {} (timeout {:?})",
            api_key.masked(),
            config.timeout
        );

        Ok(Self { api_key, config, session })
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = endpoint.url(&self.config);
        tracing::debug!("GET {url}");

        let mut params: Vec<(&str, &str)> =
            query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        params.push(("appid", self.api_key.expose()));

        let response = self
            .session
            .get(&url, &params)
            .await
            .map_err(|err| transport_error(endpoint, err))?;

        let response = check_status(endpoint, response)?;

        let body = response.text().await.map_err(|err| transport_error(endpoint, err))?;

        serde_json::from_str(&body).map_err(|err| {
            tracing::debug!("Undecodable {} body: {}", endpoint.name(), truncate_body(&body));
            WeatherError::request_failed(
                endpoint.name(),
                RequestFailure::InvalidResponse(err.to_string()),
            )
        })
    }

    fn weather_query(coordinates: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("lat", coordinates.latitude().to_string()),
            ("lon", coordinates.longitude().to_string()),
            ("units", "metric".to_string()),
            ("lang", "en".to_string()),
        ]
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn resolve_location(&self, city: &str, country: &str) -> Result<GeoResult> {
        let trimmed_city = city.trim();
        if trimmed_city.is_empty() {
            return Err(WeatherError::validation("city", city, "City name cannot be empty."));
        }

        if country.chars().count() != 2 || country.chars().any(char::is_whitespace) {
            return Err(WeatherError::validation(
                "country",
                country,
                "Country must be 2-letter code (e.g., 'MY', 'US').",
            ));
        }
        let country_code = country.to_uppercase();

        tracing::info!("Finding coordinates for {trimmed_city}, {country_code}");

        let candidates: Vec<GeoCandidate> = self
            .get_json(
                Endpoint::Geocoding,
                &[("q", format!("{trimmed_city},{country_code}")), ("limit", "1".to_string())],
            )
            .await?;

        let Some(first) = candidates.into_iter().next() else {
            tracing::warn!("City not found: {city}, {country}");
            return Err(WeatherError::LocationNotFound {
                city: city.to_string(),
                country: country.to_string(),
            });
        };

        let coordinates = Coordinates::new(first.lat, first.lon).map_err(|err| {
            WeatherError::request_failed(
                Endpoint::Geocoding.name(),
                RequestFailure::InvalidResponse(err.to_string()),
            )
        })?;

        let geo = GeoResult {
            name: first.name.unwrap_or_else(|| trimmed_city.to_string()),
            country: first.country.unwrap_or(country_code),
            state: first.state,
            coordinates,
        };

        tracing::info!("Found {}, {} at {}", geo.name, geo.country, geo.coordinates);
        Ok(geo)
    }

    async fn fetch_weather(&self, latitude: f64, longitude: f64) -> Result<WeatherReport> {
        let coordinates = Coordinates::new(latitude, longitude)?;
        tracing::info!("Fetching weather data for coordinates {coordinates}");

        let query = Self::weather_query(coordinates);
        let fetched_at = Utc::now();

        let current: CurrentConditions = self.get_json(Endpoint::CurrentWeather, &query).await?;
        let forecast: ForecastResponse = self.get_json(Endpoint::Forecast, &query).await?;
        tracing::debug!("Forecast items count: {}", forecast.list.len());

        let daily = aggregate_daily(&forecast.list, Local::now().date_naive());
        tracing::info!("Processed {} days of forecast", daily.len());

        Ok(WeatherReport { current, forecast: daily, fetched_at })
    }
}

#[derive(Debug, Deserialize)]
struct GeoCandidate {
    lat: f64,
    lon: f64,
    name: Option<String>,
    country: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    /// Kept raw so one bad sample cannot fail the whole response.
    #[serde(default)]
    list: Vec<serde_json::Value>,
}

/// Maps a non-2xx status left over after the session's retries to an error.
fn classify_status(
    endpoint: Endpoint,
    status: StatusCode,
    headers: &HeaderMap,
) -> Option<WeatherError> {
    if status.is_success() {
        return None;
    }

    let endpoint_name = endpoint.name().to_string();

    let err = if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = retry_after(headers);
        tracing::warn!("Rate limited, retry after {retry_after_secs} seconds");
        WeatherError::RateLimited { retry_after_secs, endpoint: endpoint_name }
    } else if status.is_server_error() {
        tracing::warn!("Service unavailable: {status}");
        WeatherError::ServiceUnavailable { status: status.as_u16(), endpoint: endpoint_name }
    } else if status == StatusCode::UNAUTHORIZED {
        tracing::warn!("Authentication failed - invalid API key");
        WeatherError::InvalidCredential(CredentialProblem::Rejected)
    } else {
        tracing::warn!("{} request failed with status {status}", endpoint.name());
        WeatherError::request_failed(&endpoint_name, RequestFailure::Status(status.as_u16()))
    };

    Some(err)
}

fn check_status(endpoint: Endpoint, response: Response) -> Result<Response> {
    match classify_status(endpoint, response.status(), response.headers()) {
        Some(err) => Err(err),
        None => Ok(response),
    }
}

fn retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

fn transport_error(endpoint: Endpoint, err: reqwest::Error) -> WeatherError {
    let cause = if err.is_timeout() {
        RequestFailure::Timeout
    } else if err.is_connect() {
        RequestFailure::Connection
    } else {
        RequestFailure::Transport(err.to_string())
    };

    tracing::warn!("{} request failed: {err}", endpoint.name());
    WeatherError::RequestFailed { endpoint: endpoint.name().to_string(), cause, source: Some(err) }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
