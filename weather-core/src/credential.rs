use std::fmt;

use crate::error::{CredentialProblem, Result, WeatherError};

/// Environment variable consulted by the CLI when no key is passed explicitly.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Keys shorter than this are rejected locally, before any request is made.
pub const MIN_API_KEY_LEN: usize = 10;

/// An OpenWeatherMap API key that passed the local format check.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let key = raw.map(str::trim).unwrap_or_default();

        if key.is_empty() {
            tracing::debug!("no API key provided");
            return Err(WeatherError::InvalidCredential(CredentialProblem::Missing));
        }

        if key.chars().count() < MIN_API_KEY_LEN {
            tracing::debug!("API key too short: {}", mask(key));
            return Err(WeatherError::InvalidCredential(CredentialProblem::Malformed));
        }

        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First 8 characters followed by `...`, safe for logs.
    pub fn masked(&self) -> String {
        mask(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

fn mask(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}...")
}
