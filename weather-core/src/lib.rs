//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - The error taxonomy shared by every operation
//! - A retrying HTTP session and the OpenWeatherMap client built on it
//! - Aggregation of the 3-hourly forecast into daily summaries
//! - Shared domain models and on-disk configuration
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod credential;
pub mod error;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod session;

pub use config::Config;
pub use credential::{API_KEY_ENV, ApiKey};
pub use error::{CredentialProblem, RequestFailure, WeatherError};
pub use model::{Coordinates, CurrentConditions, DailyForecast, GeoResult, Units, WeatherReport};
pub use provider::{ClientConfig, OpenWeatherClient, WeatherProvider};
pub use session::RetryPolicy;
