use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    model::{Coordinates, GeoResult, WeatherReport},
};

pub mod openweather;

pub use openweather::{ClientConfig, OpenWeatherClient};

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// First geocoding match for `city` in the 2-letter `country`.
    async fn resolve_location(&self, city: &str, country: &str) -> Result<GeoResult>;

    /// Current conditions plus the daily forecast for a point.
    async fn fetch_weather(&self, latitude: f64, longitude: f64) -> Result<WeatherReport>;

    async fn resolve_coordinates(&self, city: &str, country: &str) -> Result<Coordinates> {
        self.resolve_location(city, country).await.map(|geo| geo.coordinates)
    }
}
