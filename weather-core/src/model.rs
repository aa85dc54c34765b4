use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WeatherError};

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(WeatherError::validation(
                "latitude",
                latitude,
                "Must be between -90 and 90.",
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(WeatherError::validation(
                "longitude",
                longitude,
                "Must be between -180 and 180.",
            ));
        }

        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// The first geocoding match for a city/country query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoResult {
    pub name: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub coordinates: Coordinates,
}

/// Current conditions as reported by `/data/2.5/weather`.
///
/// Every field is optional; consumers must cope with any of them missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub weather: Vec<ConditionEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<MainReadings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sys: Option<SysInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clouds: Option<Clouds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dt: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainReadings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wind {
    /// Metres per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Degrees, meteorological.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SysInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunset: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clouds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<f64>,
}

impl CurrentConditions {
    pub fn temperature(&self) -> Option<f64> {
        self.main.as_ref().and_then(|m| m.temp)
    }

    pub fn feels_like(&self) -> Option<f64> {
        self.main.as_ref().and_then(|m| m.feels_like)
    }

    pub fn humidity(&self) -> Option<f64> {
        self.main.as_ref().and_then(|m| m.humidity)
    }

    pub fn pressure(&self) -> Option<f64> {
        self.main.as_ref().and_then(|m| m.pressure)
    }

    pub fn wind_speed(&self) -> Option<f64> {
        self.wind.as_ref().and_then(|w| w.speed)
    }

    pub fn wind_direction(&self) -> Option<f64> {
        self.wind.as_ref().and_then(|w| w.deg)
    }

    /// Description of the first reported condition.
    pub fn description(&self) -> Option<&str> {
        self.weather.first().and_then(|w| w.description.as_deref())
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.dt.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    /// `"Name, CC"`, `"Name"`, or `None` when the provider sent no name.
    pub fn location_label(&self) -> Option<String> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        match self.sys.as_ref().and_then(|s| s.country.as_deref()) {
            Some(country) if !country.is_empty() => Some(format!("{name}, {country}")),
            _ => Some(name.to_string()),
        }
    }
}

/// One future calendar day collapsed from the 3-hourly forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub weather: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    pub forecast: Vec<DailyForecast>,
    pub fetched_at: DateTime<Utc>,
}

/// Display unit system. Data is always fetched in metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial]
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: metric, imperial."
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_accept_bounds() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
        assert!(Coordinates::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn coordinates_reject_out_of_range() {
        for (lat, lon) in [(90.1, 0.0), (-91.0, 0.0), (0.0, 180.5), (0.0, -200.0), (f64::NAN, 0.0)]
        {
            let err = Coordinates::new(lat, lon).unwrap_err();
            assert!(matches!(err, WeatherError::Validation { .. }), "{lat}, {lon}");
        }
    }

    #[test]
    fn current_conditions_tolerate_empty_object() {
        let current: CurrentConditions = serde_json::from_str("{}").expect("empty object parses");

        assert_eq!(current.temperature(), None);
        assert_eq!(current.description(), None);
        assert_eq!(current.location_label(), None);
    }

    #[test]
    fn current_conditions_accessors() {
        let current: CurrentConditions = serde_json::from_value(serde_json::json!({
            "name": "Puchong",
            "sys": { "country": "MY" },
            "weather": [{ "main": "Clouds", "description": "broken clouds" }],
            "main": { "temp": 28.5, "humidity": 75, "pressure": 1012 },
            "wind": { "speed": 2.57, "deg": 310 }
        }))
        .expect("sample parses");

        assert_eq!(current.temperature(), Some(28.5));
        assert_eq!(current.humidity(), Some(75.0));
        assert_eq!(current.wind_direction(), Some(310.0));
        assert_eq!(current.description(), Some("broken clouds"));
        assert_eq!(current.location_label().as_deref(), Some("Puchong, MY"));
    }

    #[test]
    fn units_parse_roundtrip() {
        for units in Units::all() {
            let parsed: Units = units.as_str().parse().expect("roundtrip should succeed");
            assert_eq!(*units, parsed);
        }
        assert!("kelvin".parse::<Units>().is_err());
    }

    #[test]
    fn daily_forecast_serializes_iso_date() {
        let day = DailyForecast {
            date: NaiveDate::from_ymd_opt(2024, 1, 16).expect("valid date"),
            temp_min: Some(24.0),
            temp_max: None,
            weather: "Clouds".into(),
        };

        let json = serde_json::to_value(&day).expect("serializes");
        assert_eq!(json["date"], "2024-01-16");
        assert_eq!(json["temp_min"], 24.0);
        assert!(json["temp_max"].is_null());
    }
}
