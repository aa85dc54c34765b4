//! Plain-text and JSON rendering of a [`WeatherReport`].

use chrono::NaiveDate;
use weather_core::{CurrentConditions, DailyForecast, Units, WeatherReport};

const MPS_TO_KMH: f64 = 3.6;
const MPS_TO_MPH: f64 = 2.237;

#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    units: Units,
}

impl Formatter {
    pub fn new(units: Units) -> Self {
        Self { units }
    }

    fn temp_unit(&self) -> &'static str {
        match self.units {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    /// `celsius` converted to the display unit, one decimal.
    fn temperature(&self, celsius: f64) -> String {
        let value = match self.units {
            Units::Metric => celsius,
            Units::Imperial => celsius * 9.0 / 5.0 + 32.0,
        };
        format!("{}{}", round1(value), self.temp_unit())
    }

    fn wind_speed(&self, mps: f64) -> String {
        match self.units {
            Units::Metric => format!("{} km/h", round1(mps * MPS_TO_KMH)),
            Units::Imperial => format!("{} mph", round1(mps * MPS_TO_MPH)),
        }
    }

    fn condition(current: &CurrentConditions) -> String {
        current.description().map(capitalize).unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn current(&self, current: &CurrentConditions) -> String {
        let temp = current
            .temperature()
            .map(|t| self.temperature(t))
            .unwrap_or_else(|| "N/A".to_string());

        let mut lines = vec![format!("Current: {temp} - {}", Self::condition(current))];

        let mut details = Vec::new();
        if let Some(humidity) = current.humidity() {
            details.push(format!("Humidity: {humidity:.0}%"));
        }
        if let Some(speed) = current.wind_speed() {
            details.push(format!("Wind: {}", self.wind_speed(speed)));
        }
        if let Some(pressure) = current.pressure() {
            details.push(format!("Pressure: {pressure:.0}hPa"));
        }
        if !details.is_empty() {
            lines.push(format!("  {}", details.join(" | ")));
        }

        lines.join("\n")
    }

    fn temp_range(&self, day: &DailyForecast) -> String {
        match (day.temp_min, day.temp_max) {
            (Some(min), Some(max)) => {
                format!("{} - {}", self.temperature(min), self.temperature(max))
            }
            (Some(only), None) | (None, Some(only)) => self.temperature(only),
            (None, None) => "No temp data".to_string(),
        }
    }

    pub fn forecast(&self, days: &[DailyForecast]) -> String {
        if days.is_empty() {
            return "No forecast data available".to_string();
        }

        let mut lines = vec!["Forecast:".to_string()];
        for day in days {
            let range = self.temp_range(day);
            lines.push(format!("{}: {range} | {}", format_date(day.date), day.weather));
        }
        lines.join("\n")
    }

    /// Location header, current conditions with extra details, and the forecast.
    pub fn summary(&self, report: &WeatherReport) -> String {
        let current = &report.current;
        let mut sections = Vec::new();

        if let Some(location) = current.location_label() {
            sections.push(format!("Location: {location}"));
        }
        sections.push(self.current(current));

        let mut extra = Vec::new();
        if let Some(feels) = current.feels_like() {
            extra.push(format!("Feels like: {}", self.temperature(feels)));
        }
        if let Some(deg) = current.wind_direction() {
            extra.push(format!("Wind from: {} ({deg:.0}°)", compass_point(deg)));
        }
        if let Some(observed) = current.observed_at() {
            extra.push(format!("Observed: {}", observed.format("%Y-%m-%d %H:%M UTC")));
        }
        if !extra.is_empty() {
            sections.push(format!("  {}", extra.join(" | ")));
        }

        if !report.forecast.is_empty() {
            sections.push(String::new());
            sections.push(self.forecast(&report.forecast));
        }

        sections.join("\n")
    }

    pub fn table(&self, days: &[DailyForecast]) -> String {
        if days.is_empty() {
            return "No forecast data".to_string();
        }

        let rule = "-".repeat(50);
        let mut lines = vec![
            rule.clone(),
            format!("{:<12} {:<15} {:<20}", "Date", "Weather", "Temp Range"),
            rule.clone(),
        ];

        for day in days {
            let weather: String = day.weather.chars().take(14).collect();
            let range = match (day.temp_min, day.temp_max) {
                (Some(min), Some(max)) => {
                    format!("{}-{}", self.temperature(min), self.temperature(max))
                }
                _ => "N/A".to_string(),
            };
            lines.push(format!("{:<12} {:<15} {:<20}", format_date(day.date), weather, range));
        }

        lines.push(rule);
        lines.join("\n")
    }

    /// The report as fetched, in metric units.
    pub fn json(report: &WeatherReport) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `Wed 15 Jan`
fn format_date(date: NaiveDate) -> String {
    date.format("%a %d %b").to_string()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn compass_point(degrees: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let index = ((degrees.rem_euclid(360.0) + 22.5) / 45.0) as usize % POINTS.len();
    POINTS[index]
}
