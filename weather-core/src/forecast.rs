//! Collapses the 3-hourly `/forecast` samples into per-day summaries.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::model::{ConditionEntry, DailyForecast};

/// Number of future days kept after aggregation.
pub const FORECAST_DAYS: usize = 3;

const UNKNOWN_CONDITION: &str = "unknown";

/// One raw forecast sample. Only the fields aggregation needs are decoded.
#[derive(Debug, Deserialize)]
struct ForecastSample {
    dt_txt: Option<String>,
    #[serde(default)]
    main: Option<SampleReadings>,
    #[serde(default)]
    weather: Vec<ConditionEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct SampleReadings {
    temp: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
}

#[derive(Debug)]
struct DayAccumulator {
    min: Option<f64>,
    max: Option<f64>,
    condition: String,
}

/// Groups `samples` by calendar date and returns at most [`FORECAST_DAYS`]
/// entries strictly after `today`, in ascending date order.
///
/// The condition for a day is the one attached to its first sample. Samples
/// that cannot be decoded or dated are skipped.
pub fn aggregate_daily(samples: &[Value], today: NaiveDate) -> Vec<DailyForecast> {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for (index, raw) in samples.iter().enumerate() {
        let sample = match ForecastSample::deserialize(raw) {
            Ok(sample) => sample,
            Err(err) => {
                tracing::warn!("Skipping malformed forecast item #{index}: {err}");
                continue;
            }
        };

        let Some(date) = sample.date() else {
            tracing::warn!("Skipping forecast item #{index}: no usable dt_txt");
            continue;
        };

        let readings = sample.main.unwrap_or_default();
        let min = readings.temp_min.or(readings.temp);
        let max = readings.temp_max.or(readings.temp);

        days.entry(date)
            .and_modify(|day| {
                day.min = merge(day.min, min, f64::min);
                day.max = merge(day.max, max, f64::max);
            })
            .or_insert_with(|| DayAccumulator {
                min,
                max,
                condition: sample
                    .weather
                    .first()
                    .and_then(|w| w.description.clone())
                    .unwrap_or_else(|| UNKNOWN_CONDITION.to_string()),
            });
    }

    let result: Vec<DailyForecast> = days
        .into_iter()
        .filter(|(date, _)| *date > today)
        .take(FORECAST_DAYS)
        .map(|(date, day)| DailyForecast {
            date,
            temp_min: day.min.map(round1),
            temp_max: day.max.map(round1),
            weather: capitalize(&day.condition),
        })
        .collect();

    tracing::debug!("Processed {} days of forecast from {} samples", result.len(), samples.len());
    result
}

impl ForecastSample {
    /// Date part of `dt_txt` (`"YYYY-MM-DD HH:MM:SS"`), in the provider's reference zone.
    fn date(&self) -> Option<NaiveDate> {
        let text = self.dt_txt.as_deref()?;
        let day = text.split_whitespace().next()?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }
}

fn merge(current: Option<f64>, sample: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (current, sample) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (None, b) => b,
        (a, None) => a,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date")
    }

    fn dt_txt(offset: u64, hour: u32) -> String {
        let date = today() + Days::new(offset);
        format!("{} {hour:02}:00:00", date.format("%Y-%m-%d"))
    }

    fn sample(offset: u64, hour: u32, min: f64, max: f64, desc: &str) -> Value {
        json!({
            "dt_txt": dt_txt(offset, hour),
            "main": { "temp": (min + max) / 2.0, "temp_min": min, "temp_max": max },
            "weather": [{ "description": desc }]
        })
    }

    #[test]
    fn merges_min_max_and_keeps_first_condition() {
        let samples = vec![sample(1, 9, 25.0, 30.0, "clouds"), sample(1, 12, 24.0, 31.0, "rain")];

        let days = aggregate_daily(&samples, today());

        assert_eq!(
            days,
            vec![DailyForecast {
                date: today() + Days::new(1),
                temp_min: Some(24.0),
                temp_max: Some(31.0),
                weather: "Clouds".to_string(),
            }]
        );
    }

    #[test]
    fn today_is_excluded_even_when_alone() {
        let samples = vec![sample(0, 12, 20.0, 25.0, "clear sky")];
        assert!(aggregate_daily(&samples, today()).is_empty());
    }

    #[test]
    fn past_dates_are_excluded() {
        let past = json!({
            "dt_txt": "2024-01-10 12:00:00",
            "main": { "temp": 10.0 },
            "weather": [{ "description": "mist" }]
        });
        let samples = vec![past, sample(2, 12, 20.0, 25.0, "clear sky")];

        let days = aggregate_daily(&samples, today());
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, today() + Days::new(2));
    }

    #[test]
    fn truncates_to_three_earliest_days() {
        let samples: Vec<Value> =
            (1..=5).rev().map(|d| sample(d, 12, 20.0, 25.0, "clear sky")).collect();

        let days = aggregate_daily(&samples, today());

        let dates: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![today() + Days::new(1), today() + Days::new(2), today() + Days::new(3)]
        );
    }

    #[test]
    fn point_temperature_fills_missing_min_max() {
        let samples = vec![
            json!({ "dt_txt": dt_txt(1, 0), "main": { "temp": 18.44 }, "weather": [] }),
            json!({ "dt_txt": dt_txt(1, 3), "main": { "temp": 21.06 } }),
        ];

        let days = aggregate_daily(&samples, today());

        assert_eq!(days[0].temp_min, Some(18.4));
        assert_eq!(days[0].temp_max, Some(21.1));
        assert_eq!(days[0].weather, "Unknown");
    }

    #[test]
    fn absent_temperatures_stay_absent() {
        let samples =
            vec![json!({ "dt_txt": dt_txt(1, 0), "weather": [{ "description": "fog" }] })];

        let days = aggregate_daily(&samples, today());

        assert_eq!(days[0].temp_min, None);
        assert_eq!(days[0].temp_max, None);
    }

    #[test]
    fn later_sample_fills_absent_running_values() {
        let samples = vec![
            json!({ "dt_txt": dt_txt(1, 0), "weather": [{ "description": "fog" }] }),
            sample(1, 3, 12.0, 14.0, "clear sky"),
        ];

        let days = aggregate_daily(&samples, today());

        assert_eq!(days[0].temp_min, Some(12.0));
        assert_eq!(days[0].temp_max, Some(14.0));
        assert_eq!(days[0].weather, "Fog");
    }

    #[test]
    fn malformed_samples_are_skipped() {
        let samples = vec![
            json!({ "main": { "temp": 20.0 }, "weather": [{ "description": "rain" }] }),
            json!({ "dt_txt": dt_txt(1, 6), "main": { "temp": "hot" } }),
            json!({ "dt_txt": "not a date", "main": { "temp": 20.0 } }),
            json!("garbage"),
            sample(1, 12, 20.0, 25.0, "light rain"),
        ];

        let days = aggregate_daily(&samples, today());

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].weather, "Light rain");
    }

    #[test]
    fn aggregation_is_deterministic() {
        let samples: Vec<Value> = (1..=4)
            .flat_map(|d| {
                [
                    sample(d, 0, 10.0 + d as f64, 15.0, "few clouds"),
                    sample(d, 12, 9.5, 19.25, "rain"),
                ]
            })
            .collect();

        let render = || serde_json::to_string(&aggregate_daily(&samples, today()));
        let first = render().expect("serializes");
        let second = render().expect("serializes");

        assert_eq!(first, second);
    }

    #[test]
    fn capitalize_only_touches_first_letter() {
        assert_eq!(capitalize("broken clouds"), "Broken clouds");
        assert_eq!(capitalize("overcast CLOUDS"), "Overcast CLOUDS");
        assert_eq!(capitalize(""), "");
    }
}
