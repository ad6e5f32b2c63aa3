//! Pure reshaping of an already-aggregated series into the two client
//! encodings. No store access happens here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::timeseries::engine::TrendPoint;
use crate::timeseries::round1;

/// Output encoding of the timeseries endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesFormat {
    #[default]
    Simple,
    Chart,
}

impl SeriesFormat {
    /// Only the literal `chart` selects the chart encoding; anything else,
    /// including an absent parameter, renders the tabular form.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        match s {
            Some("chart") => Self::Chart,
            _ => Self::Simple,
        }
    }
}

/// Descriptive statistics over the rounded series. Averages are rounded to
/// one decimal; min/max are taken from the already-rounded values.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStatistics {
    pub avg_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
}

/// One row of the tabular encoding.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    /// Zero-padded 24-hour `HH:MM` rendering of `timestamp` (UTC), fixed
    /// rather than host-locale dependent so output is deterministic across
    /// deployments.
    pub time: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SimpleSeries {
    pub data: Vec<SeriesPoint>,
    pub statistics: SeriesStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartDatasets {
    pub temperature: Vec<Option<f64>>,
    pub humidity: Vec<Option<f64>>,
}

/// Parallel-array encoding for chart consumers: `labels[i]` annotates
/// `datasets.temperature[i]` and `datasets.humidity[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: ChartDatasets,
    pub statistics: SeriesStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ShapedSeries {
    Simple(SimpleSeries),
    Chart(ChartSeries),
}

fn short_time(ts: DateTime<Utc>) -> String {
    ts.format("%H:%M").to_string()
}

fn stat<'a>(
    values: impl Iterator<Item = &'a Option<f64>>,
) -> (Option<f64>, Option<f64>, Option<f64>) {
    let present: Vec<f64> = values.filter_map(|v| *v).collect();
    if present.is_empty() {
        return (None, None, None);
    }
    let avg = round1(present.iter().sum::<f64>() / present.len() as f64);
    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (Some(avg), Some(min), Some(max))
}

/// Reformat an ascending series of trend points into `format`, attaching
/// statistics derived from the rounded values.
pub fn shape_series(points: &[TrendPoint], format: SeriesFormat) -> ShapedSeries {
    let rounded: Vec<SeriesPoint> = points
        .iter()
        .map(|p| SeriesPoint {
            timestamp: p.created_at,
            time: short_time(p.created_at),
            temperature: p.temperature.map(round1),
            humidity: p.humidity.map(round1),
        })
        .collect();

    let (avg_temperature, min_temperature, max_temperature) =
        stat(rounded.iter().map(|p| &p.temperature));
    let (avg_humidity, min_humidity, max_humidity) = stat(rounded.iter().map(|p| &p.humidity));
    let statistics = SeriesStatistics {
        avg_temperature,
        min_temperature,
        max_temperature,
        avg_humidity,
        min_humidity,
        max_humidity,
    };

    match format {
        SeriesFormat::Simple => ShapedSeries::Simple(SimpleSeries {
            data: rounded,
            statistics,
        }),
        SeriesFormat::Chart => ShapedSeries::Chart(ChartSeries {
            labels: rounded.iter().map(|p| p.time.clone()).collect(),
            datasets: ChartDatasets {
                temperature: rounded.iter().map(|p| p.temperature).collect(),
                humidity: rounded.iter().map(|p| p.humidity).collect(),
            },
            statistics,
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn point(at: DateTime<Utc>, temperature: Option<f64>, humidity: Option<f64>) -> TrendPoint {
        TrendPoint {
            created_at: at,
            temperature,
            humidity,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    #[test]
    fn format_parse_is_lenient() {
        assert_eq!(SeriesFormat::parse_lenient(None), SeriesFormat::Simple);
        assert_eq!(SeriesFormat::parse_lenient(Some("simple")), SeriesFormat::Simple);
        assert_eq!(SeriesFormat::parse_lenient(Some("table")), SeriesFormat::Simple);
        assert_eq!(SeriesFormat::parse_lenient(Some("chart")), SeriesFormat::Chart);
    }

    #[test]
    fn labels_are_zero_padded_24h() {
        let series = shape_series(
            &[point(at(7, 5), Some(20.0), None)],
            SeriesFormat::Chart,
        );
        let ShapedSeries::Chart(chart) = series else {
            panic!("expected chart encoding");
        };
        assert_eq!(chart.labels, vec!["07:05".to_owned()]);
    }

    #[test]
    fn values_round_to_exactly_one_decimal() {
        let series = shape_series(
            &[point(at(10, 0), Some(21.449), Some(60.25))],
            SeriesFormat::Simple,
        );
        let ShapedSeries::Simple(simple) = series else {
            panic!("expected simple encoding");
        };
        assert_eq!(simple.data[0].temperature, Some(21.4));
        assert_eq!(simple.data[0].humidity, Some(60.3));
    }

    #[test]
    fn statistics_derive_from_rounded_values() {
        // 19.96 rounds to 20.0, so the minimum must be 20.0, not 19.96.
        let series = shape_series(
            &[
                point(at(10, 0), Some(19.96), None),
                point(at(10, 10), Some(22.04), None),
            ],
            SeriesFormat::Simple,
        );
        let ShapedSeries::Simple(simple) = series else {
            panic!("expected simple encoding");
        };
        assert_eq!(simple.statistics.min_temperature, Some(20.0));
        assert_eq!(simple.statistics.max_temperature, Some(22.0));
        assert_eq!(simple.statistics.avg_temperature, Some(21.0));
        assert_eq!(simple.statistics.avg_humidity, None);
    }

    #[test]
    fn chart_arrays_stay_parallel_and_ascending() {
        let series = shape_series(
            &[
                point(at(9, 0), Some(18.5), Some(60.2)),
                point(at(9, 30), Some(19.1), Some(58.7)),
            ],
            SeriesFormat::Chart,
        );
        let ShapedSeries::Chart(chart) = series else {
            panic!("expected chart encoding");
        };
        assert_eq!(chart.labels.len(), 2);
        assert_eq!(chart.datasets.temperature, vec![Some(18.5), Some(19.1)]);
        assert_eq!(chart.datasets.humidity, vec![Some(60.2), Some(58.7)]);
    }

    #[test]
    fn missing_fields_keep_array_alignment() {
        let series = shape_series(
            &[
                point(at(9, 0), Some(18.5), None),
                point(at(9, 30), None, Some(58.7)),
            ],
            SeriesFormat::Chart,
        );
        let ShapedSeries::Chart(chart) = series else {
            panic!("expected chart encoding");
        };
        assert_eq!(chart.datasets.temperature, vec![Some(18.5), None]);
        assert_eq!(chart.datasets.humidity, vec![None, Some(58.7)]);
    }

    #[test]
    fn untagged_encoding_has_no_wrapper_key() {
        let simple = serde_json::to_value(shape_series(
            &[point(at(8, 0), Some(20.0), Some(50.0))],
            SeriesFormat::Simple,
        ))
        .unwrap();
        assert!(simple.get("data").is_some());
        assert!(simple.get("statistics").is_some());

        let chart = serde_json::to_value(shape_series(
            &[point(at(8, 0), Some(20.0), Some(50.0))],
            SeriesFormat::Chart,
        ))
        .unwrap();
        assert!(chart.get("labels").is_some());
        assert!(chart.get("datasets").is_some());
    }
}
