use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::db::models::Reading;
use crate::store::{Aggregation, Field, GroupKey, GroupSpec, ReadingStore, Reducer, SortOrder};
use crate::timeseries::round1;
use crate::timeseries::window::TimeWindow;

/// Fallback sample count for the trend, batch and timeseries endpoints.
pub const DEFAULT_SERIES_LIMIT: i64 = 24;
/// Fallback target point count for the graph endpoint.
pub const DEFAULT_GRAPH_POINTS: i64 = 24;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The query executed but matched zero readings.
    #[error("no readings matched the query")]
    NoData,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Emission order for the recent-sample series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOrder {
    /// Oldest first. The store returns newest-first, so this reverses.
    Chronological,
    /// Store order: newest first.
    NewestFirst,
}

/// One reduced sample of the recent-series queries.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub created_at: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl From<Reading> for TrendPoint {
    fn from(r: Reading) -> Self {
        Self {
            created_at: r.created_at,
            temperature: r.temperature,
            humidity: r.humidity,
        }
    }
}

/// Scalar statistics over one resolved window, unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub sample_count: i64,
    pub avg_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
}

/// One averaged bucket of the graph query. `timestamp` is the earliest
/// reading in the bucket; averages are rounded to one decimal.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPoint {
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Transforms the raw reading stream into the bounded views the API serves.
/// Holds no state beyond the store handle; every operation is scoped to a
/// single already-resolved device id.
#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn ReadingStore>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// Every reading for the device, newest first.
    pub async fn raw_history(&self, device_id: Uuid) -> Result<Vec<Reading>, EngineError> {
        let rows = self
            .store
            .query(device_id, None, SortOrder::Descending, None)
            .await?;
        if rows.is_empty() {
            return Err(EngineError::NoData);
        }
        Ok(rows)
    }

    /// Avg/min/max of temperature and humidity over `window`, as a single
    /// aggregate row computed by the store.
    pub async fn window_summary(
        &self,
        device_id: Uuid,
        window: &TimeWindow,
    ) -> Result<WindowSummary, EngineError> {
        let spec = GroupSpec {
            key: GroupKey::All,
            aggregations: vec![
                Aggregation::new(Field::Temperature, Reducer::Avg),
                Aggregation::new(Field::Temperature, Reducer::Min),
                Aggregation::new(Field::Temperature, Reducer::Max),
                Aggregation::new(Field::Humidity, Reducer::Avg),
                Aggregation::new(Field::Humidity, Reducer::Min),
                Aggregation::new(Field::Humidity, Reducer::Max),
            ],
        };

        let rows = self.store.aggregate(device_id, window, &spec).await?;
        let row = rows.into_iter().next().ok_or(EngineError::NoData)?;
        let value = |i: usize| row.values.get(i).copied().flatten();

        Ok(WindowSummary {
            sample_count: row.sample_count,
            avg_temperature: value(0),
            min_temperature: value(1),
            max_temperature: value(2),
            avg_humidity: value(3),
            min_humidity: value(4),
            max_humidity: value(5),
        })
    }

    /// The most recent `limit` readings (default 24), reduced to trend
    /// points. `SeriesOrder::Chronological` reverses the store's
    /// newest-first order so consumers see oldest first.
    pub async fn recent_series(
        &self,
        device_id: Uuid,
        limit: Option<i64>,
        order: SeriesOrder,
    ) -> Result<Vec<TrendPoint>, EngineError> {
        let limit = limit.unwrap_or(DEFAULT_SERIES_LIMIT).max(1);
        debug!(device_id = %device_id, limit, "fetching recent series");

        let mut rows = self
            .store
            .query(device_id, None, SortOrder::Descending, Some(limit))
            .await?;
        if rows.is_empty() {
            return Err(EngineError::NoData);
        }
        if order == SeriesOrder::Chronological {
            rows.reverse();
        }
        Ok(rows.into_iter().map(TrendPoint::from).collect())
    }

    /// Bucketed averages spanning `window`: the window is cut into `points`
    /// slices of `floor(width / points)` ms, each nonempty slice averages to
    /// one output point stamped with its earliest reading. Empty slices are
    /// omitted.
    pub async fn graph_series(
        &self,
        device_id: Uuid,
        window: &TimeWindow,
        points: i64,
    ) -> Result<Vec<GraphPoint>, EngineError> {
        let points = points.max(1);
        let interval_ms = (window.width_ms() / points).max(1);
        let spec = GroupSpec {
            key: GroupKey::Bucket { interval_ms, points },
            aggregations: vec![
                Aggregation::new(Field::Temperature, Reducer::Avg),
                Aggregation::new(Field::Humidity, Reducer::Avg),
            ],
        };

        let rows = self.store.aggregate(device_id, window, &spec).await?;
        if rows.is_empty() {
            return Err(EngineError::NoData);
        }

        let mut series: Vec<GraphPoint> = rows
            .into_iter()
            .map(|row| GraphPoint {
                timestamp: row.first_recorded_at,
                temperature: row.values.first().copied().flatten().map(round1),
                humidity: row.values.get(1).copied().flatten().map(round1),
            })
            .collect();
        // The store already orders groups, but the emission contract is ours.
        series.sort_by_key(|p| p.timestamp);
        Ok(series)
    }
}
