//! Narrow interface to the reading store.
//!
//! The aggregation engine describes what it wants as a typed [`GroupSpec`]
//! and hands it to a [`ReadingStore`]; the SQL (or in-memory evaluation) is
//! an implementation detail behind this seam.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::models::Reading;
use crate::timeseries::window::TimeWindow;

/// Sort direction for `created_at` on range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A measurement column aggregations can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Temperature,
    Humidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregation {
    pub field: Field,
    pub reducer: Reducer,
}

impl Aggregation {
    pub const fn new(field: Field, reducer: Reducer) -> Self {
        Self { field, reducer }
    }
}

/// How rows inside the window are grouped before reducing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// One aggregate row over the whole window.
    All,
    /// Fixed-width time slices: a row lands in bucket
    /// `floor((created_at - start) / interval_ms)`, clamped to
    /// `points - 1` so the final partial slice folds into the last bucket.
    Bucket { interval_ms: i64, points: i64 },
}

/// Typed description of one aggregation query, in place of an ad-hoc
/// pipeline of stage maps.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub key: GroupKey,
    pub aggregations: Vec<Aggregation>,
}

/// One group produced by [`ReadingStore::aggregate`].
///
/// `values` is positionally aligned with the requested
/// [`GroupSpec::aggregations`]; a value is `None` when no row in the group
/// carried the aggregated field. `first_recorded_at` is the earliest
/// `created_at` in the group.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub bucket: Option<i64>,
    pub first_recorded_at: DateTime<Utc>,
    pub sample_count: i64,
    pub values: Vec<Option<f64>>,
}

/// Read-side access to the append-only reading collection.
///
/// Implementations must filter ranges half-open (`start <= created_at < end`)
/// and return aggregate rows sorted ascending by `first_recorded_at`.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Readings for one device, optionally bounded by `range`, sorted by
    /// `created_at` in `order`, optionally truncated to `limit` rows.
    async fn query(
        &self,
        device_id: Uuid,
        range: Option<&TimeWindow>,
        order: SortOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Reading>>;

    /// Grouped aggregates over the readings of one device inside `range`.
    /// A window with no qualifying rows yields an empty vec, never a row of
    /// nulls.
    async fn aggregate(
        &self,
        device_id: Uuid,
        range: &TimeWindow,
        spec: &GroupSpec,
    ) -> Result<Vec<AggregateRow>>;
}
