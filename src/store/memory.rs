//! In-memory [`ReadingStore`] used by unit and handler tests. Evaluates the
//! same half-open range, grouping and clamping semantics as the Postgres
//! implementation.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::Reading;
use crate::timeseries::window::TimeWindow;

use super::{AggregateRow, Field, GroupKey, GroupSpec, ReadingStore, Reducer, SortOrder};

#[derive(Clone, Default)]
pub struct MemoryReadingStore {
    readings: Arc<RwLock<Vec<Reading>>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, reading: Reading) {
        self.readings.write().await.push(reading);
    }

    pub async fn insert_all(&self, readings: impl IntoIterator<Item = Reading>) {
        self.readings.write().await.extend(readings);
    }
}

fn field_value(reading: &Reading, field: Field) -> Option<f64> {
    match field {
        Field::Temperature => reading.temperature,
        Field::Humidity => reading.humidity,
    }
}

fn reduce(values: &[f64], reducer: Reducer) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(match reducer {
        Reducer::Avg => values.iter().sum::<f64>() / values.len() as f64,
        Reducer::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Reducer::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn query(
        &self,
        device_id: Uuid,
        range: Option<&TimeWindow>,
        order: SortOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Reading>> {
        let mut rows: Vec<Reading> = self
            .readings
            .read()
            .await
            .iter()
            .filter(|r| r.device_id == device_id)
            .filter(|r| range.map_or(true, |w| w.contains(r.created_at)))
            .cloned()
            .collect();

        rows.sort_by_key(|r| r.created_at);
        if order == SortOrder::Descending {
            rows.reverse();
        }
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn aggregate(
        &self,
        device_id: Uuid,
        range: &TimeWindow,
        spec: &GroupSpec,
    ) -> Result<Vec<AggregateRow>> {
        let in_window: Vec<Reading> = self
            .readings
            .read()
            .await
            .iter()
            .filter(|r| r.device_id == device_id && range.contains(r.created_at))
            .cloned()
            .collect();

        if in_window.is_empty() {
            return Ok(Vec::new());
        }

        let mut groups: Vec<(Option<i64>, Vec<Reading>)> = Vec::new();
        match spec.key {
            GroupKey::All => groups.push((None, in_window)),
            GroupKey::Bucket { interval_ms, points } => {
                for reading in in_window {
                    let offset_ms = (reading.created_at - range.start).num_milliseconds();
                    let bucket = (offset_ms / interval_ms).min(points - 1);
                    match groups.iter_mut().find(|(b, _)| *b == Some(bucket)) {
                        Some((_, members)) => members.push(reading),
                        None => groups.push((Some(bucket), vec![reading])),
                    }
                }
            }
        }

        let mut rows: Vec<AggregateRow> = groups
            .into_iter()
            .map(|(bucket, members)| {
                let first_recorded_at =
                    members.iter().map(|r| r.created_at).min().expect("nonempty group");
                let values = spec
                    .aggregations
                    .iter()
                    .map(|agg| {
                        let present: Vec<f64> = members
                            .iter()
                            .filter_map(|r| field_value(r, agg.field))
                            .collect();
                        reduce(&present, agg.reducer)
                    })
                    .collect();
                AggregateRow {
                    bucket,
                    first_recorded_at,
                    sample_count: members.len() as i64,
                    values,
                }
            })
            .collect();

        rows.sort_by_key(|r| r.first_recorded_at);
        Ok(rows)
    }
}
