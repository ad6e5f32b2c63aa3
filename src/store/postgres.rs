use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::db::models::Reading;
use crate::timeseries::window::TimeWindow;

use super::{AggregateRow, Field, GroupKey, GroupSpec, ReadingStore, Reducer, SortOrder};

/// Postgres-backed [`ReadingStore`] over the `readings` table.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn query(
        &self,
        device_id: Uuid,
        range: Option<&TimeWindow>,
        order: SortOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Reading>> {
        let direction = match order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let sql = format!(
            "SELECT id, device_id, temperature, humidity, latitude, longitude, created_at \
             FROM readings \
             WHERE device_id = $1 \
               AND ($2::timestamptz IS NULL OR created_at >= $2) \
               AND ($3::timestamptz IS NULL OR created_at < $3) \
             ORDER BY created_at {direction} \
             LIMIT $4"
        );

        let rows = sqlx::query_as::<_, Reading>(&sql)
            .bind(device_id)
            .bind(range.map(|r| r.start))
            .bind(range.map(|r| r.end))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("reading range query failed")?;

        Ok(rows)
    }

    async fn aggregate(
        &self,
        device_id: Uuid,
        range: &TimeWindow,
        spec: &GroupSpec,
    ) -> Result<Vec<AggregateRow>> {
        let sql = build_aggregate_sql(spec);
        debug!(device_id = %device_id, sql = %sql, "running aggregate query");

        let mut query = sqlx::query(&sql)
            .bind(device_id)
            .bind(range.start)
            .bind(range.end);
        if let GroupKey::Bucket { interval_ms, points } = spec.key {
            query = query.bind(interval_ms).bind(points);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("aggregate query failed")?;

        rows.into_iter()
            .map(|row| {
                let mut values = Vec::with_capacity(spec.aggregations.len());
                for i in 0..spec.aggregations.len() {
                    values.push(row.try_get::<Option<f64>, _>(format!("v{i}").as_str())?);
                }
                Ok(AggregateRow {
                    bucket: row.try_get("bucket")?,
                    first_recorded_at: row.try_get("first_recorded_at")?,
                    sample_count: row.try_get("sample_count")?,
                    values,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .context("failed to decode aggregate row")
    }
}

/// Render a [`GroupSpec`] as one SQL statement.
///
/// Binds: `$1` device id, `$2` window start, `$3` window end, and for the
/// bucketed key additionally `$4` interval in ms and `$5` target point count.
/// Every SQL fragment comes from the typed spec, never from caller input.
fn build_aggregate_sql(spec: &GroupSpec) -> String {
    let mut select = Vec::with_capacity(spec.aggregations.len() + 3);

    let bucket_expr = match spec.key {
        GroupKey::All => "NULL::bigint AS bucket".to_owned(),
        GroupKey::Bucket { .. } => {
            // Clamp so the floor remainder of the window lands in the last
            // bucket instead of spilling into an index >= points.
            "LEAST(floor(extract(epoch FROM (created_at - $2)) * 1000.0 / $4)::bigint, $5 - 1) \
             AS bucket"
                .to_owned()
        }
    };
    select.push(bucket_expr);
    select.push("MIN(created_at) AS first_recorded_at".to_owned());
    select.push("COUNT(*) AS sample_count".to_owned());

    for (i, agg) in spec.aggregations.iter().enumerate() {
        let reducer = match agg.reducer {
            Reducer::Avg => "AVG",
            Reducer::Min => "MIN",
            Reducer::Max => "MAX",
        };
        let field = match agg.field {
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
        };
        select.push(format!("{reducer}({field}) AS v{i}"));
    }

    let tail = match spec.key {
        GroupKey::All => "HAVING COUNT(*) > 0",
        GroupKey::Bucket { .. } => "GROUP BY 1 ORDER BY MIN(created_at) ASC",
    };

    format!(
        "SELECT {} FROM readings \
         WHERE device_id = $1 AND created_at >= $2 AND created_at < $3 {}",
        select.join(", "),
        tail
    )
}
