//! PostgreSQL implementation of the `SnapshotStore` trait.
//!
//! One row per (ticker, date) in `flow_snapshots`, contracts in
//! `option_details`. Capture writes run in a single transaction.

use analytics::{FlowMetrics, Sentiment, WeightingMode};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{Moneyness, OptionSide, Ticker};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, instrument, warn};

use crate::error::StorageError;
use crate::store::traits::SnapshotStore;
use crate::types::{market_date, OptionDetail, Snapshot, SnapshotId, SnapshotRecord};
use crate::Result;

const SNAPSHOT_COLUMNS: &str = "id, ticker, date, timestamp, spot_price, call_flow, put_flow, net_flow, \
     call_put_ratio, total_volume, call_volume, put_volume, total_options, call_options, \
     put_options, avg_iv, sentiment, weighting_mode";

/// PostgreSQL-backed snapshot store
#[derive(Debug, Clone)]
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    /// Connect with a pool of at most `max_connections`
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect to database: {}", e)))?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the snapshot tables if they do not exist
    pub async fn run_migrations(&self) -> Result<()> {
        let migration_sql = include_str!("../../migrations/001_flow_snapshots.sql");
        sqlx::raw_sql(migration_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(format!("Migration failed: {}", e)))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    async fn upsert_in(tx: &mut Transaction<'_, Postgres>, record: &SnapshotRecord) -> Result<SnapshotId> {
        let m = &record.metrics;
        let row = sqlx::query(
            r#"
            INSERT INTO flow_snapshots (
                ticker, date, timestamp, spot_price,
                call_flow, put_flow, net_flow, call_put_ratio,
                total_volume, call_volume, put_volume,
                total_options, call_options, put_options,
                avg_iv, sentiment, weighting_mode
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (ticker, date) DO UPDATE SET
                timestamp = EXCLUDED.timestamp,
                spot_price = EXCLUDED.spot_price,
                call_flow = EXCLUDED.call_flow,
                put_flow = EXCLUDED.put_flow,
                net_flow = EXCLUDED.net_flow,
                call_put_ratio = EXCLUDED.call_put_ratio,
                total_volume = EXCLUDED.total_volume,
                call_volume = EXCLUDED.call_volume,
                put_volume = EXCLUDED.put_volume,
                total_options = EXCLUDED.total_options,
                call_options = EXCLUDED.call_options,
                put_options = EXCLUDED.put_options,
                avg_iv = EXCLUDED.avg_iv,
                sentiment = EXCLUDED.sentiment,
                weighting_mode = EXCLUDED.weighting_mode
            RETURNING id
            "#,
        )
        .bind(record.ticker.as_str())
        .bind(record.date)
        .bind(record.timestamp)
        .bind(record.spot)
        .bind(m.call_flow)
        .bind(m.put_flow)
        .bind(m.net_flow)
        .bind(m.call_put_ratio)
        .bind(m.total_volume as i64)
        .bind(m.call_volume as i64)
        .bind(m.put_volume as i64)
        .bind(m.total_options as i64)
        .bind(m.call_options as i64)
        .bind(m.put_options as i64)
        .bind(m.avg_iv)
        .bind(m.sentiment.as_str())
        .bind(weighting_mode_str(m.weighting_mode))
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn replace_in(
        tx: &mut Transaction<'_, Postgres>,
        id: SnapshotId,
        details: &[OptionDetail],
    ) -> Result<usize> {
        sqlx::query("DELETE FROM option_details WHERE snapshot_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        for d in details {
            sqlx::query(
                r#"
                INSERT INTO option_details (
                    snapshot_id, option_symbol, strike, side, expiry, days_to_expiry,
                    last_price, volume, bid, ask, bid_volume, ask_volume,
                    iv, bs_theoretical, moneyness, weight, spot_price
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                "#,
            )
            .bind(id)
            .bind(&d.option_symbol)
            .bind(d.strike)
            .bind(d.side.as_str())
            .bind(d.expiry)
            .bind(d.days_to_expiry)
            .bind(d.last_price)
            .bind(d.volume as i64)
            .bind(d.bid)
            .bind(d.ask)
            .bind(d.bid_volume as i64)
            .bind(d.ask_volume as i64)
            .bind(d.iv)
            .bind(d.bs_theoretical)
            .bind(d.moneyness.as_str())
            .bind(d.weight)
            .bind(d.spot_price)
            .execute(&mut **tx)
            .await?;
        }
        Ok(details.len())
    }
}

fn weighting_mode_str(mode: WeightingMode) -> &'static str {
    match mode {
        WeightingMode::OpenInterest => "open_interest",
        WeightingMode::Volume => "volume",
        WeightingMode::Mixed => "mixed",
    }
}

fn parse_weighting_mode(s: &str) -> Result<WeightingMode> {
    match s {
        "open_interest" => Ok(WeightingMode::OpenInterest),
        "volume" => Ok(WeightingMode::Volume),
        "mixed" => Ok(WeightingMode::Mixed),
        other => Err(StorageError::Decode(format!("unknown weighting mode: {}", other))),
    }
}

fn decode<T: std::str::FromStr>(s: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    s.parse().map_err(|e: T::Err| StorageError::Decode(e.to_string()))
}

fn row_to_snapshot(row: &PgRow) -> Result<Snapshot> {
    let ticker: String = row.try_get("ticker")?;
    let sentiment: String = row.try_get("sentiment")?;
    let weighting_mode: String = row.try_get("weighting_mode")?;
    let count = |col: &str| -> Result<i64> { Ok(row.try_get::<i64, _>(col)?) };

    Ok(Snapshot {
        id: row.try_get("id")?,
        record: SnapshotRecord {
            ticker: decode::<Ticker>(&ticker)?,
            date: row.try_get("date")?,
            timestamp: row.try_get("timestamp")?,
            spot: row.try_get("spot_price")?,
            metrics: FlowMetrics {
                call_flow: row.try_get("call_flow")?,
                put_flow: row.try_get("put_flow")?,
                net_flow: row.try_get("net_flow")?,
                call_put_ratio: row.try_get("call_put_ratio")?,
                total_volume: count("total_volume")? as u64,
                call_volume: count("call_volume")? as u64,
                put_volume: count("put_volume")? as u64,
                total_options: count("total_options")? as usize,
                call_options: count("call_options")? as usize,
                put_options: count("put_options")? as usize,
                avg_iv: row.try_get("avg_iv")?,
                sentiment: decode::<Sentiment>(&sentiment)?,
                weighting_mode: parse_weighting_mode(&weighting_mode)?,
            },
        },
    })
}

fn row_to_detail(row: &PgRow) -> Result<OptionDetail> {
    let side: String = row.try_get("side")?;
    let moneyness: String = row.try_get("moneyness")?;
    Ok(OptionDetail {
        option_symbol: row.try_get("option_symbol")?,
        strike: row.try_get("strike")?,
        side: decode::<OptionSide>(&side)?,
        expiry: row.try_get("expiry")?,
        days_to_expiry: row.try_get("days_to_expiry")?,
        last_price: row.try_get("last_price")?,
        volume: row.try_get::<i64, _>("volume")? as u64,
        bid: row.try_get("bid")?,
        ask: row.try_get("ask")?,
        bid_volume: row.try_get::<i64, _>("bid_volume")? as u64,
        ask_volume: row.try_get::<i64, _>("ask_volume")? as u64,
        iv: row.try_get("iv")?,
        bs_theoretical: row.try_get("bs_theoretical")?,
        moneyness: decode::<Moneyness>(&moneyness)?,
        weight: row.try_get("weight")?,
        spot_price: row.try_get("spot_price")?,
    })
}

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn upsert_snapshot(&self, record: &SnapshotRecord) -> Result<SnapshotId> {
        let mut tx = self.pool.begin().await?;
        let id = Self::upsert_in(&mut tx, record).await?;
        tx.commit().await?;
        Ok(id)
    }

    #[instrument(skip(self, details), fields(rows = details.len()))]
    async fn replace_details(&self, id: SnapshotId, details: &[OptionDetail]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        match Self::replace_in(&mut tx, id, details).await {
            Ok(n) => {
                tx.commit().await?;
                Ok(n)
            }
            Err(e) => {
                drop(tx);
                warn!(snapshot_id = id, error = %e, "Detail replacement failed, clearing details");
                sqlx::query("DELETE FROM option_details WHERE snapshot_id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Err(e)
            }
        }
    }

    #[instrument(skip(self, record, details), fields(ticker = %record.ticker, rows = details.len()))]
    async fn save_capture(&self, record: &SnapshotRecord, details: &[OptionDetail]) -> Result<SnapshotId> {
        let mut tx = self.pool.begin().await?;

        let staged = async {
            let id = Self::upsert_in(&mut tx, record).await?;
            Self::replace_in(&mut tx, id, details).await?;
            Ok::<_, StorageError>(id)
        }
        .await;

        match staged {
            Ok(id) => {
                tx.commit()
                    .await
                    .map_err(|e| StorageError::Transaction(e.to_string()))?;
                Ok(id)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(StorageError::Transaction(e.to_string()))
            }
        }
    }

    async fn latest(&self, ticker: &Ticker) -> Result<Option<Snapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM flow_snapshots WHERE ticker = $1 ORDER BY date DESC, timestamp DESC LIMIT 1",
            SNAPSHOT_COLUMNS
        ))
        .bind(ticker.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_snapshot).transpose()
    }

    async fn history(&self, ticker: &Ticker, window_days: u32, limit: usize) -> Result<Vec<Snapshot>> {
        let cutoff = market_date(Utc::now()) - Duration::days(i64::from(window_days));
        let rows = sqlx::query(&format!(
            "SELECT {} FROM flow_snapshots WHERE ticker = $1 AND date >= $2 ORDER BY date DESC LIMIT $3",
            SNAPSHOT_COLUMNS
        ))
        .bind(ticker.as_str())
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_snapshot).collect()
    }

    async fn details(&self, id: SnapshotId) -> Result<Vec<OptionDetail>> {
        let exists = sqlx::query("SELECT 1 FROM flow_snapshots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(StorageError::NotFound(format!("snapshot {}", id)));
        }

        let rows = sqlx::query("SELECT * FROM option_details WHERE snapshot_id = $1 ORDER BY id")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_detail).collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
