//! # Taps & Volume Ledger
//!
//! Tap queries plus the authoritative volume accounting.
//!
//! ## Atomicity
//! Every volume mutation is a single `UPDATE ... RETURNING` statement, so the
//! read-modify-write of `volume` happens inside SQLite's write lock and concurrent
//! pours on the same tap cannot lose updates. Stop reports that carry a `report_id`
//! are recorded in `pour_reports` within the same transaction; a replayed id rolls
//! the decrement back and answers with the originally recorded outcome.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info, warn};

use super::db_sqlite::Database;
use crate::core::ledger::{absolute_volume, validate_duration, PourOutcome};
use crate::errors::{TapError, TapResult};
use crate::models::{NewTap, PourReceipt, Tap, TapInfo, TapUpdate};

const TAP_INFO_SQL: &str = "
    SELECT t.tap_id, b.name AS beer_name, b.abv AS beer_abv,
           t.volume, t.full_volume, t.flow_rate, b.image_path
    FROM taps t
    LEFT JOIN beers b ON t.beer_id = b.id
    WHERE t.tap_id = ?1";

const TAP_ROW_SQL: &str = "
    SELECT t.id, t.tap_id, t.beer_id, b.name AS beer_name,
           t.volume, t.full_volume, t.flow_rate
    FROM taps t
    LEFT JOIN beers b ON t.beer_id = b.id";

fn row_to_tap_info(row: &SqliteRow) -> Result<TapInfo, sqlx::Error> {
    Ok(TapInfo {
        tap_id: row.try_get("tap_id")?,
        beer_name: row.try_get("beer_name")?,
        beer_abv: row.try_get("beer_abv")?,
        volume: row.try_get("volume")?,
        full_volume: row.try_get("full_volume")?,
        flow_rate: row.try_get("flow_rate")?,
        image_path: row.try_get("image_path")?,
    })
}

fn row_to_tap(row: &SqliteRow) -> Result<Tap, sqlx::Error> {
    Ok(Tap {
        id: row.try_get("id")?,
        tap_id: row.try_get("tap_id")?,
        beer_id: row.try_get("beer_id")?,
        beer_name: row.try_get("beer_name")?,
        volume: row.try_get("volume")?,
        full_volume: row.try_get("full_volume")?,
        flow_rate: row.try_get("flow_rate")?,
    })
}

impl Database {
    /// Current beer and volume figures for a tap. Read-only.
    pub async fn get_tap(&self, tap_id: &str) -> TapResult<TapInfo> {
        let row = sqlx::query(TAP_INFO_SQL)
            .bind(tap_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row_to_tap_info(&row)?),
            None => Err(TapError::tap_not_found()),
        }
    }

    /// All taps with their beer names, ordered by external identifier.
    pub async fn list_taps(&self) -> TapResult<Vec<Tap>> {
        let sql = format!("{TAP_ROW_SQL} ORDER BY t.tap_id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_tap).collect::<Result<_, _>>()?)
    }

    /// One tap row by external identifier.
    pub async fn find_tap(&self, tap_id: &str) -> TapResult<Tap> {
        let sql = format!("{TAP_ROW_SQL} WHERE t.tap_id = ?1");
        let row = sqlx::query(&sql)
            .bind(tap_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row_to_tap(&row)?),
            None => Err(TapError::tap_not_found()),
        }
    }

    /// Adds a tap. The initial volume doubles as the full volume.
    pub async fn add_tap(&self, new_tap: NewTap) -> TapResult<Tap> {
        let new_tap = new_tap.validated()?;
        if let Some(beer_id) = new_tap.beer_id {
            self.get_beer(beer_id).await?;
        }

        let inserted = sqlx::query(
            "INSERT INTO taps (tap_id, beer_id, volume, full_volume, flow_rate)
             VALUES (?1, ?2, ?3, ?3, ?4)",
        )
        .bind(&new_tap.tap_id)
        .bind(new_tap.beer_id)
        .bind(new_tap.volume)
        .bind(new_tap.flow_rate)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(TapError::invalid("Tap ID already exists"));
            }
            Err(e) => return Err(e.into()),
        }
        info!(tap_id = %new_tap.tap_id, volume = new_tap.volume, "Tap added");
        self.find_tap(&new_tap.tap_id).await
    }

    /// Edits a tap's beer assignment, volumes and calibration.
    pub async fn edit_tap(&self, tap_id: &str, update: TapUpdate) -> TapResult<Tap> {
        let update = update.validated()?;
        if let Some(beer_id) = update.beer_id {
            self.get_beer(beer_id).await?;
        }

        let result = sqlx::query(
            "UPDATE taps SET beer_id = ?1, volume = ?2, full_volume = ?3, flow_rate = ?4
             WHERE tap_id = ?5",
        )
        .bind(update.beer_id)
        .bind(update.volume)
        .bind(update.full_volume)
        .bind(update.flow_rate)
        .bind(tap_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TapError::tap_not_found());
        }
        info!(tap_id, volume = update.volume, full_volume = update.full_volume, "Tap updated");
        self.find_tap(tap_id).await
    }

    /// Acknowledges a pour start. Nothing is accounted until the stop arrives; the
    /// tap only has to exist.
    pub async fn report_pour_start(&self, tap_id: &str) -> TapResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM taps WHERE tap_id = ?1")
            .bind(tap_id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => {
                debug!(tap_id, "Pour started");
                Ok(())
            }
            None => Err(TapError::tap_not_found()),
        }
    }

    /// Applies a finished pour: `volume -= duration * flow_rate`, clamped at zero.
    ///
    /// With a `report_id`, the pour is applied at most once.
    pub async fn report_pour(
        &self,
        tap_id: &str,
        duration_secs: f64,
        report_id: Option<&str>,
    ) -> TapResult<PourReceipt> {
        self.apply_pour(tap_id, duration_secs, report_id, "duration").await
    }

    /// `field` names the request field the duration came from, for error messages.
    async fn apply_pour(
        &self,
        tap_id: &str,
        duration_secs: f64,
        report_id: Option<&str>,
        field: &str,
    ) -> TapResult<PourReceipt> {
        let duration = validate_duration(duration_secs, field)?;
        let mut tx = self.pool.begin().await?;

        // --- Phase 1: decrement atomically ---
        let row = sqlx::query(
            "UPDATE taps SET volume = MAX(0.0, volume - (?1 * flow_rate))
             WHERE tap_id = ?2
             RETURNING volume, flow_rate",
        )
        .bind(duration)
        .bind(tap_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(TapError::tap_not_found());
        };
        let flow_rate: f64 = row.try_get("flow_rate")?;
        let volume_poured = duration * flow_rate;
        // A finite duration can still overflow once scaled by the flow rate.
        if !volume_poured.is_finite() {
            tx.rollback().await?;
            return Err(TapError::invalid(format!("Invalid {field}")));
        }
        let outcome = PourOutcome {
            volume_poured,
            new_volume: row.try_get("volume")?,
        };

        // --- Phase 2: record the report id, or undo a replay ---
        if let Some(report_id) = report_id {
            let recorded = sqlx::query(
                "INSERT INTO pour_reports (report_id, tap_id, duration, volume_poured, new_volume, reported_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(report_id) DO NOTHING",
            )
            .bind(report_id)
            .bind(tap_id)
            .bind(duration)
            .bind(outcome.volume_poured)
            .bind(outcome.new_volume)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if recorded == 0 {
                tx.rollback().await?;
                return self.replayed_report(tap_id, report_id).await;
            }
        }

        tx.commit().await?;
        info!(
            tap_id,
            duration,
            volume_poured = outcome.volume_poured,
            new_volume = outcome.new_volume,
            "Pour recorded"
        );
        Ok(PourReceipt {
            outcome,
            duplicate: false,
        })
    }

    async fn replayed_report(&self, tap_id: &str, report_id: &str) -> TapResult<PourReceipt> {
        let row = sqlx::query(
            "SELECT tap_id, volume_poured, new_volume FROM pour_reports WHERE report_id = ?1",
        )
        .bind(report_id)
        .fetch_one(&self.pool)
        .await?;

        let recorded_tap: String = row.try_get("tap_id")?;
        if recorded_tap != tap_id {
            warn!(tap_id, report_id, recorded_tap = %recorded_tap, "Report id reused across taps");
            return Err(TapError::invalid("report_id already used for another tap"));
        }
        warn!(tap_id, report_id, "Duplicate pour report ignored");
        Ok(PourReceipt {
            outcome: PourOutcome {
                volume_poured: row.try_get("volume_poured")?,
                new_volume: row.try_get("new_volume")?,
            },
            duplicate: true,
        })
    }

    /// Applies a pour measured directly as elapsed pour time. Same accounting as a
    /// stop report without a report id.
    pub async fn update_volume(&self, tap_id: &str, pour_time_secs: f64) -> TapResult<PourOutcome> {
        Ok(self
            .apply_pour(tap_id, pour_time_secs, None, "pour_time")
            .await?
            .outcome)
    }

    /// Overwrites the remaining volume, clamped at zero. No upper clamp.
    pub async fn set_volume_absolute(&self, tap_id: &str, volume: f64) -> TapResult<f64> {
        let volume = absolute_volume(volume)?;
        let new_volume: Option<f64> =
            sqlx::query_scalar("UPDATE taps SET volume = ?1 WHERE tap_id = ?2 RETURNING volume")
                .bind(volume)
                .bind(tap_id)
                .fetch_optional(&self.pool)
                .await?;
        match new_volume {
            Some(v) => {
                info!(tap_id, new_volume = v, "Volume set");
                Ok(v)
            }
            None => Err(TapError::tap_not_found()),
        }
    }
}
