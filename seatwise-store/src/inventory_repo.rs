use async_trait::async_trait;
use chrono::NaiveDate;
use seatwise_core::inventory::lock_order;
use seatwise_core::{
    ClassType, InventoryKey, InventoryRepository, ReservationOutcome, SeatInventory, SeatRequest,
    StoreResult,
};
use sqlx::{postgres::PgRow, Row};
use tracing::debug;
use uuid::Uuid;

use crate::catalog_repo::{parse_class, PostgresStore};
use crate::database::map_db_error;

fn row_to_inventory(row: &PgRow) -> StoreResult<SeatInventory> {
    let class_type: String = row.try_get("class_type").map_err(map_db_error)?;
    Ok(SeatInventory {
        key: InventoryKey {
            schedule_id: row.try_get("schedule_id").map_err(map_db_error)?,
            flight_date: row.try_get("flight_date").map_err(map_db_error)?,
            class_type: parse_class(&class_type)?,
        },
        available_seats: row.try_get("available_seats").map_err(map_db_error)?,
    })
}

#[async_trait]
impl InventoryRepository for PostgresStore {
    async fn inventory_rows(
        &self,
        schedule_ids: &[Uuid],
        flight_date: NaiveDate,
        class_type: ClassType,
    ) -> StoreResult<Vec<SeatInventory>> {
        if schedule_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT schedule_id, flight_date, class_type, available_seats
            FROM seat_inventory
            WHERE schedule_id = ANY($1) AND flight_date = $2 AND class_type = $3
            "#,
        )
        .bind(schedule_ids)
        .bind(flight_date)
        .bind(class_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.iter().map(row_to_inventory).collect()
    }

    async fn inventory_row(&self, key: &InventoryKey) -> StoreResult<Option<SeatInventory>> {
        let row = sqlx::query(
            r#"
            SELECT schedule_id, flight_date, class_type, available_seats
            FROM seat_inventory
            WHERE schedule_id = $1 AND flight_date = $2 AND class_type = $3
            "#,
        )
        .bind(key.schedule_id)
        .bind(key.flight_date)
        .bind(key.class_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.as_ref().map(row_to_inventory).transpose()
    }

    async fn reserve(&self, requests: &[SeatRequest]) -> StoreResult<ReservationOutcome> {
        let ordered = lock_order(requests);
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // SET takes no bind parameters
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        // 1. Materialize and lock every row in key order
        for request in &ordered {
            let key = request.key;

            if let Some(capacity) = request.seed_capacity {
                sqlx::query(
                    r#"
                    INSERT INTO seat_inventory (schedule_id, flight_date, class_type, available_seats)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (schedule_id, flight_date, class_type) DO NOTHING
                    "#,
                )
                .bind(key.schedule_id)
                .bind(key.flight_date)
                .bind(key.class_type.as_str())
                .bind(capacity)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
            }

            let available: Option<i32> = sqlx::query_scalar(
                r#"
                SELECT available_seats
                FROM seat_inventory
                WHERE schedule_id = $1 AND flight_date = $2 AND class_type = $3
                FOR UPDATE
                "#,
            )
            .bind(key.schedule_id)
            .bind(key.flight_date)
            .bind(key.class_type.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;

            // 2. Check before any write; rolling back also drops first-touch inserts
            let Some(available) = available else {
                tx.rollback().await.map_err(map_db_error)?;
                return Ok(ReservationOutcome::MissingRow(key));
            };
            if (available as i64) < request.seats as i64 {
                debug!("Insufficient seats for {:?}: {} < {}", key, available, request.seats);
                tx.rollback().await.map_err(map_db_error)?;
                return Ok(ReservationOutcome::Insufficient {
                    key,
                    requested: request.seats,
                    available,
                });
            }
        }

        // 3. Apply
        let mut committed = Vec::with_capacity(ordered.len());
        for request in &ordered {
            let key = request.key;
            let remaining: i32 = sqlx::query_scalar(
                r#"
                UPDATE seat_inventory
                SET available_seats = available_seats - $4
                WHERE schedule_id = $1 AND flight_date = $2 AND class_type = $3
                RETURNING available_seats
                "#,
            )
            .bind(key.schedule_id)
            .bind(key.flight_date)
            .bind(key.class_type.as_str())
            .bind(request.seats as i32)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

            committed.push(SeatInventory { key, available_seats: remaining });
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(ReservationOutcome::Committed(committed))
    }

    async fn seed_inventory(&self, rows: &[SeatInventory]) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let mut created = 0;

        for row in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO seat_inventory (schedule_id, flight_date, class_type, available_seats)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (schedule_id, flight_date, class_type) DO NOTHING
                "#,
            )
            .bind(row.key.schedule_id)
            .bind(row.key.flight_date)
            .bind(row.key.class_type.as_str())
            .bind(row.available_seats)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

            created += result.rows_affected() as usize;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(created)
    }
}
