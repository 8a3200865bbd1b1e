use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use seatwise_core::{
    Airline, CatalogRepository, ClassType, Flight, FlightSchedule, OperatingDays, Recurrence, Route,
    ScheduleRepository, ScheduledFlight, SeatClassConfig, StoreError, StoreResult,
};
use seatwise_catalog::validation::check_schedule_insert;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::database::map_db_error;

/// PostgreSQL implementation of every store trait. Inventory lives in
/// `inventory_repo`.
#[derive(Clone)]
pub struct PostgresStore {
    pub(crate) pool: PgPool,
    pub(crate) lock_timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const SCHEDULE_COLUMNS: &str =
    "s.id, s.flight_id, s.departure_time, s.arrival_time, s.start_date, s.end_date, s.recurring, s.operating_days";

pub(crate) fn parse_class(raw: &str) -> StoreResult<ClassType> {
    ClassType::parse(raw).ok_or_else(|| StoreError::Decode(format!("unknown class_type '{}'", raw)))
}

fn row_to_schedule(row: &PgRow) -> StoreResult<FlightSchedule> {
    let recurring: bool = row.try_get("recurring").map_err(map_db_error)?;
    let operating_days: i32 = row.try_get("operating_days").map_err(map_db_error)?;
    let days = u8::try_from(operating_days)
        .map_err(|_| StoreError::Decode(format!("operating_days out of range: {}", operating_days)))?;

    Ok(FlightSchedule {
        id: row.try_get("id").map_err(map_db_error)?,
        flight_id: row.try_get("flight_id").map_err(map_db_error)?,
        departure_time: row.try_get::<NaiveTime, _>("departure_time").map_err(map_db_error)?,
        arrival_time: row.try_get::<NaiveTime, _>("arrival_time").map_err(map_db_error)?,
        start_date: row.try_get::<NaiveDate, _>("start_date").map_err(map_db_error)?,
        end_date: row.try_get::<Option<NaiveDate>, _>("end_date").map_err(map_db_error)?,
        recurrence: if recurring {
            Recurrence::Weekly(OperatingDays::from_bits(days))
        } else {
            Recurrence::OneTime
        },
    })
}

fn row_to_seat_class(row: &PgRow) -> StoreResult<SeatClassConfig> {
    let class_type: String = row.try_get("class_type").map_err(map_db_error)?;
    Ok(SeatClassConfig {
        id: row.try_get("id").map_err(map_db_error)?,
        schedule_id: row.try_get("schedule_id").map_err(map_db_error)?,
        class_type: parse_class(&class_type)?,
        total_seats: row.try_get("total_seats").map_err(map_db_error)?,
        base_price: row.try_get("base_price").map_err(map_db_error)?,
    })
}

fn row_to_route(row: &PgRow) -> StoreResult<Route> {
    Ok(Route {
        id: row.try_get("id").map_err(map_db_error)?,
        airline_id: row.try_get("airline_id").map_err(map_db_error)?,
        source: row.try_get("source").map_err(map_db_error)?,
        destination: row.try_get("destination").map_err(map_db_error)?,
    })
}

#[async_trait]
impl ScheduleRepository for PostgresStore {
    async fn find_routes(&self, source: &str, destination: &str) -> StoreResult<Vec<Route>> {
        let rows = sqlx::query(
            r#"
            SELECT id, airline_id, source, destination
            FROM flight_routes
            WHERE lower(btrim(source)) = lower(btrim($1))
              AND lower(btrim(destination)) = lower(btrim($2))
            "#,
        )
        .bind(source)
        .bind(destination)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.iter().map(row_to_route).collect()
    }

    async fn scheduled_flights(&self, route_ids: &[Uuid]) -> StoreResult<Vec<ScheduledFlight>> {
        if route_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SCHEDULE_COLUMNS},
                   f.flight_number, f.route_id,
                   r.airline_id, r.source, r.destination,
                   a.name AS airline_name
            FROM flight_schedules s
            JOIN flights f ON f.id = s.flight_id
            JOIN flight_routes r ON r.id = f.route_id
            JOIN airlines a ON a.id = r.airline_id
            WHERE f.route_id = ANY($1)
            "#
        ))
        .bind(route_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let schedule_ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get("id").map_err(map_db_error))
            .collect::<StoreResult<_>>()?;

        let seat_rows = sqlx::query(
            "SELECT id, schedule_id, class_type, total_seats, base_price FROM seat_classes WHERE schedule_id = ANY($1)",
        )
        .bind(&schedule_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut seat_classes: HashMap<Uuid, Vec<SeatClassConfig>> = HashMap::new();
        for row in &seat_rows {
            let seat = row_to_seat_class(row)?;
            seat_classes.entry(seat.schedule_id).or_default().push(seat);
        }

        rows.iter()
            .map(|row| {
                let schedule = row_to_schedule(row)?;
                let route_id: Uuid = row.try_get("route_id").map_err(map_db_error)?;
                let airline_id: Uuid = row.try_get("airline_id").map_err(map_db_error)?;

                Ok(ScheduledFlight {
                    airline: Airline {
                        id: airline_id,
                        name: row.try_get("airline_name").map_err(map_db_error)?,
                    },
                    route: Route {
                        id: route_id,
                        airline_id,
                        source: row.try_get("source").map_err(map_db_error)?,
                        destination: row.try_get("destination").map_err(map_db_error)?,
                    },
                    flight: Flight {
                        id: schedule.flight_id,
                        route_id,
                        flight_number: row.try_get("flight_number").map_err(map_db_error)?,
                    },
                    seat_classes: seat_classes.remove(&schedule.id).unwrap_or_default(),
                    schedule,
                })
            })
            .collect()
    }

    async fn find_flight(&self, flight_number: &str) -> StoreResult<Option<Flight>> {
        let row = sqlx::query("SELECT id, route_id, flight_number FROM flights WHERE flight_number = $1")
            .bind(flight_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(|row| {
            Ok(Flight {
                id: row.try_get("id").map_err(map_db_error)?,
                route_id: row.try_get("route_id").map_err(map_db_error)?,
                flight_number: row.try_get("flight_number").map_err(map_db_error)?,
            })
        })
        .transpose()
    }

    async fn find_schedule(&self, schedule_id: Uuid) -> StoreResult<Option<FlightSchedule>> {
        let row = sqlx::query(&format!("SELECT {SCHEDULE_COLUMNS} FROM flight_schedules s WHERE s.id = $1"))
            .bind(schedule_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.as_ref().map(row_to_schedule).transpose()
    }

    async fn schedules_for_flight(&self, flight_id: Uuid) -> StoreResult<Vec<FlightSchedule>> {
        let rows = sqlx::query(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM flight_schedules s WHERE s.flight_id = $1 ORDER BY s.departure_time"
        ))
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.iter().map(row_to_schedule).collect()
    }

    async fn seat_classes(&self, schedule_id: Uuid) -> StoreResult<Vec<SeatClassConfig>> {
        let rows = sqlx::query(
            "SELECT id, schedule_id, class_type, total_seats, base_price FROM seat_classes WHERE schedule_id = $1",
        )
        .bind(schedule_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.iter().map(row_to_seat_class).collect()
    }

    async fn list_cities(&self) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT btrim(source) AS city FROM flight_routes
            UNION
            SELECT btrim(destination) FROM flight_routes
            ORDER BY city
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("city").map_err(map_db_error))
            .collect()
    }
}

#[async_trait]
impl CatalogRepository for PostgresStore {
    async fn insert_airline(&self, airline: &Airline) -> StoreResult<()> {
        sqlx::query("INSERT INTO airlines (id, name) VALUES ($1, $2)")
            .bind(airline.id)
            .bind(&airline.name)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn insert_route(&self, route: &Route) -> StoreResult<()> {
        sqlx::query("INSERT INTO flight_routes (id, airline_id, source, destination) VALUES ($1, $2, $3, $4)")
            .bind(route.id)
            .bind(route.airline_id)
            .bind(&route.source)
            .bind(&route.destination)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn insert_flight(&self, flight: &Flight) -> StoreResult<()> {
        sqlx::query("INSERT INTO flights (id, route_id, flight_number) VALUES ($1, $2, $3)")
            .bind(flight.id)
            .bind(flight.route_id)
            .bind(&flight.flight_number)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn insert_schedule(&self, schedule: &FlightSchedule) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // The flight row lock serializes registrations for one flight
        let flight: Option<Uuid> = sqlx::query_scalar("SELECT id FROM flights WHERE id = $1 FOR UPDATE")
            .bind(schedule.flight_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;
        if flight.is_none() {
            return Err(StoreError::Constraint(format!("unknown flight {}", schedule.flight_id)));
        }

        let rows = sqlx::query(&format!("SELECT {SCHEDULE_COLUMNS} FROM flight_schedules s WHERE s.flight_id = $1"))
            .bind(schedule.flight_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(map_db_error)?;
        let siblings = rows.iter().map(row_to_schedule).collect::<StoreResult<Vec<_>>>()?;
        check_schedule_insert(schedule, &siblings)?;

        sqlx::query(
            r#"
            INSERT INTO flight_schedules
                (id, flight_id, departure_time, arrival_time, start_date, end_date, recurring, operating_days)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.flight_id)
        .bind(schedule.departure_time)
        .bind(schedule.arrival_time)
        .bind(schedule.start_date)
        .bind(schedule.end_date)
        .bind(schedule.is_recurring())
        .bind(schedule.operating_days().bits() as i32)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn insert_seat_class(&self, seat_class: &SeatClassConfig) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO seat_classes (id, schedule_id, class_type, total_seats, base_price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(seat_class.id)
        .bind(seat_class.schedule_id)
        .bind(seat_class.class_type.as_str())
        .bind(seat_class.total_seats)
        .bind(seat_class.base_price)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }
}
