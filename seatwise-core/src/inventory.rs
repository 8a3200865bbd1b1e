use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ClassType;

/// Identity of a per-date seat counter. The derived ordering is the global
/// lock-acquisition order for multi-row reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryKey {
    pub schedule_id: Uuid,
    pub flight_date: NaiveDate,
    pub class_type: ClassType,
}

impl InventoryKey {
    pub fn new(schedule_id: Uuid, flight_date: NaiveDate, class_type: ClassType) -> Self {
        Self {
            schedule_id,
            flight_date,
            class_type,
        }
    }
}

/// Seats left for one (schedule, date, class).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInventory {
    pub key: InventoryKey,
    pub available_seats: i32,
}

impl SeatInventory {
    /// A row nobody has booked against yet.
    pub fn fresh(key: InventoryKey, total_seats: i32) -> Self {
        Self {
            key,
            available_seats: total_seats,
        }
    }
}

/// How per-date rows come into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Materialization {
    /// Rows are created ahead of time; a missing row means the date is not sold.
    Seeded,
    /// The first reservation inserts the row at full capacity, under the row lock.
    #[default]
    OnFirstTouch,
}

impl Materialization {
    pub fn seed_capacity(self, total_seats: i32) -> Option<i32> {
        match self {
            Materialization::Seeded => None,
            Materialization::OnFirstTouch => Some(total_seats),
        }
    }
}

/// One row's share of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatRequest {
    pub key: InventoryKey,
    pub seats: u32,
    /// Capacity to insert the row with if it does not exist yet.
    pub seed_capacity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// Every row was decremented; holds the rows as committed.
    Committed(Vec<SeatInventory>),
    /// Nothing was written.
    Insufficient {
        key: InventoryKey,
        requested: u32,
        available: i32,
    },
    /// Nothing was written.
    MissingRow(InventoryKey),
}

/// Collapses requests for the same row and returns them in lock order.
/// Merged seat counts saturate, so an absurd total reads as insufficient.
pub fn lock_order(requests: &[SeatRequest]) -> Vec<SeatRequest> {
    let mut merged: BTreeMap<InventoryKey, SeatRequest> = BTreeMap::new();
    for request in requests {
        merged
            .entry(request.key)
            .and_modify(|existing| {
                existing.seats = existing.seats.saturating_add(request.seats);
                existing.seed_capacity = existing.seed_capacity.or(request.seed_capacity);
            })
            .or_insert(*request);
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(schedule: u128, day: u32) -> InventoryKey {
        InventoryKey::new(
            Uuid::from_u128(schedule),
            NaiveDate::from_ymd_opt(2025, 7, day).unwrap(),
            ClassType::Economy,
        )
    }

    #[test]
    fn test_lock_order_is_independent_of_leg_order() {
        let outbound = SeatRequest { key: key(2, 15), seats: 1, seed_capacity: None };
        let inbound = SeatRequest { key: key(1, 20), seats: 1, seed_capacity: None };

        let forward = lock_order(&[outbound, inbound]);
        let reverse = lock_order(&[inbound, outbound]);

        assert_eq!(forward, reverse);
        assert_eq!(forward[0].key, key(1, 20));
    }

    #[test]
    fn test_lock_order_merges_same_row() {
        let first = SeatRequest { key: key(1, 15), seats: 2, seed_capacity: None };
        let second = SeatRequest { key: key(1, 15), seats: 3, seed_capacity: Some(40) };

        let merged = lock_order(&[first, second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].seats, 5);
        assert_eq!(merged[0].seed_capacity, Some(40));
    }

    #[test]
    fn test_lock_order_merge_saturates() {
        let half = SeatRequest { key: key(1, 15), seats: u32::MAX / 2 + 1, seed_capacity: None };

        let merged = lock_order(&[half, half]);
        assert_eq!(merged[0].seats, u32::MAX);
    }

    #[test]
    fn test_materialization_config_names() {
        let policy: Materialization = serde_json::from_str("\"on_first_touch\"").unwrap();
        assert_eq!(policy, Materialization::OnFirstTouch);
        assert_eq!(Materialization::Seeded.seed_capacity(30), None);
        assert_eq!(Materialization::OnFirstTouch.seed_capacity(30), Some(30));
    }
}
