use chrono::NaiveDate;
use uuid::Uuid;

/// Emitted after a reservation commits, once per inventory row touched.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct SeatsBookedEvent {
    pub flight_number: String,
    pub schedule_id: Uuid,
    pub flight_date: NaiveDate,
    pub class_type: String,
    pub seats_booked: u32,
    pub seats_remaining: i32,
    pub booked_at: i64,
}
