use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

// ============================================================================
// Fare classes
// ============================================================================

/// Fare class sold on a schedule. Ordering is only used to sort lock keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassType {
    #[serde(rename = "Economy")]
    Economy,
    #[serde(rename = "Second Class")]
    SecondClass,
    #[serde(rename = "First Class")]
    FirstClass,
}

impl ClassType {
    pub const ALL: [ClassType; 3] = [ClassType::Economy, ClassType::SecondClass, ClassType::FirstClass];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassType::Economy => "Economy",
            ClassType::SecondClass => "Second Class",
            ClassType::FirstClass => "First Class",
        }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Option<Self> {
        let wanted = input.trim();
        Self::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::ValidationError(format!("unknown class type '{}'", s)))
    }
}

// ============================================================================
// Week-day sets
// ============================================================================

/// Set of week-days a recurring schedule operates on. Bit `n` is the day
/// `n` days after Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatingDays(u8);

impl OperatingDays {
    pub const NONE: OperatingDays = OperatingDays(0);
    pub const EVERY_DAY: OperatingDays = OperatingDays(0b111_1111);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::EVERY_DAY.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn of(days: &[Weekday]) -> Self {
        days.iter().fold(Self::NONE, |acc, day| Self(acc.0 | Self::bit(*day)))
    }

    pub fn single(day: Weekday) -> Self {
        Self(Self::bit(day))
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: OperatingDays) -> bool {
        self.0 & other.0 != 0
    }

    /// The days on which an overnight departure from `self` lands.
    pub fn next_day(self) -> Self {
        Self(((self.0 << 1) | (self.0 >> 6)) & Self::EVERY_DAY.0)
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_sunday()
    }
}

// ============================================================================
// Catalog entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub id: Uuid,
    pub name: String,
}

/// Operator-owned city pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub airline_id: Uuid,
    pub source: String,
    pub destination: String,
}

impl Route {
    pub fn serves(&self, source: &str, destination: &str) -> bool {
        self.source.trim().eq_ignore_ascii_case(source.trim())
            && self.destination.trim().eq_ignore_ascii_case(destination.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub route_id: Uuid,
    pub flight_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum Recurrence {
    /// Flies once, on the schedule's `start_date`.
    OneTime,
    Weekly(OperatingDays),
}

/// A time-of-day slot for a flight over a validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSchedule {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub recurrence: Recurrence,
}

impl FlightSchedule {
    pub fn is_recurring(&self) -> bool {
        matches!(self.recurrence, Recurrence::Weekly(_))
    }

    /// Arrival time-of-day earlier than departure means next-day arrival.
    pub fn is_overnight(&self) -> bool {
        self.arrival_time < self.departure_time
    }

    pub fn arrival_day_offset(&self) -> i64 {
        if self.is_overnight() {
            1
        } else {
            0
        }
    }

    pub fn departure_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.departure_time)
    }

    pub fn arrival_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.arrival_time) + Duration::days(self.arrival_day_offset())
    }

    /// Week-days this schedule can depart on.
    pub fn operating_days(&self) -> OperatingDays {
        match self.recurrence {
            Recurrence::OneTime => OperatingDays::single(self.start_date.weekday()),
            Recurrence::Weekly(days) => days,
        }
    }

    /// Last date the schedule can depart on; `None` is open-ended.
    pub fn last_date(&self) -> Option<NaiveDate> {
        match self.recurrence {
            Recurrence::OneTime => Some(self.start_date),
            Recurrence::Weekly(_) => self.end_date,
        }
    }
}

/// Capacity and reference fare for one class on one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatClassConfig {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub class_type: ClassType,
    pub total_seats: i32,
    pub base_price: i32,
}

/// A schedule joined with everything needed to build an offer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledFlight {
    pub airline: Airline,
    pub route: Route,
    pub flight: Flight,
    pub schedule: FlightSchedule,
    pub seat_classes: Vec<SeatClassConfig>,
}

impl ScheduledFlight {
    pub fn seat_class(&self, class_type: ClassType) -> Option<&SeatClassConfig> {
        self.seat_classes.iter().find(|seat| seat.class_type == class_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(departure: (u32, u32), arrival: (u32, u32)) -> FlightSchedule {
        FlightSchedule {
            id: Uuid::new_v4(),
            flight_id: Uuid::new_v4(),
            departure_time: NaiveTime::from_hms_opt(departure.0, departure.1, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(arrival.0, arrival.1, 0).unwrap(),
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: None,
            recurrence: Recurrence::Weekly(OperatingDays::EVERY_DAY),
        }
    }

    #[test]
    fn test_class_type_parse_is_case_insensitive() {
        assert_eq!(ClassType::parse(" second class "), Some(ClassType::SecondClass));
        assert_eq!(ClassType::parse("FIRST CLASS"), Some(ClassType::FirstClass));
        assert_eq!(ClassType::parse("Business"), None);
        assert!("Business".parse::<ClassType>().is_err());
    }

    #[test]
    fn test_class_type_wire_names() {
        let json = serde_json::to_string(&ClassType::SecondClass).unwrap();
        assert_eq!(json, "\"Second Class\"");
    }

    #[test]
    fn test_operating_days_wrap_saturday_to_sunday() {
        let weekend = OperatingDays::of(&[Weekday::Sat]);
        assert!(weekend.next_day().contains(Weekday::Sun));
        assert!(!weekend.next_day().contains(Weekday::Sat));
        assert_eq!(OperatingDays::EVERY_DAY.next_day(), OperatingDays::EVERY_DAY);
    }

    #[test]
    fn test_overnight_arrival_lands_next_day() {
        let red_eye = schedule((23, 30), (1, 15));
        let date = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        assert!(red_eye.is_overnight());
        assert_eq!(red_eye.arrival_on(date).date(), NaiveDate::from_ymd_opt(2025, 7, 16).unwrap());

        let day_flight = schedule((10, 0), (12, 0));
        assert_eq!(day_flight.arrival_on(date).date(), date);
    }

    #[test]
    fn test_one_time_schedule_operates_on_its_start_weekday() {
        let mut one_off = schedule((10, 0), (12, 0));
        one_off.recurrence = Recurrence::OneTime;
        // 2025-07-01 is a Tuesday
        assert_eq!(one_off.operating_days(), OperatingDays::single(Weekday::Tue));
        assert_eq!(one_off.last_date(), Some(one_off.start_date));
    }
}
