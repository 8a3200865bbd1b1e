use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::model::ClassType;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub source: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub travellers_count: u32,
    /// Matched case-insensitively; names outside the three fare classes
    /// simply match nothing.
    pub class_type: String,
}

/// What the search found, with one flag per stage so callers can tell
/// "route not served" from "no seats left".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    pub flights: Vec<FlightOffer>,
    pub found_route: bool,
    pub found_class_type: bool,
    pub found_date: bool,
    pub seats_available: bool,
}

impl SearchResult {
    pub fn route_not_served() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub flight_number: String,
    pub airline_name: String,
    pub source: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    #[serde(with = "seatwise_shared::time_format")]
    pub departure_time: NaiveTime,
    pub arrival_date: NaiveDate,
    #[serde(with = "seatwise_shared::time_format")]
    pub arrival_time: NaiveTime,
    /// `"+1"` style marker, present only when arrival is on a later day.
    pub arrival_date_difference: Option<String>,
    pub seats: i32,
    pub price: i64,
    pub base_price: i32,
    pub travellers_count: u32,
    pub class_type: ClassType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_deserialization() {
        let json = r#"
            {
                "source": "Delhi",
                "destination": "Mumbai",
                "departure_date": "2025-07-15",
                "travellers_count": 2,
                "class_type": "Economy"
            }
        "#;
        let query: SearchQuery = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(query.source, "Delhi");
        assert_eq!(query.departure_date, NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
    }

    #[test]
    fn test_route_not_served_has_every_flag_down() {
        let result = SearchResult::route_not_served();
        assert!(!result.found_route && !result.found_class_type);
        assert!(!result.found_date && !result.seats_available);
        assert!(result.flights.is_empty());
    }
}
