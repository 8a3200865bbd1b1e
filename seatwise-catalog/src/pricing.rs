use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Multipliers are carried in basis points (10_000 = 1.0) so that band
/// edges and the final rounding are exact.
pub const UNIT_BP: i64 = 10_000;

const SECONDS_PER_DAY: i64 = 86_400;

/// Result of pricing one class on one departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub final_price: i64,
    pub base_price: i32,
    pub booking_multiplier_bp: i64,
    pub date_multiplier_bp: i64,
    pub days_before_departure: i64,
}

/// Dynamic pricing from fill-rate and days-to-departure.
///
/// Both surcharges are taken off the same base and added:
/// `floor(base + base * (booking - 1) + base * (date - 1))`.
///
/// Fill-rate bands (upper bound inclusive): up to 30% -> 1.00, up to 50% -> 1.20,
/// up to 75% -> 1.35, above -> 1.50.
///
/// Date bands on whole days `d` left: `d <= 3` -> `clamp(1 + 0.15 * (4 - d), 1.10, 1.40)`,
/// `d <= 10` -> `clamp(1 + 0.02 * (11 - d), 1.02, 1.14)`, otherwise 1.00.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine;

impl PricingEngine {
    pub fn new() -> Self {
        Self
    }

    /// `None` when the class has no capacity to price against.
    pub fn booking_multiplier_bp(&self, total_seats: i32, available_seats: i32) -> Option<i64> {
        if total_seats <= 0 {
            return None;
        }

        let total = total_seats as i64;
        let sold = (total - available_seats as i64).clamp(0, total);

        // p <= n%  <=>  sold * 100 <= n * total
        let multiplier = if sold * 100 <= 30 * total {
            10_000
        } else if sold * 100 <= 50 * total {
            12_000
        } else if sold * 100 <= 75 * total {
            13_500
        } else {
            15_000
        };

        Some(multiplier)
    }

    pub fn date_multiplier_bp(&self, days_before_departure: i64) -> i64 {
        let d = days_before_departure;
        if d <= 3 {
            10_000i64
                .saturating_add(1_500i64.saturating_mul(4i64.saturating_sub(d)))
                .clamp(11_000, 14_000)
        } else if d <= 10 {
            (10_000 + 200 * (11 - d)).clamp(10_200, 11_400)
        } else {
            UNIT_BP
        }
    }

    /// Whole days left, rounded towards negative infinity.
    pub fn days_before_departure(departure: NaiveDateTime, now: NaiveDateTime) -> i64 {
        (departure - now).num_seconds().div_euclid(SECONDS_PER_DAY)
    }

    pub fn quote(
        &self,
        base_price: i32,
        total_seats: i32,
        available_seats: i32,
        departure: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Option<PriceQuote> {
        if base_price < 0 {
            return None;
        }

        let booking_multiplier_bp = self.booking_multiplier_bp(total_seats, available_seats)?;
        let days_before_departure = Self::days_before_departure(departure, now);
        let date_multiplier_bp = self.date_multiplier_bp(days_before_departure);

        let combined_bp = booking_multiplier_bp + date_multiplier_bp - UNIT_BP;
        let final_price = (base_price as i64).checked_mul(combined_bp)? / UNIT_BP;

        Some(PriceQuote {
            final_price,
            base_price,
            booking_multiplier_bp,
            date_multiplier_bp,
            days_before_departure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn price(base: i32, total: i32, available: i32, days: i64) -> i64 {
        let departure = now() + Duration::days(days) + Duration::hours(1);
        PricingEngine::new()
            .quote(base, total, available, departure, now())
            .unwrap()
            .final_price
    }

    #[test]
    fn test_booking_multiplier_band_ceilings_are_inclusive() {
        let engine = PricingEngine::new();
        assert_eq!(engine.booking_multiplier_bp(100, 100), Some(10_000));
        assert_eq!(engine.booking_multiplier_bp(100, 70), Some(10_000)); // 30%
        assert_eq!(engine.booking_multiplier_bp(100, 69), Some(12_000));
        assert_eq!(engine.booking_multiplier_bp(100, 50), Some(12_000)); // 50%
        assert_eq!(engine.booking_multiplier_bp(100, 49), Some(13_500));
        assert_eq!(engine.booking_multiplier_bp(100, 25), Some(13_500)); // 75%
        assert_eq!(engine.booking_multiplier_bp(100, 24), Some(15_000));
        assert_eq!(engine.booking_multiplier_bp(100, 0), Some(15_000));
    }

    #[test]
    fn test_booking_multiplier_without_capacity() {
        let engine = PricingEngine::new();
        assert_eq!(engine.booking_multiplier_bp(0, 0), None);
        assert_eq!(engine.booking_multiplier_bp(-5, 0), None);
        // Oversupplied rows price as empty
        assert_eq!(engine.booking_multiplier_bp(10, 12), Some(10_000));
    }

    #[test]
    fn test_date_multiplier_bands() {
        let engine = PricingEngine::new();
        assert_eq!(engine.date_multiplier_bp(0), 14_000);
        assert_eq!(engine.date_multiplier_bp(1), 14_000);
        assert_eq!(engine.date_multiplier_bp(2), 13_000);
        assert_eq!(engine.date_multiplier_bp(3), 11_500);
        assert_eq!(engine.date_multiplier_bp(4), 11_400);
        assert_eq!(engine.date_multiplier_bp(10), 10_200);
        assert_eq!(engine.date_multiplier_bp(11), 10_000);
        assert_eq!(engine.date_multiplier_bp(90), 10_000);
        assert_eq!(engine.date_multiplier_bp(-2), 14_000);
        assert_eq!(engine.date_multiplier_bp(i64::MIN), 14_000);
    }

    #[test]
    fn test_surcharges_are_additive_not_compounded() {
        // 40% sold, 5 days out: 5000 + 1000 + 600
        assert_eq!(price(5_000, 100, 60, 5), 6_600);
        // 80% sold, 1 day out: 1000 + 500 + 400
        assert_eq!(price(1_000, 10, 2, 1), 1_900);
    }

    #[test]
    fn test_final_price_rounds_down() {
        // 999 * 1.14 = 1138.86
        assert_eq!(price(999, 100, 100, 4), 1_138);
    }

    #[test]
    fn test_far_out_empty_flight_is_base_fare() {
        let quote = PricingEngine::new()
            .quote(4_500, 60, 60, now() + Duration::days(30), now())
            .unwrap();
        assert_eq!(quote.final_price, 4_500);
        assert_eq!(quote.base_price, 4_500);
        assert_eq!(quote.days_before_departure, 30);
    }

    #[test]
    fn test_days_before_departure_floors() {
        let departure = now() + Duration::days(3) - Duration::minutes(1);
        assert_eq!(PricingEngine::days_before_departure(departure, now()), 2);

        let departed = now() - Duration::minutes(1);
        assert_eq!(PricingEngine::days_before_departure(departed, now()), -1);
    }

    #[test]
    fn test_price_monotonic_in_fill_rate() {
        for days in [0, 3, 7, 20] {
            let mut last = 0;
            for available in (0..=100).rev() {
                let current = price(2_000, 100, available, days);
                assert!(current >= last, "price fell at {} available, {} days", available, days);
                last = current;
            }
        }
    }

    #[test]
    fn test_price_monotonic_as_departure_nears() {
        for available in [100, 60, 40, 10] {
            let mut last = 0;
            for days in (0..=10).rev() {
                let current = price(3_000, 100, available, days);
                assert!(current >= last, "price fell at {} days", days);
                last = current;
            }
        }
    }

    #[test]
    fn test_unpriceable_inputs() {
        let engine = PricingEngine::new();
        assert!(engine.quote(1_000, 0, 0, now(), now()).is_none());
        assert!(engine.quote(-1, 10, 10, now(), now()).is_none());
        assert!(engine.quote(i32::MAX, 10, 0, now(), now()).is_some());
    }
}
