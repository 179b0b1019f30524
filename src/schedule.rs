//! Seat bookkeeping and timetable lookups for flights.
//!
//! Everything here is pure: the current instant and the station's UTC
//! offset are always passed in by the caller.

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::models::Flight;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeatError {
    #[error("no free seats left")]
    SoldOut,
    #[error("all {capacity} seats are already free")]
    AtCapacity { capacity: i32 },
}

/// A change to a flight's free-seat counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatChange {
    /// A ticket was sold.
    Sell,
    /// A ticket was cancelled; the counter may not pass the bus capacity.
    Release { capacity: i32 },
}

impl SeatChange {
    pub fn delta(self) -> i32 {
        match self {
            SeatChange::Sell => -1,
            SeatChange::Release { .. } => 1,
        }
    }

    /// Applies the change to `free_seats`, keeping it within `[0, capacity]`.
    pub fn apply(self, free_seats: i32) -> Result<i32, SeatError> {
        match self {
            SeatChange::Sell if free_seats <= 0 => Err(SeatError::SoldOut),
            SeatChange::Release { capacity } if free_seats >= capacity => {
                Err(SeatError::AtCapacity { capacity })
            }
            change => Ok(free_seats + change.delta()),
        }
    }
}

/// Builds a fixed offset from whole hours east of UTC.
pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

/// Local time of day at minute precision.
pub fn local_minute(now: DateTime<Utc>, offset: FixedOffset) -> (u32, u32) {
    let local = now.with_timezone(&offset);
    (local.hour(), local.minute())
}

/// First flight departing at or after the local time of `now` that still has
/// free seats.
///
/// `flights` are scanned in the order given, which is ascending departure
/// time when they come from the store. Departure times are compared at
/// minute precision, so a flight leaving at 10:00 is still offered at
/// 10:00:45.
pub fn next_flight(
    flights: &[Flight],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Option<&Flight> {
    let current = local_minute(now, offset);
    flights
        .iter()
        .filter(|flight| {
            (flight.departure_time.hour(), flight.departure_time.minute()) >= current
        })
        .find(|flight| flight.free_seats != 0)
}

/// Elapsed time between departure and arrival on the same day.
///
/// Arrival after midnight is not normalised: 23:00 to 01:00 gives a negative
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelTime {
    minutes: i64,
}

impl TravelTime {
    pub fn between(departure: NaiveTime, arrival: NaiveTime) -> Self {
        let to_minutes = |t: NaiveTime| i64::from(t.hour()) * 60 + i64::from(t.minute());
        TravelTime {
            minutes: to_minutes(arrival) - to_minutes(departure),
        }
    }

    pub fn minutes(self) -> i64 {
        self.minutes
    }
}

impl fmt::Display for TravelTime {
    /// `H:M:00` with floored hours, minutes not zero padded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:00",
            self.minutes.div_euclid(60),
            self.minutes.rem_euclid(60)
        )
    }
}

impl Serialize for TravelTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::oid::ObjectId;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn flight(h: u32, m: u32, free_seats: i32) -> Flight {
        Flight {
            id: Some(ObjectId::new()),
            route_id: ObjectId::new(),
            departure_time: time(h, m),
            arrival_time: time((h + 2) % 24, m),
            free_seats,
            bus_id: "E1KX".to_string(),
        }
    }

    fn moscow() -> FixedOffset {
        offset_from_hours(3).unwrap()
    }

    /// UTC instant whose Moscow local time is `h:m:s`.
    fn local(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        moscow()
            .with_ymd_and_hms(2024, 5, 14, h, m, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn picks_first_later_flight_with_seats() {
        // Station A, route R: 09:00 is full, 11:00 has five seats.
        let flights = vec![flight(9, 0, 0), flight(11, 0, 5)];
        let next = next_flight(&flights, local(10, 0, 0), moscow()).unwrap();
        assert_eq!(next.departure_time, time(11, 0));
    }

    #[test]
    fn skips_full_flights_after_now() {
        let flights = vec![flight(10, 30, 0), flight(12, 0, 0), flight(15, 45, 2)];
        let next = next_flight(&flights, local(10, 0, 0), moscow()).unwrap();
        assert_eq!(next.departure_time, time(15, 45));
        assert_ne!(next.free_seats, 0);
    }

    #[test]
    fn same_hour_compares_minutes() {
        let flights = vec![flight(10, 15, 3), flight(10, 45, 3)];
        let next = next_flight(&flights, local(10, 30, 0), moscow()).unwrap();
        assert_eq!(next.departure_time, time(10, 45));
    }

    #[test]
    fn departing_this_minute_is_still_offered() {
        let flights = vec![flight(10, 30, 3)];
        assert!(next_flight(&flights, local(10, 30, 45), moscow()).is_some());
    }

    #[test]
    fn none_when_everything_departed() {
        let flights = vec![flight(6, 0, 10), flight(8, 0, 10)];
        assert!(next_flight(&flights, local(10, 0, 0), moscow()).is_none());
    }

    #[test]
    fn none_when_remaining_flights_are_full() {
        let flights = vec![flight(6, 0, 10), flight(12, 0, 0), flight(18, 0, 0)];
        assert!(next_flight(&flights, local(10, 0, 0), moscow()).is_none());
        assert!(next_flight(&[], local(10, 0, 0), moscow()).is_none());
    }

    #[test]
    fn offset_wraps_past_midnight() {
        // 22:30 UTC is 01:30 in Moscow, not hour 25.
        let now = Utc.with_ymd_and_hms(2024, 5, 14, 22, 30, 0).unwrap();
        assert_eq!(local_minute(now, moscow()), (1, 30));
        let flights = vec![flight(1, 0, 5), flight(2, 0, 5)];
        let next = next_flight(&flights, now, moscow()).unwrap();
        assert_eq!(next.departure_time, time(2, 0));
    }

    #[test]
    fn offset_is_configurable() {
        let now = Utc.with_ymd_and_hms(2024, 5, 14, 10, 0, 0).unwrap();
        let flights = vec![flight(11, 0, 5), flight(13, 0, 5)];
        let utc = offset_from_hours(0).unwrap();
        assert_eq!(
            next_flight(&flights, now, utc).unwrap().departure_time,
            time(11, 0)
        );
        assert_eq!(
            next_flight(&flights, now, moscow()).unwrap().departure_time,
            time(13, 0)
        );
        assert!(offset_from_hours(30).is_none());
    }

    #[test]
    fn travel_time_same_day() {
        assert_eq!(
            TravelTime::between(time(10, 0), time(22, 0)).to_string(),
            "12:0:00"
        );
        assert_eq!(
            TravelTime::between(time(8, 15), time(16, 30)).to_string(),
            "8:15:00"
        );
    }

    #[test]
    fn travel_time_over_midnight_stays_negative() {
        let travel = TravelTime::between(time(23, 0), time(1, 0));
        assert_eq!(travel.minutes(), -1320);
        assert_eq!(travel.to_string(), "-22:0:00");
        assert_eq!(
            TravelTime::between(time(1, 30), time(0, 0)).to_string(),
            "-2:30:00"
        );
    }

    #[test]
    fn travel_time_serializes_as_string() {
        let travel = TravelTime::between(time(10, 0), time(22, 0));
        assert_eq!(serde_json::to_value(travel).unwrap(), "12:0:00");
    }

    #[test]
    fn selling_then_cancelling_restores_count() {
        let capacity = 40;
        let sold = SeatChange::Sell.apply(30).unwrap();
        assert_eq!(sold, 29);
        assert_eq!(SeatChange::Release { capacity }.apply(sold), Ok(30));
    }

    #[test]
    fn seat_counter_stays_in_bounds() {
        assert_eq!(SeatChange::Sell.apply(0), Err(SeatError::SoldOut));
        assert_eq!(
            SeatChange::Release { capacity: 40 }.apply(40),
            Err(SeatError::AtCapacity { capacity: 40 })
        );
        assert_eq!(SeatChange::Sell.apply(1), Ok(0));
    }
}
