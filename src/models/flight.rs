use chrono::NaiveTime;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::deserialize_time;
use crate::error::AppError;
use crate::schedule::TravelTime;

pub const DEFAULT_FREE_SEATS: i32 = 30;

fn default_free_seats() -> i32 {
    DEFAULT_FREE_SEATS
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Flight {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub route_id: ObjectId,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub free_seats: i32,
    /// Registration number of the assigned bus.
    pub bus_id: String,
}

impl Flight {
    pub fn label(&self, route_label: &str) -> String {
        format!("{} - {}", route_label, self.departure_time.format("%H:%M:%S"))
    }

    pub fn travel_time(&self) -> TravelTime {
        TravelTime::between(self.departure_time, self.arrival_time)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct FlightInput {
    /// Route id or hyperlink.
    pub route: String,
    #[serde(deserialize_with = "deserialize_time")]
    pub departure_time: NaiveTime,
    #[serde(deserialize_with = "deserialize_time")]
    pub arrival_time: NaiveTime,
    #[serde(default = "default_free_seats")]
    pub amount_of_free_places: i32,
    /// Bus registration number or hyperlink.
    pub bus: String,
}

impl FlightInput {
    /// Free seats must stay within `[0, capacity]` of the assigned bus.
    pub fn validate(&self, bus_capacity: i32) -> Result<(), AppError> {
        if self.amount_of_free_places < 0 {
            return Err(AppError::Validation(
                "amount_of_free_places must not be negative".to_string(),
            ));
        }
        if self.amount_of_free_places > bus_capacity {
            return Err(AppError::Validation(format!(
                "amount_of_free_places exceeds the bus capacity of {bus_capacity}"
            )));
        }
        Ok(())
    }

    pub fn into_flight(self, id: Option<ObjectId>, route_id: ObjectId, bus_id: String) -> Flight {
        Flight {
            id,
            route_id,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            free_seats: self.amount_of_free_places,
            bus_id,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct FlightResponse {
    pub route_name: Option<String>,
    pub route: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub travel_time: TravelTime,
    pub amount_of_free_places: i32,
    pub url: String,
    pub bus_registration_number: String,
    pub bus: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_defaults_to_thirty_free_seats() {
        let input: FlightInput = serde_json::from_value(json!({
            "route": "http://localhost/api/routes/65f000000000000000000001/",
            "departure_time": "10:00",
            "arrival_time": "22:00:00",
            "bus": "E1KX",
        }))
        .unwrap();
        assert_eq!(input.amount_of_free_places, DEFAULT_FREE_SEATS);
        assert_eq!(input.departure_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage_times() {
        let result = serde_json::from_value::<FlightInput>(json!({
            "route": "x",
            "departure_time": "ten o'clock",
            "arrival_time": "22:00",
            "bus": "E1KX",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn free_seats_bounded_by_capacity() {
        let mut input: FlightInput = serde_json::from_value(json!({
            "route": "r", "departure_time": "10:00", "arrival_time": "12:00", "bus": "b",
        }))
        .unwrap();
        assert!(input.validate(40).is_ok());
        assert!(input.validate(20).is_err());
        input.amount_of_free_places = -1;
        assert!(input.validate(40).is_err());
    }

    #[test]
    fn label_and_travel_time() {
        let flight = Flight {
            id: None,
            route_id: ObjectId::new(),
            departure_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            free_seats: 30,
            bus_id: "E1KX".to_string(),
        };
        assert_eq!(flight.label("A - R"), "A - R - 10:00:00");
        assert_eq!(flight.travel_time().to_string(), "12:0:00");
    }
}
