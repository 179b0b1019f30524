use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::check_text;
use crate::error::AppError;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Bus {
    /// The registration number doubles as the primary key.
    #[serde(rename = "_id")]
    pub registration_number: String,
    pub mark: String,
    pub capacity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<ObjectId>,
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mark, self.registration_number)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BusInput {
    pub registration_number: String,
    pub mark: String,
    pub amount_of_places: i32,
    /// Driver id or hyperlink.
    #[serde(default)]
    pub driver: Option<String>,
}

impl BusInput {
    pub fn validate(&self) -> Result<(), AppError> {
        check_text("registration_number", &self.registration_number, 10)?;
        // Registration numbers are path segments of the bus URLs.
        if !self.registration_number.chars().all(char::is_alphanumeric) {
            return Err(AppError::Validation(
                "registration_number may contain only letters and digits".to_string(),
            ));
        }
        check_text("mark", &self.mark, 100)?;
        if !(1..=i32::from(u16::MAX)).contains(&self.amount_of_places) {
            return Err(AppError::Validation(
                "amount_of_places must be a positive number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_bus(self, driver_id: Option<ObjectId>) -> Bus {
        Bus {
            registration_number: self.registration_number,
            mark: self.mark,
            capacity: self.amount_of_places,
            driver_id,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct BusResponse {
    pub registration_number: String,
    pub mark: String,
    pub amount_of_places: i32,
    pub url: String,
    pub driver_name: Option<String>,
    pub driver_second_name: Option<String>,
    pub driver: Option<String>,
    pub flights: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_mark_then_registration() {
        let bus = BusInput {
            registration_number: "Е1КХ".to_string(),
            mark: "Ford".to_string(),
            amount_of_places: 40,
            driver: None,
        }
        .into_bus(None);
        assert_eq!(bus.to_string(), "Ford Е1КХ");
    }

    #[test]
    fn capacity_must_be_positive() {
        let mut input = BusInput {
            registration_number: "Е1КХ".to_string(),
            mark: "Ford".to_string(),
            amount_of_places: 0,
            driver: None,
        };
        assert!(input.validate().is_err());
        input.amount_of_places = 40;
        assert!(input.validate().is_ok());
        input.registration_number = "Е1/КХ".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn registration_number_is_letters_and_digits() {
        let mut input = BusInput {
            registration_number: "А101ТУ".to_string(),
            mark: "ПАЗ".to_string(),
            amount_of_places: 20,
            driver: None,
        };
        assert!(input.validate().is_ok());
        for bad in ["А1 01", "A1?x", "A#1", "A1%20", "A.1"] {
            input.registration_number = bad.to_string();
            assert!(input.validate().is_err(), "{bad}");
        }
    }
}
