use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::check_text;
use crate::error::AppError;

pub const MIN_DRIVER_AGE: i32 = 21;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Driver {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub passport_number: String,
    pub name: String,
    pub second_name: String,
    pub middle_name: String,
    pub phone_number: String,
    pub age: i32,
}

fn initial(part: &str) -> String {
    part.chars().next().map(String::from).unwrap_or_default()
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}. - {}",
            self.second_name,
            initial(&self.name),
            initial(&self.middle_name),
            self.passport_number
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DriverInput {
    pub passport_number: String,
    pub name: String,
    pub second_name: String,
    pub middle_name: String,
    pub phone_number: String,
    pub age: i32,
}

impl DriverInput {
    pub fn validate(&self) -> Result<(), AppError> {
        check_text("passport_number", &self.passport_number, 25)?;
        check_text("name", &self.name, 255)?;
        check_text("second_name", &self.second_name, 255)?;
        check_text("middle_name", &self.middle_name, 255)?;
        check_text("phone_number", &self.phone_number, 15)?;
        if self.age < MIN_DRIVER_AGE {
            return Err(AppError::Validation(format!(
                "age must be at least {MIN_DRIVER_AGE}"
            )));
        }
        Ok(())
    }

    pub fn into_driver(self, id: Option<ObjectId>) -> Driver {
        Driver {
            id,
            passport_number: self.passport_number,
            name: self.name,
            second_name: self.second_name,
            middle_name: self.middle_name,
            phone_number: self.phone_number,
            age: self.age,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct DriverResponse {
    pub second_name: String,
    pub name: String,
    pub middle_name: String,
    pub passport_number: String,
    pub phone_number: String,
    pub age: i32,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(age: i32) -> DriverInput {
        DriverInput {
            passport_number: "7001 123456".to_string(),
            name: "Евгений".to_string(),
            second_name: "Иванов".to_string(),
            middle_name: "Иванович".to_string(),
            phone_number: "89001234567".to_string(),
            age,
        }
    }

    #[test]
    fn display_uses_initials() {
        let driver = input(30).into_driver(None);
        assert_eq!(driver.to_string(), "Иванов Е.И. - 7001 123456");
    }

    #[test]
    fn drivers_must_be_twenty_one() {
        assert!(input(20).validate().is_err());
        assert!(input(21).validate().is_ok());
    }
}
