use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::check_text;
use crate::error::AppError;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BusStation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Opening hours separated by `;`.
    pub office_hours: String,
    pub address: String,
    pub phone_number: String,
}

impl fmt::Display for BusStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StationInput {
    pub name: String,
    pub office_hours: String,
    pub address: String,
    pub phone_number: String,
}

impl StationInput {
    pub fn validate(&self) -> Result<(), AppError> {
        check_text("name", &self.name, 50)?;
        check_text("office_hours", &self.office_hours, 30)?;
        check_text("address", &self.address, 100)?;
        check_text("phone_number", &self.phone_number, 15)
    }

    pub fn into_station(self, id: Option<ObjectId>) -> BusStation {
        BusStation {
            id,
            name: self.name,
            office_hours: self.office_hours,
            address: self.address,
            phone_number: self.phone_number,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct StationResponse {
    pub name: String,
    pub routes: Vec<String>,
    pub address: String,
    pub phone_number: String,
    pub office_hours: String,
    pub url: String,
}
