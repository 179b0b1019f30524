use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

use super::check_text;
use crate::error::AppError;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Ticket {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub flight_id: ObjectId,
    /// Buyer's name.
    pub user: String,
    /// Seller's name.
    pub seller: String,
    /// Set once when the ticket is sold.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub registration_time: DateTime<Utc>,
}

impl Ticket {
    pub fn label(&self, flight_label: &str) -> String {
        format!("{} - {}", flight_label, self.user)
    }
}

fn check_names(user: &str, seller: &str) -> Result<(), AppError> {
    check_text("user", user, 255)?;
    check_text("seller", seller, 255)
}

#[derive(Deserialize, Clone, Debug)]
pub struct TicketInput {
    /// Flight id or hyperlink.
    pub flight: String,
    pub user: String,
    /// Defaults to the authenticated user's name.
    #[serde(default)]
    pub seller: Option<String>,
}

/// Only the names on a ticket may change after the sale.
#[derive(Deserialize, Clone, Debug)]
pub struct TicketUpdate {
    pub user: String,
    pub seller: String,
}

impl TicketUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        check_names(&self.user, &self.seller)
    }
}

/// A sale ready to be recorded.
#[derive(Clone, Debug)]
pub struct Sale {
    pub flight_id: ObjectId,
    pub user: String,
    pub seller: String,
}

impl Sale {
    pub fn validate(&self) -> Result<(), AppError> {
        check_names(&self.user, &self.seller)
    }

    pub fn into_ticket(self, registration_time: DateTime<Utc>) -> Ticket {
        Ticket {
            id: None,
            flight_id: self.flight_id,
            user: self.user,
            seller: self.seller,
            registration_time,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct TicketResponse {
    pub flight: String,
    pub user: String,
    pub seller: String,
    pub registration_time: DateTime<Utc>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    #[test]
    fn registration_time_is_stored_as_bson_datetime() {
        let ticket = Sale {
            flight_id: ObjectId::new(),
            user: "Евгений".to_string(),
            seller: "Иван".to_string(),
        }
        .into_ticket(Utc::now());
        let doc = bson::to_document(&ticket).unwrap();
        assert!(doc.get_datetime("registration_time").is_ok());
        assert_eq!(ticket.label("A - R - 10:00:00"), "A - R - 10:00:00 - Евгений");
    }

    #[test]
    fn names_are_required() {
        let update = TicketUpdate {
            user: String::new(),
            seller: "Иван".to_string(),
        };
        assert!(update.validate().is_err());
    }
}
