use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{check_optional_text, check_text};
use crate::error::AppError;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Route {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Destination.
    pub name: String,
    /// First two letters of the week days separated by `;`, or `Еж` for daily.
    pub regularity: String,
    /// Every departure time of the route, free text.
    pub departure_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopover: Option<String>,
    pub price: i32,
    pub bus_station_id: ObjectId,
}

impl Route {
    /// `"<station> - <route>"`, the way routes are listed everywhere.
    pub fn label(&self, station_name: &str) -> String {
        format!("{} - {}", station_name, self.name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RouteInput {
    pub name: String,
    pub regularity: String,
    pub departure_time: String,
    #[serde(default)]
    pub stopover: Option<String>,
    pub price: i32,
    /// Station id or hyperlink.
    pub bus_station: String,
}

impl RouteInput {
    pub fn validate(&self) -> Result<(), AppError> {
        check_text("name", &self.name, 100)?;
        check_text("regularity", &self.regularity, 20)?;
        check_text("departure_time", &self.departure_time, 255)?;
        check_optional_text("stopover", self.stopover.as_deref(), 255)?;
        if !(0..=i32::from(u16::MAX)).contains(&self.price) {
            return Err(AppError::Validation(format!(
                "price must be between 0 and {}",
                u16::MAX
            )));
        }
        Ok(())
    }

    pub fn into_route(self, id: Option<ObjectId>, bus_station_id: ObjectId) -> Route {
        Route {
            id,
            name: self.name,
            regularity: self.regularity,
            departure_time: self.departure_time,
            stopover: self.stopover.filter(|s| !s.trim().is_empty()),
            price: self.price,
            bus_station_id,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct RouteResponse {
    pub name: String,
    pub flights: Vec<String>,
    pub regularity: String,
    pub departure_time: String,
    pub stopover: Option<String>,
    pub price: i32,
    pub bus_station_name: Option<String>,
    pub bus_station: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> RouteInput {
        RouteInput {
            name: "Маршрут №1".to_string(),
            regularity: "Пн;Ср".to_string(),
            departure_time: "10:00; 22:00".to_string(),
            stopover: Some(" ".to_string()),
            price: 300,
            bus_station: ObjectId::new().to_hex(),
        }
    }

    #[test]
    fn label_prefixes_station() {
        let route = input().into_route(None, ObjectId::new());
        assert_eq!(route.label("Автовокзал №1"), "Автовокзал №1 - Маршрут №1");
    }

    #[test]
    fn blank_stopover_is_dropped() {
        let route = input().into_route(None, ObjectId::new());
        assert_eq!(route.stopover, None);
    }

    #[test]
    fn price_must_fit_small_unsigned() {
        let mut route = input();
        assert!(route.validate().is_ok());
        route.price = -1;
        assert!(route.validate().is_err());
        route.price = 70_000;
        assert!(route.validate().is_err());
    }
}
