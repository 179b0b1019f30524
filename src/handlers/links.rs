//! Absolute hyperlinks and display labels used by the API representations.

use actix_web::HttpRequest;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use std::fmt::Display;

use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{BusStation, Flight, Route};

pub const STATIONS: &str = "bus_stations";
pub const ROUTES: &str = "routes";
pub const FLIGHTS: &str = "flights";
pub const BUSES: &str = "buses";
pub const DRIVERS: &str = "drivers";
pub const TICKETS: &str = "tickets";
pub const USERS: &str = "users";

pub const RESOURCES: [&str; 7] = [USERS, STATIONS, ROUTES, FLIGHTS, BUSES, DRIVERS, TICKETS];

#[derive(Debug, Clone)]
pub struct Links {
    base: String,
}

impl Links {
    pub fn new(base: impl Into<String>) -> Self {
        Links {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_request(req: &HttpRequest) -> Self {
        let info = req.connection_info();
        Links::new(format!("{}://{}", info.scheme(), info.host()))
    }

    pub fn collection(&self, resource: &str) -> String {
        format!("{}/api/{}/", self.base, resource)
    }

    /// The id is percent-encoded, so registration numbers in Cyrillic stay
    /// a single valid path segment.
    pub fn item(&self, resource: &str, id: impl Display) -> String {
        let id = id.to_string();
        format!("{}/api/{}/{}/", self.base, resource, urlencoding::encode(&id))
    }

    /// Link for an optional id; records without one link to their collection.
    pub fn object(&self, resource: &str, id: Option<ObjectId>) -> String {
        match id {
            Some(id) => self.item(resource, id),
            None => self.collection(resource),
        }
    }
}

/// Station and route names needed to print routes and flights the way the
/// pages and the API show them.
#[derive(Debug, Default)]
pub struct Labels {
    stations: HashMap<ObjectId, String>,
    routes: HashMap<ObjectId, Route>,
}

impl Labels {
    pub fn new(stations: &[BusStation], routes: &[Route]) -> Self {
        Labels {
            stations: stations
                .iter()
                .filter_map(|s| s.id.map(|id| (id, s.name.clone())))
                .collect(),
            routes: routes
                .iter()
                .filter_map(|r| r.id.map(|id| (id, r.clone())))
                .collect(),
        }
    }

    pub async fn load(db: &MongoDB) -> Result<Self, AppError> {
        let stations = db.list_stations().await?;
        let routes = db.list_routes().await?;
        Ok(Labels::new(&stations, &routes))
    }

    pub fn station_name(&self, id: &ObjectId) -> Option<&str> {
        self.stations.get(id).map(String::as_str)
    }

    pub fn route(&self, id: &ObjectId) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn route_label(&self, route: &Route) -> String {
        let station = self
            .station_name(&route.bus_station_id)
            .map(str::to_string)
            .unwrap_or_else(|| route.bus_station_id.to_hex());
        route.label(&station)
    }

    pub fn flight_label(&self, flight: &Flight) -> String {
        let route = self
            .route(&flight.route_id)
            .map(|r| self.route_label(r))
            .unwrap_or_else(|| flight.route_id.to_hex());
        flight.label(&route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use chrono::NaiveTime;

    #[test]
    fn links_are_absolute() {
        let req = TestRequest::default()
            .insert_header(("Host", "avtovokzal.example:8080"))
            .to_http_request();
        let links = Links::from_request(&req);
        assert_eq!(
            links.item(ROUTES, "abc"),
            "http://avtovokzal.example:8080/api/routes/abc/"
        );
        assert_eq!(
            Links::new("https://tula.example/").collection(BUSES),
            "https://tula.example/api/buses/"
        );
    }

    #[test]
    fn item_ids_are_percent_encoded() {
        let links = Links::new("http://localhost:8080");
        let url = links.item(BUSES, "А101ТУ");
        assert_eq!(url, "http://localhost:8080/api/buses/%D0%90101%D0%A2%D0%A3/");
        assert_eq!(crate::models::related_id(&url), "А101ТУ");
    }

    #[test]
    fn labels_chain_station_route_and_flight() {
        let station = BusStation {
            id: Some(ObjectId::new()),
            name: "A".to_string(),
            office_hours: "10:00 - 22:00".to_string(),
            address: "Tula".to_string(),
            phone_number: "1".to_string(),
        };
        let route = Route {
            id: Some(ObjectId::new()),
            name: "R".to_string(),
            regularity: "Еж".to_string(),
            departure_time: "11:00".to_string(),
            stopover: None,
            price: 300,
            bus_station_id: station.id.unwrap(),
        };
        let flight = Flight {
            id: None,
            route_id: route.id.unwrap(),
            departure_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            free_seats: 5,
            bus_id: "E1KX".to_string(),
        };
        let labels = Labels::new(&[station], &[route.clone()]);
        assert_eq!(labels.route_label(&route), "A - R");
        assert_eq!(labels.flight_label(&flight), "A - R - 11:00:00");
    }
}
