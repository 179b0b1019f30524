use chrono::NaiveTime;
use log::info;
use mongodb::bson::doc;

use super::MongoDB;
use crate::error::AppError;
use crate::models::{BusInput, DriverInput, FlightInput, RouteInput, StationInput};

struct SeedFlight {
    route: usize,
    bus: &'static str,
    departure: (u32, u32),
    arrival: (u32, u32),
    free_seats: i32,
}

fn time((h, m): (u32, u32)) -> Result<NaiveTime, AppError> {
    NaiveTime::from_hms_opt(h, m, 0)
        .ok_or_else(|| AppError::Internal(format!("invalid seed time {h}:{m}")))
}

impl MongoDB {
    /// Fills an empty database with the Tula stations timetable. With
    /// `force` everything is wiped first.
    pub async fn seed_data(&self, force: bool) -> Result<(), AppError> {
        if force {
            info!("Force seeding enabled. Clearing all collections...");
            self.tickets().delete_many(doc! {}, None).await?;
            self.flights().delete_many(doc! {}, None).await?;
            self.routes().delete_many(doc! {}, None).await?;
            self.buses().delete_many(doc! {}, None).await?;
            self.drivers().delete_many(doc! {}, None).await?;
            self.stations().delete_many(doc! {}, None).await?;
        }

        let count = self.stations().count_documents(doc! {}, None).await?;
        if count > 0 {
            return Ok(());
        }

        info!("Seeding bus stations, routes and flights...");
        let central = self
            .create_station(StationInput {
                name: "Центральный автовокзал".to_string(),
                office_hours: "05:30 - 22:00".to_string(),
                address: "г. Тула, ул. Восточный обвод, 2".to_string(),
                phone_number: "8-4872-36-00-00".to_string(),
            })
            .await?;
        let south = self
            .create_station(StationInput {
                name: "Автостанция Южная".to_string(),
                office_hours: "06:00 - 20:00".to_string(),
                address: "г. Тула, Новомосковское ш., 9".to_string(),
                phone_number: "8-4872-36-11-11".to_string(),
            })
            .await?;

        let drivers = [
            ("7001 100001", "Евгений", "Иванов", "Иванович", "89001000001", 30),
            ("7001 100002", "Сергей", "Петров", "Андреевич", "89001000002", 45),
            ("7001 100003", "Алексей", "Смирнов", "Олегович", "89001000003", 38),
        ];
        let mut driver_ids = Vec::new();
        for (passport, name, second_name, middle_name, phone, age) in drivers {
            let driver = self
                .create_driver(DriverInput {
                    passport_number: passport.to_string(),
                    name: name.to_string(),
                    second_name: second_name.to_string(),
                    middle_name: middle_name.to_string(),
                    phone_number: phone.to_string(),
                    age,
                })
                .await?;
            driver_ids.push(driver.id.map(|id| id.to_hex()));
        }

        let buses = [
            ("А101ТУ", "ПАЗ 3205", 40),
            ("В202ТУ", "Ford Transit", 18),
            ("Е303ТУ", "Higer KLQ", 45),
        ];
        for ((registration, mark, places), driver) in buses.into_iter().zip(driver_ids) {
            self.create_bus(BusInput {
                registration_number: registration.to_string(),
                mark: mark.to_string(),
                amount_of_places: places,
                driver,
            })
            .await?;
        }

        let routes = [
            (&central, "Москва", "Еж", "06:00; 14:30; 19:00", Some("Серпухов"), 900),
            (&central, "Калуга", "Пн;Ср;Пт", "08:15; 17:45", Some("Алексин"), 550),
            (&south, "Новомосковск", "Еж", "07:00; 12:00", None, 200),
        ];
        let mut route_ids = Vec::new();
        for (station, name, regularity, departures, stopover, price) in routes {
            let station_id = station
                .id
                .ok_or_else(|| AppError::Internal("seeded station has no id".to_string()))?;
            let route = self
                .create_route(RouteInput {
                    name: name.to_string(),
                    regularity: regularity.to_string(),
                    departure_time: departures.to_string(),
                    stopover: stopover.map(str::to_string),
                    price,
                    bus_station: station_id.to_hex(),
                })
                .await?;
            route_ids.push(
                route
                    .id
                    .ok_or_else(|| AppError::Internal("seeded route has no id".to_string()))?,
            );
        }

        let flights = [
            SeedFlight { route: 0, bus: "А101ТУ", departure: (6, 0), arrival: (9, 30), free_seats: 40 },
            SeedFlight { route: 0, bus: "Е303ТУ", departure: (14, 30), arrival: (18, 0), free_seats: 45 },
            SeedFlight { route: 0, bus: "А101ТУ", departure: (19, 0), arrival: (22, 30), free_seats: 12 },
            SeedFlight { route: 1, bus: "В202ТУ", departure: (8, 15), arrival: (10, 45), free_seats: 18 },
            SeedFlight { route: 1, bus: "В202ТУ", departure: (17, 45), arrival: (20, 15), free_seats: 0 },
            SeedFlight { route: 2, bus: "Е303ТУ", departure: (7, 0), arrival: (8, 10), free_seats: 30 },
            SeedFlight { route: 2, bus: "Е303ТУ", departure: (23, 0), arrival: (0, 10), free_seats: 30 },
        ];
        let total = flights.len();
        for flight in flights {
            self.create_flight(FlightInput {
                route: route_ids[flight.route].to_hex(),
                departure_time: time(flight.departure)?,
                arrival_time: time(flight.arrival)?,
                amount_of_free_places: flight.free_seats,
                bus: flight.bus.to_string(),
            })
            .await?;
        }
        info!("Seeding complete with 2 stations, 3 routes and {} flights", total);
        Ok(())
    }
}
