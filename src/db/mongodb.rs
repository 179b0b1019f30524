use chrono::Utc;
use futures::StreamExt;
use log::{error, info, warn};
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client, Collection, IndexModel,
};
use serde::de::DeserializeOwned;

use crate::config::AdminAccount;
use crate::error::AppError;
use crate::models::{
    related_id, Bus, BusInput, BusStation, Driver, DriverInput, Flight, FlightInput,
    LoginRequest, RegisterRequest, Role, Route, RouteInput, Sale, StationInput, Ticket,
    TicketUpdate, User, UserInput, UserUpdate,
};
use crate::schedule::{SeatChange, SeatError};

/// Filter and `$inc` for one seat change. The filter only matches while the
/// counter can move, so the update never leaves `[0, capacity]`.
fn seat_update(flight_id: ObjectId, change: SeatChange) -> (Document, Document) {
    let filter = match change {
        SeatChange::Sell => doc! { "_id": flight_id, "free_seats": { "$gt": 0 } },
        SeatChange::Release { capacity } => {
            doc! { "_id": flight_id, "free_seats": { "$lt": capacity } }
        }
    };
    (filter, doc! { "$inc": { "free_seats": change.delta() } })
}

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db_name: String,
}

async fn fetch_all<T>(
    collection: &Collection<T>,
    filter: Document,
    sort: Document,
) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let options = FindOptions::builder().sort(sort).build();
    let mut cursor = collection.find(filter, options).await?;
    let mut items = Vec::new();
    while let Some(result) = cursor.next().await {
        items.push(result?);
    }
    Ok(items)
}

fn inserted_object_id(id: &bson::Bson) -> Result<ObjectId, AppError> {
    id.as_object_id()
        .ok_or_else(|| AppError::Internal(format!("unexpected inserted id {id}")))
}

fn unique() -> IndexOptions {
    IndexOptions::builder().unique(true).build()
}

fn index(keys: Document, options: Option<IndexOptions>) -> IndexModel {
    IndexModel::builder().keys(keys).options(options).build()
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, mongodb::error::Error> {
        let client_options = mongodb::options::ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        Ok(MongoDB {
            client,
            db_name: db_name.to_string(),
        })
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }

    pub(crate) fn stations(&self) -> Collection<BusStation> {
        self.client.database(&self.db_name).collection("bus_stations")
    }

    pub(crate) fn routes(&self) -> Collection<Route> {
        self.client.database(&self.db_name).collection("routes")
    }

    pub(crate) fn flights(&self) -> Collection<Flight> {
        self.client.database(&self.db_name).collection("flights")
    }

    pub(crate) fn buses(&self) -> Collection<Bus> {
        self.client.database(&self.db_name).collection("buses")
    }

    pub(crate) fn drivers(&self) -> Collection<Driver> {
        self.client.database(&self.db_name).collection("drivers")
    }

    pub(crate) fn tickets(&self) -> Collection<Ticket> {
        self.client.database(&self.db_name).collection("tickets")
    }

    fn users(&self) -> Collection<User> {
        self.client.database(&self.db_name).collection("users")
    }

    /// Ids that do not parse cannot exist, so they read as "not found".
    pub fn string_to_id(&self, resource: &'static str, id: &str) -> Result<ObjectId, AppError> {
        ObjectId::parse_str(id).map_err(|_| AppError::not_found(resource, id))
    }

    fn related_object_id(&self, field: &str, value: &str) -> Result<ObjectId, AppError> {
        let id = related_id(value);
        ObjectId::parse_str(&*id)
            .map_err(|_| AppError::Validation(format!("{field}: invalid reference {value:?}")))
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        self.stations()
            .create_indexes(
                [
                    index(doc! { "name": 1 }, Some(unique())),
                    index(doc! { "address": 1 }, Some(unique())),
                    index(doc! { "phone_number": 1 }, Some(unique())),
                ],
                None,
            )
            .await?;
        self.routes()
            .create_index(index(doc! { "bus_station_id": 1 }, None), None)
            .await?;
        self.flights()
            .create_indexes(
                [
                    index(doc! { "route_id": 1, "departure_time": 1 }, Some(unique())),
                    index(doc! { "bus_id": 1 }, None),
                ],
                None,
            )
            .await?;
        self.buses()
            .create_index(
                index(
                    doc! { "driver_id": 1 },
                    Some(IndexOptions::builder().unique(true).sparse(true).build()),
                ),
                None,
            )
            .await?;
        self.drivers()
            .create_indexes(
                [
                    index(doc! { "passport_number": 1 }, Some(unique())),
                    index(doc! { "phone_number": 1 }, Some(unique())),
                ],
                None,
            )
            .await?;
        self.tickets()
            .create_index(index(doc! { "flight_id": 1 }, None), None)
            .await?;
        self.users()
            .create_indexes(
                [
                    index(doc! { "username": 1 }, Some(unique())),
                    index(doc! { "email": 1 }, Some(unique())),
                ],
                None,
            )
            .await?;
        Ok(())
    }

    // Bus stations

    pub async fn list_stations(&self) -> Result<Vec<BusStation>, AppError> {
        fetch_all(&self.stations(), doc! {}, doc! { "name": 1 }).await
    }

    pub async fn get_station(&self, id: &str) -> Result<BusStation, AppError> {
        let oid = self.string_to_id("Bus station", id)?;
        self.stations()
            .find_one(doc! { "_id": oid }, None)
            .await?
            .ok_or_else(|| AppError::not_found("Bus station", id))
    }

    pub async fn create_station(&self, input: StationInput) -> Result<BusStation, AppError> {
        input.validate()?;
        let mut station = input.into_station(None);
        let result = self.stations().insert_one(&station, None).await?;
        station.id = Some(inserted_object_id(&result.inserted_id)?);
        info!("Created bus station {}", station.name);
        Ok(station)
    }

    pub async fn update_station(&self, id: &str, input: StationInput) -> Result<BusStation, AppError> {
        input.validate()?;
        let oid = self.string_to_id("Bus station", id)?;
        let station = input.into_station(Some(oid));
        let result = self
            .stations()
            .replace_one(doc! { "_id": oid }, &station, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("Bus station", id));
        }
        Ok(station)
    }

    pub async fn delete_station(&self, id: &str) -> Result<(), AppError> {
        let station = self.get_station(id).await?;
        let oid = station.id.ok_or_else(|| AppError::not_found("Bus station", id))?;
        for route in self.list_station_routes(oid).await? {
            if let Some(route_id) = route.id {
                self.delete_flights_where(doc! { "route_id": route_id }).await?;
            }
        }
        let routes = self
            .routes()
            .delete_many(doc! { "bus_station_id": oid }, None)
            .await?;
        self.stations().delete_one(doc! { "_id": oid }, None).await?;
        info!(
            "Deleted bus station {} with {} routes",
            station.name, routes.deleted_count
        );
        Ok(())
    }

    // Routes

    pub async fn list_routes(&self) -> Result<Vec<Route>, AppError> {
        fetch_all(&self.routes(), doc! {}, doc! { "name": 1 }).await
    }

    pub async fn list_station_routes(&self, station_id: ObjectId) -> Result<Vec<Route>, AppError> {
        fetch_all(
            &self.routes(),
            doc! { "bus_station_id": station_id },
            doc! { "name": 1 },
        )
        .await
    }

    pub async fn get_route(&self, id: &str) -> Result<Route, AppError> {
        let oid = self.string_to_id("Route", id)?;
        self.routes()
            .find_one(doc! { "_id": oid }, None)
            .await?
            .ok_or_else(|| AppError::not_found("Route", id))
    }

    async fn resolve_station(&self, reference: &str) -> Result<ObjectId, AppError> {
        let oid = self.related_object_id("bus_station", reference)?;
        match self.stations().find_one(doc! { "_id": oid }, None).await? {
            Some(_) => Ok(oid),
            None => Err(AppError::Validation(format!(
                "bus_station: bus station {oid} does not exist"
            ))),
        }
    }

    pub async fn create_route(&self, input: RouteInput) -> Result<Route, AppError> {
        input.validate()?;
        let station_id = self.resolve_station(&input.bus_station).await?;
        let mut route = input.into_route(None, station_id);
        let result = self.routes().insert_one(&route, None).await?;
        route.id = Some(inserted_object_id(&result.inserted_id)?);
        info!("Created route {}", route.name);
        Ok(route)
    }

    pub async fn update_route(&self, id: &str, input: RouteInput) -> Result<Route, AppError> {
        input.validate()?;
        let oid = self.string_to_id("Route", id)?;
        let station_id = self.resolve_station(&input.bus_station).await?;
        let route = input.into_route(Some(oid), station_id);
        let result = self
            .routes()
            .replace_one(doc! { "_id": oid }, &route, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("Route", id));
        }
        Ok(route)
    }

    pub async fn delete_route(&self, id: &str) -> Result<(), AppError> {
        let route = self.get_route(id).await?;
        let oid = route.id.ok_or_else(|| AppError::not_found("Route", id))?;
        self.delete_flights_where(doc! { "route_id": oid }).await?;
        self.routes().delete_one(doc! { "_id": oid }, None).await?;
        info!("Deleted route {}", route.name);
        Ok(())
    }

    // Flights

    pub async fn list_flights(&self) -> Result<Vec<Flight>, AppError> {
        fetch_all(&self.flights(), doc! {}, doc! { "departure_time": 1 }).await
    }

    /// Flights of one route in ascending departure time.
    pub async fn list_route_flights(&self, route_id: ObjectId) -> Result<Vec<Flight>, AppError> {
        fetch_all(
            &self.flights(),
            doc! { "route_id": route_id },
            doc! { "departure_time": 1 },
        )
        .await
    }

    pub async fn get_flight(&self, id: &str) -> Result<Flight, AppError> {
        let oid = self.string_to_id("Flight", id)?;
        self.flights()
            .find_one(doc! { "_id": oid }, None)
            .await?
            .ok_or_else(|| AppError::not_found("Flight", id))
    }

    async fn prepare_flight(
        &self,
        id: Option<ObjectId>,
        input: FlightInput,
    ) -> Result<Flight, AppError> {
        let route_id = self.related_object_id("route", &input.route)?;
        if self.routes().find_one(doc! { "_id": route_id }, None).await?.is_none() {
            return Err(AppError::Validation(format!(
                "route: route {route_id} does not exist"
            )));
        }
        let bus_id = related_id(&input.bus).to_string();
        let bus = self
            .buses()
            .find_one(doc! { "_id": &bus_id }, None)
            .await?
            .ok_or_else(|| AppError::Validation(format!("bus: bus {bus_id} does not exist")))?;
        input.validate(bus.capacity)?;
        Ok(input.into_flight(id, route_id, bus_id))
    }

    pub async fn create_flight(&self, input: FlightInput) -> Result<Flight, AppError> {
        let mut flight = self.prepare_flight(None, input).await?;
        let result = self.flights().insert_one(&flight, None).await?;
        flight.id = Some(inserted_object_id(&result.inserted_id)?);
        info!(
            "Created flight at {} on route {}",
            flight.departure_time, flight.route_id
        );
        Ok(flight)
    }

    pub async fn update_flight(&self, id: &str, input: FlightInput) -> Result<Flight, AppError> {
        let oid = self.string_to_id("Flight", id)?;
        let flight = self.prepare_flight(Some(oid), input).await?;
        let result = self
            .flights()
            .replace_one(doc! { "_id": oid }, &flight, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("Flight", id));
        }
        Ok(flight)
    }

    pub async fn delete_flight(&self, id: &str) -> Result<(), AppError> {
        let oid = self.string_to_id("Flight", id)?;
        let deleted = self.delete_flights_where(doc! { "_id": oid }).await?;
        if deleted == 0 {
            return Err(AppError::not_found("Flight", id));
        }
        Ok(())
    }

    /// Deletes matching flights together with their tickets.
    async fn delete_flights_where(&self, filter: Document) -> Result<u64, AppError> {
        let ids: Vec<ObjectId> = fetch_all(&self.flights(), filter, doc! {})
            .await?
            .into_iter()
            .filter_map(|flight| flight.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let tickets = self
            .tickets()
            .delete_many(doc! { "flight_id": { "$in": ids.clone() } }, None)
            .await?;
        let flights = self
            .flights()
            .delete_many(doc! { "_id": { "$in": ids } }, None)
            .await?;
        info!(
            "Deleted {} flights and {} tickets",
            flights.deleted_count, tickets.deleted_count
        );
        Ok(flights.deleted_count)
    }

    // Buses

    pub async fn list_buses(&self) -> Result<Vec<Bus>, AppError> {
        fetch_all(&self.buses(), doc! {}, doc! { "mark": 1 }).await
    }

    pub async fn get_bus(&self, registration_number: &str) -> Result<Bus, AppError> {
        self.buses()
            .find_one(doc! { "_id": registration_number }, None)
            .await?
            .ok_or_else(|| AppError::not_found("Bus", registration_number))
    }

    async fn resolve_driver(&self, reference: Option<&str>) -> Result<Option<ObjectId>, AppError> {
        let Some(reference) = reference.filter(|r| !r.trim().is_empty()) else {
            return Ok(None);
        };
        let oid = self.related_object_id("driver", reference)?;
        match self.drivers().find_one(doc! { "_id": oid }, None).await? {
            Some(_) => Ok(Some(oid)),
            None => Err(AppError::Validation(format!(
                "driver: driver {oid} does not exist"
            ))),
        }
    }

    pub async fn create_bus(&self, input: BusInput) -> Result<Bus, AppError> {
        input.validate()?;
        let driver_id = self.resolve_driver(input.driver.as_deref()).await?;
        let bus = input.into_bus(driver_id);
        self.buses().insert_one(&bus, None).await?;
        info!("Created bus {}", bus);
        Ok(bus)
    }

    pub async fn update_bus(&self, registration_number: &str, input: BusInput) -> Result<Bus, AppError> {
        input.validate()?;
        if input.registration_number != registration_number {
            return Err(AppError::Validation(
                "registration_number identifies the bus and cannot be changed".to_string(),
            ));
        }
        let overbooked = self
            .flights()
            .count_documents(
                doc! { "bus_id": registration_number, "free_seats": { "$gt": input.amount_of_places } },
                None,
            )
            .await?;
        if overbooked > 0 {
            return Err(AppError::Validation(format!(
                "amount_of_places: {overbooked} flights have more free seats than {}",
                input.amount_of_places
            )));
        }
        let driver_id = self.resolve_driver(input.driver.as_deref()).await?;
        let bus = input.into_bus(driver_id);
        let result = self
            .buses()
            .replace_one(doc! { "_id": registration_number }, &bus, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("Bus", registration_number));
        }
        Ok(bus)
    }

    pub async fn delete_bus(&self, registration_number: &str) -> Result<(), AppError> {
        let bus = self.get_bus(registration_number).await?;
        self.delete_flights_where(doc! { "bus_id": registration_number })
            .await?;
        self.buses()
            .delete_one(doc! { "_id": registration_number }, None)
            .await?;
        info!("Deleted bus {}", bus);
        Ok(())
    }

    // Drivers

    pub async fn list_drivers(&self) -> Result<Vec<Driver>, AppError> {
        fetch_all(
            &self.drivers(),
            doc! {},
            doc! { "name": 1, "second_name": 1, "middle_name": 1 },
        )
        .await
    }

    pub async fn get_driver(&self, id: &str) -> Result<Driver, AppError> {
        let oid = self.string_to_id("Driver", id)?;
        self.drivers()
            .find_one(doc! { "_id": oid }, None)
            .await?
            .ok_or_else(|| AppError::not_found("Driver", id))
    }

    pub async fn create_driver(&self, input: DriverInput) -> Result<Driver, AppError> {
        input.validate()?;
        let mut driver = input.into_driver(None);
        let result = self.drivers().insert_one(&driver, None).await?;
        driver.id = Some(inserted_object_id(&result.inserted_id)?);
        info!("Created driver {}", driver);
        Ok(driver)
    }

    pub async fn update_driver(&self, id: &str, input: DriverInput) -> Result<Driver, AppError> {
        input.validate()?;
        let oid = self.string_to_id("Driver", id)?;
        let driver = input.into_driver(Some(oid));
        let result = self
            .drivers()
            .replace_one(doc! { "_id": oid }, &driver, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("Driver", id));
        }
        Ok(driver)
    }

    /// Drivers are detached from their bus, the bus stays.
    pub async fn delete_driver(&self, id: &str) -> Result<(), AppError> {
        let oid = self.string_to_id("Driver", id)?;
        let result = self.drivers().delete_one(doc! { "_id": oid }, None).await?;
        if result.deleted_count == 0 {
            return Err(AppError::not_found("Driver", id));
        }
        self.buses()
            .update_many(
                doc! { "driver_id": oid },
                doc! { "$unset": { "driver_id": "" } },
                None,
            )
            .await?;
        Ok(())
    }

    // Tickets and seats

    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, AppError> {
        fetch_all(&self.tickets(), doc! {}, doc! { "registration_time": -1 }).await
    }

    pub async fn get_ticket(&self, id: &str) -> Result<Ticket, AppError> {
        let oid = self.string_to_id("Ticket", id)?;
        self.tickets()
            .find_one(doc! { "_id": oid }, None)
            .await?
            .ok_or_else(|| AppError::not_found("Ticket", id))
    }

    /// Moves the free-seat counter in one conditional update, so two sales
    /// racing for the last seat cannot both succeed.
    pub async fn adjust_free_seats(
        &self,
        flight_id: ObjectId,
        change: SeatChange,
    ) -> Result<Flight, AppError> {
        let (filter, update) = seat_update(flight_id, change);
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .flights()
            .find_one_and_update(filter, update, options)
            .await?;
        if let Some(flight) = updated {
            return Ok(flight);
        }

        let flight = self
            .flights()
            .find_one(doc! { "_id": flight_id }, None)
            .await?
            .ok_or_else(|| AppError::not_found("Flight", flight_id))?;
        match change.apply(flight.free_seats) {
            Err(SeatError::SoldOut) => Err(AppError::NoFreeSeats(flight_id.to_hex())),
            Err(e @ SeatError::AtCapacity { .. }) => Err(AppError::Conflict(e.to_string())),
            Ok(_) => Err(AppError::Conflict(
                "the free seat count changed concurrently, try again".to_string(),
            )),
        }
    }

    /// Gives a seat back to a flight. Flights that are gone or already at
    /// full capacity are left alone.
    async fn release_seat(&self, flight_id: ObjectId) -> Result<Option<Flight>, AppError> {
        let Some(flight) = self.flights().find_one(doc! { "_id": flight_id }, None).await? else {
            warn!("Flight {} no longer exists, seat not returned", flight_id);
            return Ok(None);
        };
        let Some(bus) = self
            .buses()
            .find_one(doc! { "_id": &flight.bus_id }, None)
            .await?
        else {
            warn!("Bus {} of flight {} is missing, seat not returned", flight.bus_id, flight_id);
            return Ok(None);
        };
        match self
            .adjust_free_seats(flight_id, SeatChange::Release { capacity: bus.capacity })
            .await
        {
            Ok(flight) => Ok(Some(flight)),
            Err(AppError::Conflict(reason)) => {
                warn!("Seat not returned to flight {}: {}", flight_id, reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn sell_ticket(&self, sale: Sale) -> Result<Ticket, AppError> {
        sale.validate()?;
        let flight_id = sale.flight_id;
        let flight = self.adjust_free_seats(flight_id, SeatChange::Sell).await?;

        let mut ticket = sale.into_ticket(Utc::now());
        match self.tickets().insert_one(&ticket, None).await {
            Ok(result) => {
                ticket.id = Some(inserted_object_id(&result.inserted_id)?);
                info!(
                    "Sold ticket to {} on flight {}, {} seats left",
                    ticket.user, flight_id, flight.free_seats
                );
                Ok(ticket)
            }
            Err(e) => {
                error!("Ticket insert failed for flight {}: {}", flight_id, e);
                if let Err(undo) = self.release_seat(flight_id).await {
                    error!("Could not return seat to flight {}: {}", flight_id, undo);
                }
                Err(e.into())
            }
        }
    }

    pub async fn update_ticket(&self, id: &str, update: TicketUpdate) -> Result<Ticket, AppError> {
        update.validate()?;
        let oid = self.string_to_id("Ticket", id)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.tickets()
            .find_one_and_update(
                doc! { "_id": oid },
                doc! { "$set": { "user": &update.user, "seller": &update.seller } },
                options,
            )
            .await?
            .ok_or_else(|| AppError::not_found("Ticket", id))
    }

    /// Deletes the ticket and returns its seat to the flight.
    pub async fn cancel_ticket(&self, id: &str) -> Result<Ticket, AppError> {
        let oid = self.string_to_id("Ticket", id)?;
        let ticket = self
            .tickets()
            .find_one_and_delete(doc! { "_id": oid }, None)
            .await?
            .ok_or_else(|| AppError::not_found("Ticket", id))?;
        self.release_seat(ticket.flight_id).await?;
        info!("Cancelled ticket {} on flight {}", id, ticket.flight_id);
        Ok(ticket)
    }

    // Users

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        fetch_all(&self.users(), doc! {}, doc! { "username": 1 }).await
    }

    pub async fn get_user(&self, id: &str) -> Result<User, AppError> {
        let oid = self.string_to_id("User", id)?;
        self.users()
            .find_one(doc! { "_id": oid }, None)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    /// Account behind a token subject; `None` when it is gone.
    pub async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        Ok(self.users().find_one(doc! { "_id": oid }, None).await?)
    }

    pub async fn create_user(&self, input: UserInput) -> Result<User, AppError> {
        input.validate()?;
        let collection = self.users();

        // Check if user already exists
        let existing_user = collection
            .find_one(
                doc! { "$or": [ { "email": &input.email }, { "username": &input.username } ] },
                None,
            )
            .await?;
        if existing_user.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let hashed_password = bcrypt::hash(&input.password, bcrypt::DEFAULT_COST)?;
        let now = bson::DateTime::now();
        let mut user = User {
            id: None,
            username: input.username,
            email: input.email,
            password: hashed_password,
            first_name: input.first_name,
            last_name: input.last_name,
            role: input.role.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        let result = collection.insert_one(&user, None).await?;
        user.id = Some(inserted_object_id(&result.inserted_id)?);
        info!("Created {} account {}", user.role, user.username);
        Ok(user)
    }

    /// Self-service sign up always yields a plain user.
    pub async fn register_user(&self, request: RegisterRequest) -> Result<User, AppError> {
        request.validate()?;
        self.create_user(UserInput {
            username: request.username,
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            role: Some(Role::User),
        })
        .await
    }

    pub async fn authenticate_user(&self, credentials: &LoginRequest) -> Result<User, AppError> {
        let user = self
            .users()
            .find_one(doc! { "email": &credentials.email }, None)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = bcrypt::verify(&credentials.password, &user.password).map_err(|e| {
            error!("Bcrypt verification error: {}", e);
            e
        })?;
        if valid {
            info!("User {} authenticated successfully", user.email);
            Ok(user)
        } else {
            warn!("Invalid password attempt for email: {}", credentials.email);
            Err(AppError::InvalidCredentials)
        }
    }

    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<User, AppError> {
        update.validate()?;
        let oid = self.string_to_id("User", id)?;
        let mut set = doc! {
            "username": &update.username,
            "email": &update.email,
            "first_name": &update.first_name,
            "last_name": &update.last_name,
            "updated_at": bson::DateTime::now(),
        };
        if let Some(role) = update.role {
            set.insert("role", role.as_str());
        }
        if let Some(password) = &update.password {
            set.insert("password", bcrypt::hash(password, bcrypt::DEFAULT_COST)?);
        }
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.users()
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set }, options)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let oid = self.string_to_id("User", id)?;
        let result = self.users().delete_one(doc! { "_id": oid }, None).await?;
        if result.deleted_count == 0 {
            return Err(AppError::not_found("User", id));
        }
        Ok(())
    }

    /// Creates the configured superuser unless an account with that email
    /// already exists.
    pub async fn ensure_admin(&self, admin: &AdminAccount) -> Result<(), AppError> {
        let existing = self
            .users()
            .find_one(doc! { "email": &admin.email }, None)
            .await?;
        if existing.is_some() {
            return Ok(());
        }
        self.create_user(UserInput {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            first_name: String::new(),
            last_name: String::new(),
            role: Some(Role::Superuser),
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_only_matches_flights_with_free_seats() {
        let id = ObjectId::new();
        let (filter, update) = seat_update(id, SeatChange::Sell);
        assert_eq!(filter, doc! { "_id": id, "free_seats": { "$gt": 0 } });
        assert_eq!(update, doc! { "$inc": { "free_seats": -1 } });
    }

    #[test]
    fn release_is_bounded_by_the_bus_capacity() {
        let id = ObjectId::new();
        let (filter, update) = seat_update(id, SeatChange::Release { capacity: 18 });
        assert_eq!(filter, doc! { "_id": id, "free_seats": { "$lt": 18 } });
        assert_eq!(update, doc! { "$inc": { "free_seats": 1 } });
    }
}
