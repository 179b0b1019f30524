use std::collections::HashMap;

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use chrono::Utc;
use log::info;
use minijinja::context;
use serde::{Deserialize, Serialize};

use super::{redirect, Templates};
use crate::auth::require_user;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::handlers::links::Labels;
use crate::models::{related_id, BusStation, Flight, Route, Sale, Ticket};
use crate::schedule::next_flight;

#[derive(Serialize)]
struct StationRow {
    id: String,
    name: String,
    office_hours: String,
    address: String,
    phone_number: String,
}

impl From<&BusStation> for StationRow {
    fn from(station: &BusStation) -> Self {
        StationRow {
            id: station.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: station.name.clone(),
            office_hours: station.office_hours.clone(),
            address: station.address.clone(),
            phone_number: station.phone_number.clone(),
        }
    }
}

#[derive(Serialize)]
struct RouteRow {
    id: String,
    name: String,
    regularity: String,
    departure_time: String,
    stopover: Option<String>,
    price: i32,
}

impl From<&Route> for RouteRow {
    fn from(route: &Route) -> Self {
        RouteRow {
            id: route.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: route.name.clone(),
            regularity: route.regularity.clone(),
            departure_time: route.departure_time.clone(),
            stopover: route.stopover.clone(),
            price: route.price,
        }
    }
}

#[derive(Serialize)]
struct FlightRow {
    id: String,
    departure_time: String,
    arrival_time: String,
    travel_time: String,
    free_seats: i32,
    bus: String,
    is_next: bool,
}

#[derive(Serialize)]
struct FlightOption {
    id: String,
    label: String,
    free_seats: i32,
}

#[derive(Serialize)]
struct TicketRow {
    id: String,
    flight: String,
    user: String,
    seller: String,
    registration_time: String,
}

#[derive(Debug, Deserialize)]
pub struct BuyQuery {
    pub flight: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BuyForm {
    pub flight: String,
    pub user: String,
}

fn ticket_row(ticket: &Ticket, flight_label: String, config: &Config) -> TicketRow {
    TicketRow {
        id: ticket.id.map(|id| id.to_hex()).unwrap_or_default(),
        flight: flight_label,
        user: ticket.user.clone(),
        seller: ticket.seller.clone(),
        registration_time: ticket
            .registration_time
            .with_timezone(&config.utc_offset)
            .format("%d.%m.%Y %H:%M")
            .to_string(),
    }
}

pub async fn index(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
) -> HttpResponse {
    let result = async {
        let claims = require_user(&req, &db, &config).await?;
        let stations = db.list_stations().await?;
        let rows: Vec<StationRow> = stations.iter().map(StationRow::from).collect();
        templates.page("index.html", context! { user => claims.username, bus_stations => rows })
    };
    templates.finish(result.await)
}

pub async fn station_routes(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
    path: web::Path<String>,
) -> HttpResponse {
    let result = async {
        let claims = require_user(&req, &db, &config).await?;
        let station = db.get_station(&path).await?;
        let station_id = db.string_to_id("Bus station", &path)?;
        let routes = db.list_station_routes(station_id).await?;
        let rows: Vec<RouteRow> = routes.iter().map(RouteRow::from).collect();
        templates.page(
            "routes.html",
            context! {
                user => claims.username,
                bus_station => StationRow::from(&station),
                routes => rows,
            },
        )
    };
    templates.finish(result.await)
}

/// Flights of a route with the next one still open for sale highlighted.
pub async fn route_flights(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
    path: web::Path<String>,
) -> HttpResponse {
    let result = async {
        let claims = require_user(&req, &db, &config).await?;
        let route = db.get_route(&path).await?;
        let route_id = db.string_to_id("Route", &path)?;
        let labels = Labels::load(&db).await?;
        let flights = db.list_route_flights(route_id).await?;
        let buses: HashMap<String, String> = db
            .list_buses()
            .await?
            .into_iter()
            .map(|bus| (bus.registration_number.clone(), bus.to_string()))
            .collect();

        let next_id = next_flight(&flights, Utc::now(), config.utc_offset).and_then(|f| f.id);
        let rows: Vec<FlightRow> = flights
            .iter()
            .map(|flight| FlightRow {
                id: flight.id.map(|id| id.to_hex()).unwrap_or_default(),
                departure_time: flight.departure_time.format("%H:%M").to_string(),
                arrival_time: flight.arrival_time.format("%H:%M").to_string(),
                travel_time: flight.travel_time().to_string(),
                free_seats: flight.free_seats,
                bus: buses
                    .get(&flight.bus_id)
                    .cloned()
                    .unwrap_or_else(|| flight.bus_id.clone()),
                is_next: next_id.is_some() && flight.id == next_id,
            })
            .collect();

        templates.page(
            "flights.html",
            context! {
                user => claims.username,
                route => RouteRow::from(&route),
                route_label => labels.route_label(&route),
                bus_station_id => route.bus_station_id.to_hex(),
                flights => rows,
                has_next => next_id.is_some(),
            },
        )
    };
    templates.finish(result.await)
}

async fn flight_options(db: &MongoDB) -> Result<Vec<FlightOption>, AppError> {
    let labels = Labels::load(db).await?;
    let flights: Vec<Flight> = db.list_flights().await?;
    Ok(flights
        .iter()
        .map(|flight| FlightOption {
            id: flight.id.map(|id| id.to_hex()).unwrap_or_default(),
            label: labels.flight_label(flight),
            free_seats: flight.free_seats,
        })
        .collect())
}

async fn sale_form(
    db: &MongoDB,
    templates: &Templates,
    status: StatusCode,
    username: String,
    selected: Option<String>,
    buyer: Option<String>,
    error: Option<String>,
) -> Result<HttpResponse, AppError> {
    let flights = flight_options(db).await?;
    templates.page_with(
        status,
        "buy_ticket.html",
        context! {
            user => username,
            flights => flights,
            selected => selected,
            buyer => buyer,
            error => error,
        },
    )
}

pub async fn buy_ticket_form(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
    query: web::Query<BuyQuery>,
) -> HttpResponse {
    let result = async {
        let claims = require_user(&req, &db, &config).await?;
        let selected = query.into_inner().flight;
        sale_form(&db, &templates, StatusCode::OK, claims.username, selected, None, None).await
    };
    templates.finish(result.await)
}

/// Sells a ticket on behalf of the logged-in cashier.
pub async fn buy_ticket(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
    form: web::Form<BuyForm>,
) -> HttpResponse {
    let result = async {
        let claims = require_user(&req, &db, &config).await?;
        let form = form.into_inner();
        let sale = db
            .string_to_id("Flight", &related_id(&form.flight))
            .map(|flight_id| Sale {
                flight_id,
                user: form.user.clone(),
                seller: claims.username.clone(),
            });
        let sold = match sale {
            Ok(sale) => db.sell_ticket(sale).await,
            Err(err) => Err(err),
        };
        match sold {
            Ok(ticket) => {
                let id = ticket.id.map(|id| id.to_hex()).unwrap_or_default();
                info!("Ticket {} sold by {}", id, claims.username);
                Ok(redirect(&format!("/index/tickets/{id}/")))
            }
            Err(
                err @ (AppError::Validation(_)
                | AppError::NoFreeSeats(_)
                | AppError::NotFound { .. }),
            ) => {
                sale_form(
                    &db,
                    &templates,
                    err.status_code(),
                    claims.username,
                    Some(form.flight),
                    Some(form.user),
                    Some(err.public_message()),
                )
                .await
            }
            Err(err) => Err(err),
        }
    };
    templates.finish(result.await)
}

pub async fn tickets(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
) -> HttpResponse {
    let result = async {
        let claims = require_user(&req, &db, &config).await?;
        let labels = Labels::load(&db).await?;
        let flights: HashMap<_, _> = db
            .list_flights()
            .await?
            .into_iter()
            .filter_map(|f| f.id.map(|id| (id, labels.flight_label(&f))))
            .collect();
        let rows: Vec<TicketRow> = db
            .list_tickets()
            .await?
            .iter()
            .map(|ticket| {
                let label = flights
                    .get(&ticket.flight_id)
                    .cloned()
                    .unwrap_or_else(|| ticket.flight_id.to_hex());
                ticket_row(ticket, label, &config)
            })
            .collect();
        templates.page("tickets.html", context! { user => claims.username, tickets => rows })
    };
    templates.finish(result.await)
}

pub async fn ticket_detail(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
    path: web::Path<String>,
) -> HttpResponse {
    let result = async {
        let claims = require_user(&req, &db, &config).await?;
        let ticket = db.get_ticket(&path).await?;
        let labels = Labels::load(&db).await?;
        let flight = match db.get_flight(&ticket.flight_id.to_hex()).await {
            Ok(flight) => Some(flight),
            Err(AppError::NotFound { .. }) => None,
            Err(err) => return Err(err),
        };
        let label = flight
            .as_ref()
            .map(|f| labels.flight_label(f))
            .unwrap_or_else(|| ticket.flight_id.to_hex());
        let price = flight
            .as_ref()
            .and_then(|f| labels.route(&f.route_id))
            .map(|route| route.price);
        let travel_time = flight.as_ref().map(|f| f.travel_time().to_string());
        templates.page(
            "ticket.html",
            context! {
                user => claims.username,
                ticket => ticket_row(&ticket, label, &config),
                price => price,
                travel_time => travel_time,
            },
        )
    };
    templates.finish(result.await)
}

pub async fn cancel_ticket(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
    path: web::Path<String>,
) -> HttpResponse {
    let result = async {
        let claims = require_user(&req, &db, &config).await?;
        db.cancel_ticket(&path).await?;
        info!("Ticket {} cancelled by {}", path.as_str(), claims.username);
        Ok::<_, AppError>(redirect("/index/tickets/"))
    };
    templates.finish(result.await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use mongodb::bson::oid::ObjectId;

    fn flight_row(id: &str, departure: &str, free_seats: i32, is_next: bool) -> FlightRow {
        FlightRow {
            id: id.to_string(),
            departure_time: departure.to_string(),
            arrival_time: "12:00".to_string(),
            travel_time: "2:0:00".to_string(),
            free_seats,
            bus: "ПАЗ А101ТУ".to_string(),
            is_next,
        }
    }

    #[test]
    fn flights_page_highlights_the_next_flight() {
        let templates = Templates::new().unwrap();
        let body = templates
            .render(
                "flights.html",
                context! {
                    user => "cashier",
                    route_label => "Центральный - Тула - Москва",
                    bus_station_id => "65f0",
                    flights => vec![
                        flight_row("a1", "10:00", 0, false),
                        flight_row("b2", "11:00", 5, true),
                    ],
                    has_next => true,
                },
            )
            .unwrap();
        assert_eq!(body.matches("class=\"next\"").count(), 1);
        assert!(body.contains("/index/buy_ticket/?flight=b2"));
        assert!(!body.contains("/index/buy_ticket/?flight=a1"));
        assert!(!body.contains("свободных рейсов нет"));
    }

    #[test]
    fn sale_form_keeps_the_selected_flight_and_error() {
        let templates = Templates::new().unwrap();
        let flights = vec![FlightOption {
            id: "b2".to_string(),
            label: "Центральный - Тула - Москва - 11:00:00".to_string(),
            free_seats: 0,
        }];
        let body = templates
            .render(
                "buy_ticket.html",
                context! {
                    user => "cashier",
                    flights => flights,
                    selected => "b2",
                    buyer => "Иванов",
                    error => "no free seats left on flight b2",
                },
            )
            .unwrap();
        assert!(body.contains("selected"));
        assert!(body.contains("disabled"));
        assert!(body.contains("value=\"Иванов\""));
        assert!(body.contains("no free seats left"));
    }

    #[test]
    fn ticket_rows_show_local_registration_time() {
        let config = Config::from_lookup(|key| match key {
            "UTC_OFFSET_HOURS" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();
        let ticket = Ticket {
            id: Some(ObjectId::new()),
            flight_id: ObjectId::new(),
            user: "Иванов".to_string(),
            seller: "cashier".to_string(),
            registration_time: Utc.with_ymd_and_hms(2024, 3, 1, 21, 30, 0).unwrap(),
        };
        let row = ticket_row(&ticket, "label".to_string(), &config);
        assert_eq!(row.registration_time, "02.03.2024 00:30");
        assert_eq!(config.utc_offset, FixedOffset::east_opt(3 * 3600).unwrap());
    }
}
