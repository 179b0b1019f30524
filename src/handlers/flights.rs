use actix_web::{web, HttpRequest, HttpResponse};

use super::links::{Labels, Links, BUSES, FLIGHTS, ROUTES};
use crate::auth::authorize;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{Flight, FlightInput, FlightResponse};

pub(crate) fn flight_response(
    flight: &Flight,
    route_name: Option<&str>,
    links: &Links,
) -> FlightResponse {
    FlightResponse {
        route_name: route_name.map(str::to_string),
        route: links.item(ROUTES, flight.route_id),
        departure_time: flight.departure_time.format("%H:%M:%S").to_string(),
        arrival_time: flight.arrival_time.format("%H:%M:%S").to_string(),
        travel_time: flight.travel_time(),
        amount_of_free_places: flight.free_seats,
        url: links.object(FLIGHTS, flight.id),
        bus_registration_number: flight.bus_id.clone(),
        bus: links.item(BUSES, &flight.bus_id),
    }
}

async fn respond(
    req: &HttpRequest,
    db: &MongoDB,
    flight: &Flight,
) -> Result<FlightResponse, AppError> {
    let route = match db.get_route(&flight.route_id.to_hex()).await {
        Ok(route) => Some(route),
        Err(AppError::NotFound { .. }) => None,
        Err(e) => return Err(e),
    };
    let links = Links::from_request(req);
    Ok(flight_response(
        flight,
        route.as_ref().map(|r| r.name.as_str()),
        &links,
    ))
}

pub async fn list(req: HttpRequest, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let links = Links::from_request(&req);
    let labels = Labels::load(&db).await?;
    let flights = db.list_flights().await?;
    let body: Vec<_> = flights
        .iter()
        .map(|f| {
            let route_name = labels.route(&f.route_id).map(|r| r.name.as_str());
            flight_response(f, route_name, &links)
        })
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn create(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    input: web::Json<FlightInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let flight = db.create_flight(input.into_inner()).await?;
    let body = respond(&req, &db, &flight).await?;
    Ok(HttpResponse::Created()
        .insert_header(("Location", body.url.clone()))
        .json(body))
}

pub async fn retrieve(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let flight = db.get_flight(&path).await?;
    Ok(HttpResponse::Ok().json(respond(&req, &db, &flight).await?))
}

pub async fn update(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
    input: web::Json<FlightInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let flight = db.update_flight(&path, input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(respond(&req, &db, &flight).await?))
}

/// Deletes the flight and every ticket sold for it.
pub async fn destroy(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    db.delete_flight(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
