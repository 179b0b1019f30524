use actix_web::{web, HttpRequest, HttpResponse};

use super::links::{Labels, Links, BUSES, DRIVERS};
use crate::auth::authorize;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{Bus, BusInput, BusResponse, Driver, Flight};

pub(crate) fn bus_response(
    bus: &Bus,
    driver: Option<&Driver>,
    flights: &[Flight],
    labels: &Labels,
    links: &Links,
) -> BusResponse {
    BusResponse {
        registration_number: bus.registration_number.clone(),
        mark: bus.mark.clone(),
        amount_of_places: bus.capacity,
        url: links.item(BUSES, &bus.registration_number),
        driver_name: driver.map(|d| d.name.clone()),
        driver_second_name: driver.map(|d| d.second_name.clone()),
        driver: bus.driver_id.map(|id| links.item(DRIVERS, id)),
        flights: flights
            .iter()
            .filter(|f| f.bus_id == bus.registration_number)
            .map(|f| labels.flight_label(f))
            .collect(),
    }
}

async fn respond(req: &HttpRequest, db: &MongoDB, bus: &Bus) -> Result<BusResponse, AppError> {
    let driver = match bus.driver_id {
        Some(id) => match db.get_driver(&id.to_hex()).await {
            Ok(driver) => Some(driver),
            Err(AppError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };
    let labels = Labels::load(db).await?;
    let flights = db.list_flights().await?;
    let links = Links::from_request(req);
    Ok(bus_response(bus, driver.as_ref(), &flights, &labels, &links))
}

pub async fn list(req: HttpRequest, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let links = Links::from_request(&req);
    let labels = Labels::load(&db).await?;
    let buses = db.list_buses().await?;
    let drivers = db.list_drivers().await?;
    let flights = db.list_flights().await?;
    let body: Vec<_> = buses
        .iter()
        .map(|bus| {
            let driver = drivers.iter().find(|d| d.id.is_some() && d.id == bus.driver_id);
            bus_response(bus, driver, &flights, &labels, &links)
        })
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn create(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    input: web::Json<BusInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let bus = db.create_bus(input.into_inner()).await?;
    let body = respond(&req, &db, &bus).await?;
    Ok(HttpResponse::Created()
        .insert_header(("Location", body.url.clone()))
        .json(body))
}

pub async fn retrieve(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let bus = db.get_bus(&path).await?;
    Ok(HttpResponse::Ok().json(respond(&req, &db, &bus).await?))
}

pub async fn update(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
    input: web::Json<BusInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let bus = db.update_bus(&path, input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(respond(&req, &db, &bus).await?))
}

/// Deletes the bus together with its flights.
pub async fn destroy(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    db.delete_bus(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
