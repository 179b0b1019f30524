use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::debug;

use super::flights::flight_response;
use super::links::{Labels, Links, ROUTES, STATIONS};
use crate::auth::authorize;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{Flight, Route, RouteInput, RouteResponse};
use crate::schedule::next_flight as find_next_flight;

pub(crate) fn route_response(
    route: &Route,
    station_name: Option<&str>,
    flights: &[Flight],
    links: &Links,
) -> RouteResponse {
    let station_label = station_name
        .map(str::to_string)
        .unwrap_or_else(|| route.bus_station_id.to_hex());
    let route_label = route.label(&station_label);
    RouteResponse {
        name: route.name.clone(),
        flights: flights
            .iter()
            .filter(|f| Some(f.route_id) == route.id)
            .map(|f| f.label(&route_label))
            .collect(),
        regularity: route.regularity.clone(),
        departure_time: route.departure_time.clone(),
        stopover: route.stopover.clone(),
        price: route.price,
        bus_station_name: station_name.map(str::to_string),
        bus_station: links.item(STATIONS, route.bus_station_id),
        url: links.object(ROUTES, route.id),
    }
}

async fn respond(
    req: &HttpRequest,
    db: &MongoDB,
    route: &Route,
) -> Result<RouteResponse, AppError> {
    let station = match db.get_station(&route.bus_station_id.to_hex()).await {
        Ok(station) => Some(station),
        Err(AppError::NotFound { .. }) => None,
        Err(e) => return Err(e),
    };
    let flights = match route.id {
        Some(id) => db.list_route_flights(id).await?,
        None => Vec::new(),
    };
    let links = Links::from_request(req);
    Ok(route_response(
        route,
        station.as_ref().map(|s| s.name.as_str()),
        &flights,
        &links,
    ))
}

pub async fn list(req: HttpRequest, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let links = Links::from_request(&req);
    let labels = Labels::load(&db).await?;
    let routes = db.list_routes().await?;
    let flights = db.list_flights().await?;
    let body: Vec<_> = routes
        .iter()
        .map(|r| route_response(r, labels.station_name(&r.bus_station_id), &flights, &links))
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn create(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    input: web::Json<RouteInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let route = db.create_route(input.into_inner()).await?;
    let body = respond(&req, &db, &route).await?;
    Ok(HttpResponse::Created()
        .insert_header(("Location", body.url.clone()))
        .json(body))
}

pub async fn retrieve(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let route = db.get_route(&path).await?;
    Ok(HttpResponse::Ok().json(respond(&req, &db, &route).await?))
}

pub async fn update(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
    input: web::Json<RouteInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let route = db.update_route(&path, input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(respond(&req, &db, &route).await?))
}

pub async fn destroy(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    db.delete_route(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// The next flight of the route with free seats, or `null`.
pub async fn next_flight(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let route = db.get_route(&path).await?;
    let flights = match route.id {
        Some(id) => db.list_route_flights(id).await?,
        None => Vec::new(),
    };
    let links = Links::from_request(&req);
    let next = find_next_flight(&flights, Utc::now(), config.utc_offset)
        .map(|f| flight_response(f, Some(&route.name), &links));
    if next.is_none() {
        debug!("No available flight left today on route {}", route.name);
    }
    Ok(HttpResponse::Ok().json(next))
}
