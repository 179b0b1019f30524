use actix_web::{web, HttpRequest, HttpResponse};

use super::links::{Links, STATIONS};
use crate::auth::authorize;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{BusStation, Route, StationInput, StationResponse};

pub(crate) fn station_response(
    station: &BusStation,
    routes: &[Route],
    links: &Links,
) -> StationResponse {
    StationResponse {
        name: station.name.clone(),
        routes: routes
            .iter()
            .filter(|r| Some(r.bus_station_id) == station.id)
            .map(|r| r.label(&station.name))
            .collect(),
        address: station.address.clone(),
        phone_number: station.phone_number.clone(),
        office_hours: station.office_hours.clone(),
        url: links.object(STATIONS, station.id),
    }
}

pub async fn list(req: HttpRequest, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let links = Links::from_request(&req);
    let stations = db.list_stations().await?;
    let routes = db.list_routes().await?;
    let body: Vec<_> = stations
        .iter()
        .map(|s| station_response(s, &routes, &links))
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn create(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    input: web::Json<StationInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let station = db.create_station(input.into_inner()).await?;
    let links = Links::from_request(&req);
    Ok(HttpResponse::Created()
        .insert_header(("Location", links.object(STATIONS, station.id)))
        .json(station_response(&station, &[], &links)))
}

pub async fn retrieve(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let station = db.get_station(&path).await?;
    let routes = match station.id {
        Some(id) => db.list_station_routes(id).await?,
        None => Vec::new(),
    };
    let links = Links::from_request(&req);
    Ok(HttpResponse::Ok().json(station_response(&station, &routes, &links)))
}

pub async fn update(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
    input: web::Json<StationInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let station = db.update_station(&path, input.into_inner()).await?;
    let routes = match station.id {
        Some(id) => db.list_station_routes(id).await?,
        None => Vec::new(),
    };
    let links = Links::from_request(&req);
    Ok(HttpResponse::Ok().json(station_response(&station, &routes, &links)))
}

/// Deletes the station together with its routes and their flights.
pub async fn destroy(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    db.delete_station(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn lists_only_own_routes() {
        let station = BusStation {
            id: Some(ObjectId::new()),
            name: "A".to_string(),
            office_hours: "10:00 - 22:00".to_string(),
            address: "Tula".to_string(),
            phone_number: "1".to_string(),
        };
        let route = |name: &str, station_id| Route {
            id: Some(ObjectId::new()),
            name: name.to_string(),
            regularity: "Еж".to_string(),
            departure_time: "10:00".to_string(),
            stopover: None,
            price: 100,
            bus_station_id: station_id,
        };
        let routes = vec![route("R", station.id.unwrap()), route("Other", ObjectId::new())];
        let response = station_response(&station, &routes, &Links::new("http://h"));
        assert_eq!(response.routes, vec!["A - R".to_string()]);
        assert!(response.url.starts_with("http://h/api/bus_stations/"));
    }
}
