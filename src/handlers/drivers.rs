use actix_web::{web, HttpRequest, HttpResponse};

use super::links::{Links, DRIVERS};
use crate::auth::authorize;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{Driver, DriverInput, DriverResponse};

fn driver_response(driver: &Driver, links: &Links) -> DriverResponse {
    DriverResponse {
        second_name: driver.second_name.clone(),
        name: driver.name.clone(),
        middle_name: driver.middle_name.clone(),
        passport_number: driver.passport_number.clone(),
        phone_number: driver.phone_number.clone(),
        age: driver.age,
        url: links.object(DRIVERS, driver.id),
    }
}

pub async fn list(req: HttpRequest, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let links = Links::from_request(&req);
    let drivers = db.list_drivers().await?;
    let body: Vec<_> = drivers.iter().map(|d| driver_response(d, &links)).collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn create(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    input: web::Json<DriverInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let driver = db.create_driver(input.into_inner()).await?;
    let body = driver_response(&driver, &Links::from_request(&req));
    Ok(HttpResponse::Created()
        .insert_header(("Location", body.url.clone()))
        .json(body))
}

pub async fn retrieve(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let driver = db.get_driver(&path).await?;
    Ok(HttpResponse::Ok().json(driver_response(&driver, &Links::from_request(&req))))
}

pub async fn update(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
    input: web::Json<DriverInput>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let driver = db.update_driver(&path, input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(driver_response(&driver, &Links::from_request(&req))))
}

pub async fn destroy(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    db.delete_driver(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
