pub mod auth;
pub mod buses;
pub mod drivers;
pub mod flights;
pub mod links;
pub mod routes;
pub mod stations;
pub mod tickets;
pub mod users;

use actix_web::{HttpRequest, HttpResponse};
use serde_json::{Map, Value};

use links::{Links, RESOURCES};

/// Lists every API collection with its absolute URL.
pub async fn api_root(req: HttpRequest) -> HttpResponse {
    let links = Links::from_request(&req);
    let body: Map<String, Value> = RESOURCES
        .iter()
        .map(|resource| (resource.to_string(), Value::String(links.collection(resource))))
        .collect();
    HttpResponse::Ok().json(body)
}
