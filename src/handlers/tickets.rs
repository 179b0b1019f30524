use actix_web::{web, HttpRequest, HttpResponse};

use super::links::{Links, FLIGHTS, TICKETS};
use crate::auth::authorize;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{related_id, Sale, Ticket, TicketInput, TicketResponse, TicketUpdate};

pub(crate) fn ticket_response(ticket: &Ticket, links: &Links) -> TicketResponse {
    TicketResponse {
        flight: links.item(FLIGHTS, ticket.flight_id),
        user: ticket.user.clone(),
        seller: ticket.seller.clone(),
        registration_time: ticket.registration_time,
        url: links.object(TICKETS, ticket.id),
    }
}

pub async fn list(req: HttpRequest, db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let links = Links::from_request(&req);
    let tickets = db.list_tickets().await?;
    let body: Vec<_> = tickets.iter().map(|t| ticket_response(t, &links)).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// Sells a ticket, taking one free seat from the flight.
pub async fn create(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    input: web::Json<TicketInput>,
) -> Result<HttpResponse, AppError> {
    let claims = authorize(&req, &db, &config).await?;
    let input = input.into_inner();
    let flight_id = db.string_to_id("Flight", &related_id(&input.flight))?;
    let seller = input
        .seller
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(claims.username);
    let ticket = db
        .sell_ticket(Sale {
            flight_id,
            user: input.user,
            seller,
        })
        .await?;
    let body = ticket_response(&ticket, &Links::from_request(&req));
    Ok(HttpResponse::Created()
        .insert_header(("Location", body.url.clone()))
        .json(body))
}

pub async fn retrieve(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let ticket = db.get_ticket(&path).await?;
    Ok(HttpResponse::Ok().json(ticket_response(&ticket, &Links::from_request(&req))))
}

pub async fn update(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
    input: web::Json<TicketUpdate>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    let ticket = db.update_ticket(&path, input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ticket_response(&ticket, &Links::from_request(&req))))
}

/// Cancels the ticket and gives its seat back to the flight.
pub async fn destroy(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    db.cancel_ticket(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
