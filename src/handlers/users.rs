use actix_web::{web, HttpRequest, HttpResponse};

use super::links::{Links, USERS};
use crate::auth::{authorize, require_user};
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{assign_role, Role, User, UserInput, UserResponse, UserUpdate};

pub(crate) fn user_response(user: &User, links: &Links) -> UserResponse {
    UserResponse {
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        role: user.role,
        url: links.object(USERS, user.id),
    }
}

pub async fn list(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    require_user(&req, &db, &config).await?;
    let links = Links::from_request(&req);
    let users = db.list_users().await?;
    let body: Vec<_> = users.iter().map(|u| user_response(u, &links)).collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn create(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    input: web::Json<UserInput>,
) -> Result<HttpResponse, AppError> {
    let actor = authorize(&req, &db, &config).await?;
    let mut input = input.into_inner();
    input.role = Some(assign_role(input.role, Role::User, actor.role)?);
    let user = db.create_user(input).await?;
    let body = user_response(&user, &Links::from_request(&req));
    Ok(HttpResponse::Created()
        .insert_header(("Location", body.url.clone()))
        .json(body))
}

pub async fn retrieve(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require_user(&req, &db, &config).await?;
    let user = db.get_user(&path).await?;
    Ok(HttpResponse::Ok().json(user_response(&user, &Links::from_request(&req))))
}

pub async fn update(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
    input: web::Json<UserUpdate>,
) -> Result<HttpResponse, AppError> {
    let actor = authorize(&req, &db, &config).await?;
    let stored = db.get_user(&path).await?;
    let mut update = input.into_inner();
    update.role = Some(assign_role(update.role, stored.role, actor.role)?);
    let user = db.update_user(&path, update).await?;
    Ok(HttpResponse::Ok().json(user_response(&user, &Links::from_request(&req))))
}

pub async fn destroy(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    authorize(&req, &db, &config).await?;
    db.delete_user(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
