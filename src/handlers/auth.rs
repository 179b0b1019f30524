use actix_web::{web, HttpRequest, HttpResponse};

use super::links::Links;
use super::users::user_response;
use crate::auth::issue_token;
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User};

fn auth_response(req: &HttpRequest, user: &User, config: &Config) -> Result<AuthResponse, AppError> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::Internal(format!("user {} has no id", user.username)))?;
    let token = issue_token(&user_id.to_hex(), &user.username, user.role, config)?;
    Ok(AuthResponse {
        token,
        user: user_response(user, &Links::from_request(req)),
    })
}

pub async fn register(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    user: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let user = db.register_user(user.into_inner()).await?;
    Ok(HttpResponse::Created().json(auth_response(&req, &user, &config)?))
}

pub async fn login(
    req: HttpRequest,
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    credentials: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let user = db.authenticate_user(&credentials).await?;
    Ok(HttpResponse::Ok().json(auth_response(&req, &user, &config)?))
}
