use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use log::info;
use minijinja::context;
use serde::{Deserialize, Serialize};

use super::{redirect, Templates, INDEX_URL, LOGIN_URL};
use crate::auth::{current_user, issue_token, AUTH_COOKIE};
use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{LoginRequest, RegisterRequest};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub password2: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

fn auth_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(config.token_ttl_hours))
        .finish()
}

pub async fn login_form(
    req: HttpRequest,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
) -> HttpResponse {
    if current_user(&req, &config).is_some() {
        return redirect(INDEX_URL);
    }
    templates.finish(templates.page("login.html", context! {}))
}

pub async fn login(
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    templates: web::Data<Templates>,
    form: web::Form<LoginForm>,
) -> HttpResponse {
    let form = form.into_inner();
    let credentials = LoginRequest {
        email: form.email.trim().to_string(),
        password: form.password,
    };
    let result = async {
        let user = match db.authenticate_user(&credentials).await {
            Ok(user) => user,
            Err(err @ AppError::InvalidCredentials) => {
                return templates.page_with(
                    err.status_code(),
                    "login.html",
                    context! { error => err.public_message(), email => &credentials.email },
                );
            }
            Err(err) => return Err(err),
        };
        let user_id = user
            .id
            .ok_or_else(|| AppError::Internal(format!("user {} has no id", user.username)))?;
        let token = issue_token(&user_id.to_hex(), &user.username, user.role, &config)?;
        info!("User {} logged in", user.username);
        Ok(HttpResponse::SeeOther()
            .insert_header(("Location", INDEX_URL))
            .cookie(auth_cookie(token, &config))
            .finish())
    };
    templates.finish(result.await)
}

pub async fn register_form(templates: web::Data<Templates>) -> HttpResponse {
    templates.finish(templates.page(
        "register.html",
        context! { form => RegisterForm::default() },
    ))
}

/// Creates a plain user account and sends the visitor to the login form.
pub async fn register(
    db: web::Data<MongoDB>,
    templates: web::Data<Templates>,
    form: web::Form<RegisterForm>,
) -> HttpResponse {
    let form = form.into_inner();
    let result = async {
        let outcome = if form.password != form.password2 {
            Err(AppError::Validation("passwords do not match".to_string()))
        } else {
            db.register_user(RegisterRequest {
                username: form.username.clone(),
                email: form.email.clone(),
                password: form.password.clone(),
                first_name: form.first_name.clone(),
                last_name: form.last_name.clone(),
            })
            .await
        };
        match outcome {
            Ok(user) => {
                info!("Registered user {}", user.username);
                Ok(redirect(LOGIN_URL))
            }
            Err(err @ (AppError::Validation(_) | AppError::Conflict(_))) => templates.page_with(
                err.status_code(),
                "register.html",
                context! { form => &form, error => err.public_message() },
            ),
            Err(err) => Err(err),
        }
    };
    templates.finish(result.await)
}

pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    HttpResponse::build(StatusCode::SEE_OTHER)
        .insert_header(("Location", LOGIN_URL))
        .cookie(cookie)
        .finish()
}
