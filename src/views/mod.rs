//! Server-rendered HTML pages.

pub mod accounts;
pub mod pages;

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use log::error;
use minijinja::{context, Environment, Value};

use crate::error::AppError;

pub const LOGIN_URL: &str = "/accounts/login/";
pub const INDEX_URL: &str = "/index/";

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("error.html", include_str!("../../templates/error.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("routes.html", include_str!("../../templates/routes.html")),
    ("flights.html", include_str!("../../templates/flights.html")),
    ("buy_ticket.html", include_str!("../../templates/buy_ticket.html")),
    ("tickets.html", include_str!("../../templates/tickets.html")),
    ("ticket.html", include_str!("../../templates/ticket.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("register.html", include_str!("../../templates/register.html")),
];

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Templates { env })
    }

    pub fn render(&self, name: &str, ctx: Value) -> Result<String, AppError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| AppError::Internal(format!("template {name} missing: {e}")))?;
        template
            .render(ctx)
            .map_err(|e| AppError::Internal(format!("template {name} failed to render: {e}")))
    }

    pub fn page(&self, name: &str, ctx: Value) -> Result<HttpResponse, AppError> {
        self.page_with(StatusCode::OK, name, ctx)
    }

    pub fn page_with(
        &self,
        status: StatusCode,
        name: &str,
        ctx: Value,
    ) -> Result<HttpResponse, AppError> {
        let body = self.render(name, ctx)?;
        Ok(HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(body))
    }

    pub fn error_page(&self, err: &AppError) -> HttpResponse {
        let status = err.status_code();
        if status.is_server_error() {
            error!("{}", err);
        }
        let ctx = context! { status => status.as_u16(), message => err.public_message() };
        self.page_with(status, "error.html", ctx)
            .unwrap_or_else(|_| err.error_response())
    }

    /// Turns a page result into a response: anonymous visitors go to the
    /// login form, other errors get the error page.
    pub fn finish(&self, result: Result<HttpResponse, AppError>) -> HttpResponse {
        match result {
            Ok(response) => response,
            Err(AppError::Unauthorized) => redirect(LOGIN_URL),
            Err(err) => self.error_page(&err),
        }
    }
}

pub fn redirect(to: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, to))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_template_parses() {
        let templates = Templates::new().unwrap();
        for (name, _) in TEMPLATES {
            assert!(templates.env.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn anonymous_visitors_are_sent_to_login() {
        let templates = Templates::new().unwrap();
        let response = templates.finish(Err(AppError::Unauthorized));
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            LOGIN_URL
        );
    }

    #[test]
    fn errors_render_with_their_status() {
        let templates = Templates::new().unwrap();
        let response = templates.finish(Err(AppError::not_found("Route", "42")));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn output_is_escaped() {
        let templates = Templates::new().unwrap();
        let body = templates
            .render(
                "error.html",
                context! { status => 422, message => "<script>alert(1)</script>" },
            )
            .unwrap();
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>alert"));
    }
}
