pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schedule;
pub mod views;

use actix_web::web;

use handlers::{buses, drivers, flights, routes, stations, tickets, users};

/// Registers a standard CRUD resource: `/{name}/` and `/{name}/{id}/`.
macro_rules! resource {
    ($cfg:expr, $name:literal, $module:ident) => {
        $cfg.service(
            web::resource(concat!("/", $name, "/"))
                .route(web::get().to($module::list))
                .route(web::post().to($module::create)),
        )
        .service(
            web::resource(concat!("/", $name, "/{id}/"))
                .route(web::get().to($module::retrieve))
                .route(web::put().to($module::update))
                .route(web::delete().to($module::destroy)),
        )
    };
}

fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::api_root))
        .route("/auth/register/", web::post().to(handlers::auth::register))
        .route("/auth/login/", web::post().to(handlers::auth::login))
        .route(
            "/routes/{id}/next_flight/",
            web::get().to(routes::next_flight),
        );
    resource!(cfg, "users", users);
    resource!(cfg, "bus_stations", stations);
    resource!(cfg, "routes", routes);
    resource!(cfg, "flights", flights);
    resource!(cfg, "buses", buses);
    resource!(cfg, "drivers", drivers);
    resource!(cfg, "tickets", tickets);
}

fn page_routes(cfg: &mut web::ServiceConfig) {
    use views::pages;

    cfg.route("/", web::get().to(pages::index))
        .service(
            web::resource("/buy_ticket/")
                .route(web::get().to(pages::buy_ticket_form))
                .route(web::post().to(pages::buy_ticket)),
        )
        .route("/tickets/", web::get().to(pages::tickets))
        .route("/tickets/{id}/", web::get().to(pages::ticket_detail))
        .route("/tickets/{id}/delete/", web::post().to(pages::cancel_ticket))
        .route("/{station_id}/routes/", web::get().to(pages::station_routes))
        .route("/{route_id}/flights/", web::get().to(pages::route_flights));
}

fn account_routes(cfg: &mut web::ServiceConfig) {
    use views::accounts;

    cfg.service(
        web::resource("/login/")
            .route(web::get().to(accounts::login_form))
            .route(web::post().to(accounts::login)),
    )
    .service(
        web::resource("/register/")
            .route(web::get().to(accounts::register_form))
            .route(web::post().to(accounts::register)),
    )
    .route("/logout/", web::post().to(accounts::logout));
}

/// Mounts the JSON API under `/api` and the HTML pages under `/index` and
/// `/accounts`. Paths end with a slash; pair with
/// `NormalizePath::new(TrailingSlash::Always)`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api").configure(api_routes))
        .service(web::scope("/index").configure(page_routes))
        .service(web::scope("/accounts").configure(account_routes));
}
