use std::io;

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath, TrailingSlash};
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use bus_stations::config::Config;
use bus_stations::configure;
use bus_stations::db::MongoDB;
use bus_stations::views::Templates;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{context}: {err}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| startup_error("Configuration error", e))?;

    info!("Connecting to MongoDB database {}", config.database_name);
    let db = MongoDB::new(&config.mongodb_uri, &config.database_name)
        .await
        .map_err(|e| startup_error("Failed to create MongoDB client", e))?;
    db.ping()
        .await
        .map_err(|e| startup_error("MongoDB is not reachable", e))?;
    info!("Connected to MongoDB");
    db.ensure_indexes()
        .await
        .map_err(|e| startup_error("Failed to create indexes", e))?;
    if let Some(admin) = &config.admin {
        db.ensure_admin(admin)
            .await
            .map_err(|e| startup_error("Failed to create admin account", e))?;
    }
    if config.seed_data {
        db.seed_data(config.force_seed)
            .await
            .map_err(|e| startup_error("Failed to seed sample data", e))?;
    }

    let templates = Templates::new().map_err(|e| startup_error("Failed to load templates", e))?;

    let bind = (config.host.clone(), config.port);
    let db = web::Data::new(db);
    let config = web::Data::new(config);
    let templates = web::Data::new(templates);

    info!("Starting server at http://{}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        // Cross-origin clients authenticate with a bearer token; cookies stay same-site.
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);
        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(NormalizePath::new(TrailingSlash::Always))
            .app_data(db.clone())
            .app_data(config.clone())
            .app_data(templates.clone())
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}
