use std::io;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;

use observatorio_backend::cache::ResponseCache;
use observatorio_backend::config::Config;
use observatorio_backend::db;
use observatorio_backend::routes::routes;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let pool = db::connect(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, format!("Failed to create pool: {}", e)))?;

    let server_address = config.server_address.clone();
    let cache = web::Data::new(ResponseCache::new());
    let config = web::Data::new(config);
    info!("Server running at http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(pool.clone()))
            .app_data(cache.clone())
            .app_data(config.clone())
            .configure(routes::root_configure)
            .configure(routes::layers_configure)
            .configure(routes::geo_configure)
            .configure(routes::indicators_configure)
            .configure(routes::crossvar_configure)
            .configure(routes::stats_configure)
            .configure(routes::analytics_configure)
            .configure(routes::empleo_configure)
    })
    .bind(server_address)?
    .run()
    .await
}
