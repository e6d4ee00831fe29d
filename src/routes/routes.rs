use actix_web::web;

use super::root::root_handlers;

pub fn root_configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root_handlers::root_get));
}

use super::layers::layers_handlers;

pub fn layers_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/layers")
            .route("", web::get().to(layers_handlers::list_layers))
            .route("/", web::get().to(layers_handlers::list_layers))
            .route("/{layer_id}/geojson", web::get().to(layers_handlers::layer_geojson))
            .route("/{layer_id}/stats", web::get().to(layers_handlers::layer_stats))
    );
}

use super::geo::geo_handlers;

pub fn geo_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/geo")
            .route("/manzanas", web::get().to(geo_handlers::manzanas))
            .route("/edificaciones", web::get().to(geo_handlers::edificaciones))
            .route("/vias", web::get().to(geo_handlers::vias))
            .route("/negocios", web::get().to(geo_handlers::negocios))
            .route("/amenidades", web::get().to(geo_handlers::amenidades))
    );
}

use super::indicators::indicators_handlers;

pub fn indicators_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/indicators")
            .route("/icfes", web::get().to(indicators_handlers::icfes))
            .route("/terridata", web::get().to(indicators_handlers::terridata))
            .route("/seguridad/serie", web::get().to(indicators_handlers::seguridad_serie))
            .route("/victimas", web::get().to(indicators_handlers::victimas))
            .route("/salud/ips", web::get().to(indicators_handlers::salud_ips))
            .route("/salud/irca", web::get().to(indicators_handlers::salud_irca))
            .route("/salud/sivigila/resumen", web::get().to(indicators_handlers::sivigila_resumen))
            .route("/economia/internet/serie", web::get().to(indicators_handlers::internet_serie))
            .route("/economia/secop", web::get().to(indicators_handlers::secop))
            .route("/economia/turismo", web::get().to(indicators_handlers::turismo))
            .route("/gobierno/finanzas", web::get().to(indicators_handlers::finanzas))
            .route("/gobierno/desempeno", web::get().to(indicators_handlers::desempeno))
            .route("/gobierno/digital", web::get().to(indicators_handlers::gobierno_digital))
            .route("/gobierno/pobreza", web::get().to(indicators_handlers::pobreza))
            .route("/cultura/espacios", web::get().to(indicators_handlers::espacios_culturales))
            .route("/cultura/turismo-detalle", web::get().to(indicators_handlers::turismo_detalle))
    );
}

use super::crossvar::crossvar_handlers;

pub fn crossvar_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/crossvar")
            .route("/variables", web::get().to(crossvar_handlers::list_variables))
            .route("/security-matrix", web::get().to(crossvar_handlers::security_matrix))
            .route("/scatter", web::get().to(crossvar_handlers::scatter))
    );
}

use super::stats::stats_handlers;

pub fn stats_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/stats")
            .route("/summary", web::get().to(stats_handlers::summary))
            .route("/data-catalog", web::get().to(stats_handlers::data_catalog))
    );
}

use super::analytics::analytics_handlers;

pub fn analytics_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/analytics")
            .route("/gaps", web::get().to(analytics_handlers::gaps))
            .route("/ranking", web::get().to(analytics_handlers::ranking))
            .route("/laboral/termometro", web::get().to(analytics_handlers::termometro))
            .route("/laboral/oferta-demanda", web::get().to(analytics_handlers::oferta_demanda))
            .route("/clusters", web::get().to(analytics_handlers::clusters))
    );
}

use super::empleo::empleo_handlers;

pub fn empleo_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/empleo")
            .route("/ofertas", web::get().to(empleo_handlers::ofertas))
            .route("/stats", web::get().to(empleo_handlers::stats))
            .route("/fuentes", web::get().to(empleo_handlers::fuentes))
    );
}
