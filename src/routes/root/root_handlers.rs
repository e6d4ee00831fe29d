use actix_web::{web, HttpResponse, Responder};

use super::root_models::{endpoint_map, DatabaseInfo, RootResponse, API_NAME, API_VERSION, DEPARTAMENTO};
use crate::config::Config;
use crate::db::SERVED_SCHEMAS;

// Health check and endpoint catalog
pub async fn root_get(config: web::Data<Config>) -> impl Responder {
    HttpResponse::Ok().json(RootResponse {
        name: format!("{} — {}", API_NAME, config.municipality_name),
        version: API_VERSION,
        municipio: config.municipality_name.clone(),
        departamento: DEPARTAMENTO,
        dane_code: config.dane_code.clone(),
        database: DatabaseInfo { schemas: SERVED_SCHEMAS.to_vec() },
        endpoints: endpoint_map(),
    })
}

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App};
    use serde_json::Value;

    use crate::routes::routes::root_configure;
    use crate::routes::test_support;

    #[actix_web::test]
    async fn root_lists_endpoints() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::config()))
                .configure(root_configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["dane_code"], "05045");
        assert_eq!(body["version"], "2.0.0");
        assert_eq!(body["endpoints"]["stats"], "/api/stats/summary");
        assert_eq!(body["database"]["schemas"].as_array().map(|s| s.len()), Some(6));
    }
}
