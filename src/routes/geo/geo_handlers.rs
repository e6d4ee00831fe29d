use actix_web::{web, HttpResponse, Responder, ResponseError};
use log::error;
use sqlx::PgPool;

use super::geo_models::{clamp_limit, parse_bbox, GeoQuery};
use crate::db::{feature_collection_query, json_feature_collection, non_empty};
use crate::errors::ApiError;

async fn features(pool: &PgPool, table: &str, query: &GeoQuery, by_category: bool) -> Result<serde_json::Value, ApiError> {
    let bbox = match non_empty(&query.bbox) {
        Some(raw) => Some(parse_bbox(raw)?),
        None => None,
    };
    let category = if by_category { non_empty(&query.category) } else { None };

    let mut qb = feature_collection_query();
    qb.push(format!("SELECT * FROM {} WHERE 1=1", table));
    if let Some(b) = bbox {
        qb.push(" AND ST_Intersects(geom, ST_MakeEnvelope(")
            .push_bind(b.min_x)
            .push(", ")
            .push_bind(b.min_y)
            .push(", ")
            .push_bind(b.max_x)
            .push(", ")
            .push_bind(b.max_y)
            .push(", 4326))");
    }
    if let Some(category) = category {
        qb.push(" AND category = ").push_bind(category.to_string());
    }
    qb.push(" LIMIT ").push_bind(clamp_limit(query.limit));

    Ok(json_feature_collection(pool, qb).await?)
}

async fn respond(pool: web::Data<PgPool>, table: &str, query: web::Query<GeoQuery>, by_category: bool) -> HttpResponse {
    match features(pool.get_ref(), table, &query, by_category).await {
        Ok(collection) => HttpResponse::Ok().json(collection),
        Err(e) => {
            error!("Failed to read {}: {}", table, e);
            e.error_response()
        }
    }
}

pub async fn manzanas(pool: web::Data<PgPool>, query: web::Query<GeoQuery>) -> impl Responder {
    respond(pool, "cartografia.manzanas_censales", query, false).await
}

pub async fn edificaciones(pool: web::Data<PgPool>, query: web::Query<GeoQuery>) -> impl Responder {
    respond(pool, "cartografia.osm_edificaciones", query, false).await
}

pub async fn vias(pool: web::Data<PgPool>, query: web::Query<GeoQuery>) -> impl Responder {
    respond(pool, "cartografia.osm_vias", query, false).await
}

// Google Places businesses, optionally by category label
pub async fn negocios(pool: web::Data<PgPool>, query: web::Query<GeoQuery>) -> impl Responder {
    respond(pool, "servicios.google_places", query, true).await
}

pub async fn amenidades(pool: web::Data<PgPool>, query: web::Query<GeoQuery>) -> impl Responder {
    respond(pool, "cartografia.osm_amenidades", query, false).await
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use serde_json::Value;

    use crate::routes::routes::geo_configure;
    use crate::routes::test_support;

    #[actix_web::test]
    async fn malformed_bbox_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::lazy_pool()))
                .configure(geo_configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/geo/edificaciones?bbox=-76.6,7.8,oops,7.9")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("bbox inválido"));
    }
}
