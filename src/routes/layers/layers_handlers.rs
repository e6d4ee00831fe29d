use actix_web::{web, HttpResponse, Responder, ResponseError};
use log::{error, info};
use sqlx::PgPool;

use super::layers_models::{GeojsonQuery, LayerStats, LayerSummary, DEFAULT_GEOJSON_LIMIT};
use crate::db::{count_or_zero, feature_collection_query, json_feature_collection, table_columns};
use crate::errors::ApiError;
use crate::models::layer::{find_layer, Layer, LAYERS};

fn unknown_layer(layer_id: &str) -> HttpResponse {
    info!("Layer not found: {}", layer_id);
    ApiError::NotFound(format!("Capa '{}' no encontrada", layer_id)).error_response()
}

// Layer catalog with record counts; a missing table counts as 0
pub async fn list_layers(pool: web::Data<PgPool>) -> impl Responder {
    let mut layers = Vec::with_capacity(LAYERS.len());
    for layer in LAYERS.iter() {
        let record_count = count_or_zero(pool.get_ref(), &layer.qualified_table()).await;
        layers.push(LayerSummary { layer, record_count });
    }
    HttpResponse::Ok().json(layers)
}

pub async fn layer_geojson(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    query: web::Query<GeojsonQuery>,
) -> impl Responder {
    let layer_id = path.into_inner();
    let Some(layer) = find_layer(&layer_id) else {
        return unknown_layer(&layer_id);
    };
    let limit = query.limit.unwrap_or(DEFAULT_GEOJSON_LIMIT).max(1);

    let mut qb = feature_collection_query();
    qb.push(format!("SELECT * FROM {} LIMIT ", layer.qualified_table()))
        .push_bind(limit);

    match json_feature_collection(pool.get_ref(), qb).await {
        Ok(collection) => HttpResponse::Ok().json(collection),
        Err(e) => {
            error!("Failed to read layer {}: {}", layer_id, e);
            ApiError::from(e).error_response()
        }
    }
}

async fn fetch_stats(pool: &PgPool, layer: &'static Layer) -> Result<LayerStats, ApiError> {
    let table = layer.qualified_table();
    let record_count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    let bbox: Option<String> = sqlx::query_scalar(&format!("SELECT ST_Extent(geom)::text FROM {}", table))
        .fetch_one(pool)
        .await?;
    let columns = table_columns(pool, layer.schema, layer.table).await?;

    Ok(LayerStats {
        layer_id: layer.id,
        name: layer.name,
        record_count,
        bbox,
        columns,
    })
}

// Bounding box, count and columns of one layer
pub async fn layer_stats(pool: web::Data<PgPool>, path: web::Path<String>) -> impl Responder {
    let layer_id = path.into_inner();
    let Some(layer) = find_layer(&layer_id) else {
        return unknown_layer(&layer_id);
    };

    match fetch_stats(pool.get_ref(), layer).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => {
            error!("Failed to compute stats for layer {}: {}", layer_id, e);
            e.error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use serde_json::Value;

    use crate::routes::routes::layers_configure;
    use crate::routes::test_support;

    #[actix_web::test]
    async fn unknown_layer_is_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::lazy_pool()))
                .configure(layers_configure),
        )
        .await;

        for uri in ["/api/layers/catastro/geojson", "/api/layers/catastro/stats"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "Capa 'catastro' no encontrada");
        }
    }

    #[actix_web::test]
    async fn summary_flattens_layer() {
        let summary = super::LayerSummary { layer: &super::LAYERS[0], record_count: 1 };
        let value = serde_json::to_value(summary).unwrap();
        assert_eq!(value["id"], "limite_municipal");
        assert_eq!(value["record_count"], 1);
    }
}
