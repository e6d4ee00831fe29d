//! Territorial intelligence for the Urabá subregion: gaps against the
//! regional average, rankings, the labour thermometer and rule-based
//! territorial profiles. Responses are cached for an hour.

use std::time::Duration;

use actix_web::{web, HttpRequest, Responder};
use serde_json::{json, Value};
use sqlx::PgPool;

use super::analytics_models::{
    clusters as build_clusters, oferta_demanda as join_oferta_demanda, parse_order, tendencia, GapsQuery,
    RankingQuery, Termometro, DEFAULT_INDICADOR, FECHA_ISO_PATTERN, POBREZA_INDICADOR, VALOR_AGREGADO_INDICADOR,
};
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::db::{json_rows, non_empty, rows_query};
use crate::errors::ApiError;

const CACHE_TTL: Duration = Duration::from_secs(3600);

fn to_json<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

async fn fetch_gaps(pool: &PgPool, dane_code: &str, indicador: &str) -> Result<Value, ApiError> {
    let mut qb = rows_query();
    qb.push(
        "WITH regional_avg AS (\
         SELECT AVG(dato_numerico) AS avg_val, anio FROM socioeconomico.terridata WHERE indicador = ",
    )
    .push_bind(indicador.to_string())
    .push(
        " GROUP BY anio ORDER BY anio DESC LIMIT 1), \
         muni_val AS (\
         SELECT entidad, dato_numerico AS muni_val, anio FROM socioeconomico.terridata WHERE indicador = ",
    )
    .push_bind(indicador.to_string())
    .push(" AND dane_code = ")
    .push_bind(dane_code.to_string())
    .push(
        " ORDER BY anio DESC LIMIT 1) \
         SELECT m.entidad AS municipio, m.muni_val AS valor_municipio, r.avg_val AS promedio_regional, \
         (m.muni_val - r.avg_val) AS brecha_absoluta, \
         CASE WHEN r.avg_val != 0 THEN ((m.muni_val - r.avg_val) / r.avg_val) * 100 ELSE 0 END AS brecha_porcentual, \
         m.anio FROM muni_val m, regional_avg r",
    );

    json_rows(pool, qb).await?.into_iter().next().ok_or_else(|| {
        ApiError::NotFound("No se encontraron datos para el indicador o municipio especificado".into())
    })
}

// Municipality value against the Urabá average for the latest year
pub async fn gaps(
    pool: web::Data<PgPool>,
    cache: web::Data<ResponseCache>,
    config: web::Data<Config>,
    req: HttpRequest,
    query: web::Query<GapsQuery>,
) -> impl Responder {
    let dane_code = non_empty(&query.dane_code).unwrap_or(config.dane_code.as_str());
    let indicador = non_empty(&query.indicador).unwrap_or(DEFAULT_INDICADOR);
    cache.respond(&req, CACHE_TTL, fetch_gaps(pool.get_ref(), dane_code, indicador)).await
}

async fn fetch_ranking(pool: &PgPool, indicador: &str, order: Option<&str>) -> Result<Value, ApiError> {
    let direction = parse_order(order)?;
    let mut qb = rows_query();
    qb.push(
        "WITH latest_data AS (\
         SELECT DISTINCT ON (entidad) entidad AS municipio, dane_code, dato_numerico AS valor, anio \
         FROM socioeconomico.terridata WHERE indicador = ",
    )
    .push_bind(indicador.to_string())
    .push(format!(
        " ORDER BY entidad, anio DESC) SELECT * FROM latest_data ORDER BY valor {} NULLS LAST",
        direction
    ));
    Ok(Value::Array(json_rows(pool, qb).await?))
}

pub async fn ranking(
    pool: web::Data<PgPool>,
    cache: web::Data<ResponseCache>,
    req: HttpRequest,
    query: web::Query<RankingQuery>,
) -> impl Responder {
    let indicador = non_empty(&query.indicador).unwrap_or(DEFAULT_INDICADOR);
    cache
        .respond(&req, CACHE_TTL, fetch_ranking(pool.get_ref(), indicador, non_empty(&query.order)))
        .await
}

async fn fetch_termometro(pool: &PgPool) -> Result<Value, ApiError> {
    let rows: Vec<(Option<String>, i64, i64)> = sqlx::query_as(
        "WITH fechas AS (\
         SELECT municipio, \
         CASE WHEN fecha_scraping::text ~ $1 THEN left(fecha_scraping::text, 10)::date END AS fecha \
         FROM empleo.ofertas_laborales) \
         SELECT municipio, \
         COUNT(*) FILTER (WHERE fecha >= current_date - 7), \
         COUNT(*) FILTER (WHERE fecha < current_date - 7 AND fecha >= current_date - 14) \
         FROM fechas GROUP BY municipio ORDER BY municipio",
    )
    .bind(FECHA_ISO_PATTERN)
    .fetch_all(pool)
    .await?;

    let termometro: Vec<Termometro> = rows
        .into_iter()
        .map(|(municipio, ultimos, anteriores)| Termometro {
            municipio,
            ultimos_7_dias: ultimos,
            anteriores_7_dias: anteriores,
            tendencia: tendencia(ultimos, anteriores),
        })
        .collect();
    Ok(to_json(termometro))
}

// Offers in the last 7 days against the 7 before, per municipality
pub async fn termometro(
    pool: web::Data<PgPool>,
    cache: web::Data<ResponseCache>,
    req: HttpRequest,
) -> impl Responder {
    cache.respond(&req, CACHE_TTL, fetch_termometro(pool.get_ref())).await
}

async fn fetch_oferta_demanda(pool: &PgPool) -> Result<Value, ApiError> {
    let offers: Vec<(Option<String>, i64)> =
        sqlx::query_as("SELECT municipio, COUNT(*) FROM empleo.ofertas_laborales GROUP BY municipio")
            .fetch_all(pool)
            .await?;
    let population: Vec<(String, Option<f64>)> = sqlx::query_as(
        "SELECT entidad, dato_numerico::float8 FROM socioeconomico.terridata \
         WHERE indicador = $1 \
         AND anio = (SELECT MAX(anio) FROM socioeconomico.terridata WHERE indicador = $1)",
    )
    .bind(DEFAULT_INDICADOR)
    .fetch_all(pool)
    .await?;

    if population.is_empty() {
        return Ok(json!({ "error": "No se encontraron datos de población para el análisis" }));
    }
    Ok(to_json(join_oferta_demanda(&offers, &population)))
}

// Vacancies per 1 000 inhabitants
pub async fn oferta_demanda(
    pool: web::Data<PgPool>,
    cache: web::Data<ResponseCache>,
    req: HttpRequest,
) -> impl Responder {
    cache.respond(&req, CACHE_TTL, fetch_oferta_demanda(pool.get_ref())).await
}

async fn fetch_clusters(pool: &PgPool) -> Result<Value, ApiError> {
    let rows: Vec<(String, String, Option<f64>)> = sqlx::query_as(
        "SELECT entidad, indicador, dato_numerico::float8 FROM socioeconomico.terridata \
         WHERE indicador IN ($1, $2, $3) \
         AND anio = (SELECT MAX(anio) FROM socioeconomico.terridata)",
    )
    .bind(DEFAULT_INDICADOR)
    .bind(POBREZA_INDICADOR)
    .bind(VALOR_AGREGADO_INDICADOR)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(json!({ "error": "Datos insuficientes para clustering" }));
    }
    Ok(to_json(build_clusters(&rows)))
}

pub async fn clusters(
    pool: web::Data<PgPool>,
    cache: web::Data<ResponseCache>,
    req: HttpRequest,
) -> impl Responder {
    cache.respond(&req, CACHE_TTL, fetch_clusters(pool.get_ref())).await
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use serde_json::Value;

    use crate::cache::ResponseCache;
    use crate::routes::routes::analytics_configure;
    use crate::routes::test_support;

    #[actix_web::test]
    async fn invalid_ranking_order_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::lazy_pool()))
                .app_data(web::Data::new(ResponseCache::new()))
                .app_data(web::Data::new(test_support::config()))
                .configure(analytics_configure),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/analytics/ranking?indicador=Poblaci%C3%B3n%20total&order=sideways")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("sideways"));
    }
}
