use std::time::Duration;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::Value;
use sqlx::PgPool;

use super::empleo_models::{like_pattern, validate_limit, EmpleoStats, OfertasQuery, FUENTES};
use crate::cache::ResponseCache;
use crate::db::{json_rows, non_empty, rows_query};
use crate::errors::ApiError;

const CACHE_TTL: Duration = Duration::from_secs(3600);
const OFERTAS: &str = "empleo.ofertas_laborales";

async fn fetch_ofertas(pool: &PgPool, query: &OfertasQuery) -> Result<Value, ApiError> {
    let limit = validate_limit(query.limit)?;

    let mut qb = rows_query();
    qb.push(format!("SELECT * FROM {} WHERE 1=1", OFERTAS));
    if let Some(municipio) = non_empty(&query.municipio) {
        qb.push(" AND municipio ILIKE ").push_bind(like_pattern(municipio));
    }
    if let Some(fuente) = non_empty(&query.fuente) {
        qb.push(" AND fuente = ").push_bind(fuente.to_string());
    }
    if let Some(busqueda) = non_empty(&query.busqueda) {
        let pattern = like_pattern(busqueda);
        qb.push(" AND (titulo ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR descripcion ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb.push(" ORDER BY fecha_scraping DESC NULLS LAST LIMIT ").push_bind(limit);

    Ok(Value::Array(json_rows(pool, qb).await?))
}

// Scraped job offers, newest first
pub async fn ofertas(
    pool: web::Data<PgPool>,
    cache: web::Data<ResponseCache>,
    req: HttpRequest,
    query: web::Query<OfertasQuery>,
) -> impl Responder {
    cache.respond(&req, CACHE_TTL, fetch_ofertas(pool.get_ref(), &query)).await
}

async fn grouped(pool: &PgPool, sql: &str) -> Result<Vec<Value>, sqlx::Error> {
    let mut qb = rows_query();
    qb.push(sql);
    json_rows(pool, qb).await
}

async fn fetch_stats(pool: &PgPool) -> Result<Value, ApiError> {
    let stats = EmpleoStats {
        por_municipio: grouped(
            pool,
            "SELECT municipio, COUNT(*) AS total FROM empleo.ofertas_laborales GROUP BY municipio ORDER BY total DESC",
        )
        .await?,
        por_fuente: grouped(
            pool,
            "SELECT fuente, COUNT(*) AS total FROM empleo.ofertas_laborales GROUP BY fuente ORDER BY total DESC",
        )
        .await?,
        top_empresas: grouped(
            pool,
            "SELECT empresa, COUNT(*) AS total FROM empleo.ofertas_laborales \
             WHERE empresa <> 'No especificada' GROUP BY empresa ORDER BY total DESC LIMIT 10",
        )
        .await?,
    };
    Ok(serde_json::to_value(stats).unwrap_or(Value::Null))
}

pub async fn stats(
    pool: web::Data<PgPool>,
    cache: web::Data<ResponseCache>,
    req: HttpRequest,
) -> impl Responder {
    cache.respond(&req, CACHE_TTL, fetch_stats(pool.get_ref())).await
}

pub async fn fuentes() -> impl Responder {
    HttpResponse::Ok().json(FUENTES)
}
