//! Socioeconomic, health, economy, government and culture indicators.
//!
//! Every endpoint is a parameterized passthrough over the typed tables and
//! TerriData, with an optional `dane_code` filter.

use actix_web::{web, HttpResponse, Responder, ResponseError};
use log::error;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use super::indicators_models::{
    group_by_category, serie_table, turismo_categories_sql, AggregateQuery, DaneQuery, PobrezaResponse,
    SerieQuery, TerridataQuery, TurismoResponse, TERRIDATA,
};
use crate::db::{json_rows, non_empty, push_where, rows_query};
use crate::errors::ApiError;

async fn select_rows(
    pool: &PgPool,
    select: &str,
    conditions: &[&str],
    dane_code: Option<&str>,
    tail: &str,
) -> Result<Vec<Value>, sqlx::Error> {
    let mut qb = rows_query();
    qb.push(select);
    push_where(&mut qb, conditions, dane_code);
    qb.push(tail);
    json_rows(pool, qb).await
}

async fn terridata_rows(pool: &PgPool, dane_code: Option<&str>, dimension: Option<&str>) -> Result<Vec<Value>, sqlx::Error> {
    let mut qb = rows_query();
    qb.push(format!(
        "SELECT dimension, indicador, dato_numerico, anio, unidad_de_medida FROM {}",
        TERRIDATA
    ));
    push_where(&mut qb, &[], dane_code);
    if let Some(dimension) = dimension {
        qb.push(" AND dimension = ").push_bind(dimension);
    }
    qb.push(" ORDER BY anio DESC");
    json_rows(pool, qb).await
}

fn json_or_error<T: Serialize>(endpoint: &str, result: Result<T, sqlx::Error>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => {
            error!("Failed to query {}: {}", endpoint, e);
            ApiError::from(e).error_response()
        }
    }
}

pub async fn icfes(pool: web::Data<PgPool>, query: web::Query<AggregateQuery>) -> impl Responder {
    let dane_code = non_empty(&query.dane_code);
    let result = if non_empty(&query.aggregate) == Some("periodo") {
        select_rows(
            pool.get_ref(),
            "SELECT periodo, COUNT(*) AS estudiantes, AVG(punt_global) AS prom_global FROM socioeconomico.icfes",
            &[],
            dane_code,
            " GROUP BY periodo ORDER BY periodo",
        )
        .await
    } else {
        select_rows(
            pool.get_ref(),
            "SELECT cole_nombre AS colegio, periodo, AVG(punt_global) AS prom_global FROM socioeconomico.icfes",
            &[],
            dane_code,
            " GROUP BY cole_nombre, periodo ORDER BY prom_global DESC NULLS LAST",
        )
        .await
    };
    json_or_error("icfes", result)
}

pub async fn terridata(pool: web::Data<PgPool>, query: web::Query<TerridataQuery>) -> impl Responder {
    let result = terridata_rows(pool.get_ref(), non_empty(&query.dane_code), non_empty(&query.dimension)).await;
    json_or_error("terridata", result)
}

pub async fn seguridad_serie(pool: web::Data<PgPool>, query: web::Query<SerieQuery>) -> impl Responder {
    let table = serie_table(non_empty(&query.tipo));
    let select = format!(
        "SELECT EXTRACT(YEAR FROM fecha)::int AS anio, SUM(cantidad) AS total FROM {}",
        table
    );
    let result = select_rows(
        pool.get_ref(),
        &select,
        &[],
        non_empty(&query.dane_code),
        " GROUP BY anio ORDER BY anio",
    )
    .await;
    json_or_error(table, result)
}

pub async fn victimas(pool: web::Data<PgPool>, query: web::Query<AggregateQuery>) -> impl Responder {
    let dane_code = non_empty(&query.dane_code);
    let by_hecho = non_empty(&query.aggregate).map_or(true, |a| a == "hecho");
    let result = if by_hecho {
        select_rows(
            pool.get_ref(),
            "SELECT hecho AS dimension, SUM(personas) AS personas FROM seguridad.victimas_conflicto",
            &[],
            dane_code,
            " GROUP BY hecho ORDER BY personas DESC NULLS LAST",
        )
        .await
    } else {
        select_rows(
            pool.get_ref(),
            "SELECT sexo, hecho, SUM(personas) AS personas FROM seguridad.victimas_conflicto",
            &[],
            dane_code,
            " GROUP BY sexo, hecho ORDER BY personas DESC NULLS LAST",
        )
        .await
    };
    json_or_error("victimas", result)
}

pub async fn salud_ips(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = select_rows(
        pool.get_ref(),
        "SELECT nombre, clase_persona, direccion, telefono FROM socioeconomico.ips_salud",
        &[],
        non_empty(&query.dane_code),
        " LIMIT 200",
    )
    .await;
    json_or_error("salud/ips", result)
}

// IRCA (water quality risk index) series from TerriData
pub async fn salud_irca(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = select_rows(
        pool.get_ref(),
        "SELECT anio, dato_numerico AS irca_total, entidad AS municipio FROM socioeconomico.terridata",
        &["indicador ILIKE '%IRCA%'"],
        non_empty(&query.dane_code),
        " ORDER BY anio",
    )
    .await;
    json_or_error("salud/irca", result)
}

pub async fn sivigila_resumen(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = select_rows(
        pool.get_ref(),
        "SELECT indicador, dato_numerico AS valor, anio, entidad AS municipio FROM socioeconomico.terridata",
        &["dimension = 'Salud'"],
        non_empty(&query.dane_code),
        " ORDER BY anio DESC LIMIT 50",
    )
    .await;
    json_or_error("salud/sivigila/resumen", result)
}

pub async fn internet_serie(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = select_rows(
        pool.get_ref(),
        "SELECT anio, dato_numerico AS total_accesos, entidad AS municipio FROM socioeconomico.terridata",
        &["indicador ILIKE '%Internet%'"],
        non_empty(&query.dane_code),
        " ORDER BY anio",
    )
    .await;
    json_or_error("economia/internet/serie", result)
}

// Public procurement proxy: TerriData investment indicators
pub async fn secop(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = select_rows(
        pool.get_ref(),
        "SELECT indicador, dato_numerico AS valor, anio, entidad AS municipio FROM socioeconomico.terridata",
        &["dimension = 'Finanzas públicas'", "indicador ILIKE '%inversión%'"],
        non_empty(&query.dane_code),
        " ORDER BY anio DESC LIMIT 30",
    )
    .await;
    json_or_error("economia/secop", result)
}

pub async fn turismo(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = select_rows(
        pool.get_ref(),
        "SELECT indicador, dato_numerico AS valor, anio, entidad AS municipio FROM socioeconomico.terridata",
        &["indicador ILIKE '%turis%'"],
        non_empty(&query.dane_code),
        " ORDER BY anio DESC",
    )
    .await
    .map(|detalle| TurismoResponse { total: detalle.len(), detalle });
    json_or_error("economia/turismo", result)
}

pub async fn finanzas(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = terridata_rows(pool.get_ref(), non_empty(&query.dane_code), Some("Finanzas públicas")).await;
    json_or_error("gobierno/finanzas", result)
}

pub async fn desempeno(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = terridata_rows(
        pool.get_ref(),
        non_empty(&query.dane_code),
        Some("Medición de desempeño municipal"),
    )
    .await;
    json_or_error("gobierno/desempeno", result)
}

pub async fn gobierno_digital(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = select_rows(
        pool.get_ref(),
        "SELECT indicador, dato_numerico AS valor, anio, entidad AS municipio FROM socioeconomico.terridata",
        &["indicador ILIKE '%gobierno digital%' OR indicador ILIKE '%gobierno en línea%' OR indicador ILIKE '%TIC%'"],
        non_empty(&query.dane_code),
        " ORDER BY anio DESC LIMIT 30",
    )
    .await;
    json_or_error("gobierno/digital", result)
}

pub async fn pobreza(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = terridata_rows(pool.get_ref(), non_empty(&query.dane_code), Some("Pobreza"))
        .await
        .map(|terridata| PobrezaResponse { terridata, ipm_detalle: Vec::new() });
    json_or_error("gobierno/pobreza", result)
}

pub async fn espacios_culturales(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let result = select_rows(
        pool.get_ref(),
        "SELECT indicador, dato_numerico AS valor, anio, entidad AS municipio FROM socioeconomico.terridata",
        &["indicador ILIKE '%cultur%' OR indicador ILIKE '%bibliotec%' OR indicador ILIKE '%museo%'"],
        non_empty(&query.dane_code),
        " ORDER BY anio DESC LIMIT 30",
    )
    .await;
    json_or_error("cultura/espacios", result)
}

// Tourism offer from Google Places, grouped by category
pub async fn turismo_detalle(pool: web::Data<PgPool>, query: web::Query<DaneQuery>) -> impl Responder {
    let categories = turismo_categories_sql();
    let result = select_rows(
        pool.get_ref(),
        "SELECT category, COUNT(*) AS total, AVG(rating) AS avg_rating FROM servicios.google_places",
        &[categories.as_str()],
        non_empty(&query.dane_code),
        " GROUP BY category ORDER BY total DESC",
    )
    .await
    .map(group_by_category);
    json_or_error("cultura/turismo-detalle", result)
}
