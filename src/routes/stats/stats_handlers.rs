use actix_web::{web, HttpResponse, Responder, ResponseError};
use log::{error, warn};
use sqlx::PgPool;

use super::stats_models::{round_1, CatalogEntry, IcfesSummary, Summary, CRIME_TOTALS, DEPARTAMENTO, REGION};
use crate::config::Config;
use crate::db::{count_or_zero, json_rows, quoted_table, rows_query, served_tables, table_columns};
use crate::errors::ApiError;

/// A nullable bigint aggregate; query failures (e.g. table not loaded yet) read as NULL.
async fn optional_sum(pool: &PgPool, sql: &str) -> Option<i64> {
    match sqlx::query_scalar::<_, Option<i64>>(sql).fetch_one(pool).await {
        Ok(value) => value,
        Err(e) => {
            warn!("summary query failed ({}): {}", sql, e);
            None
        }
    }
}

async fn icfes_summary(pool: &PgPool) -> IcfesSummary {
    let row = sqlx::query_as::<_, (i64, i64, Option<f64>)>(
        "SELECT COUNT(DISTINCT cole_nombre), COUNT(*), AVG(punt_global)::float8 \
         FROM socioeconomico.icfes WHERE punt_global IS NOT NULL",
    )
    .fetch_one(pool)
    .await;
    match row {
        Ok((colegios, estudiantes, promedio)) => IcfesSummary {
            colegios_evaluados: colegios,
            estudiantes_evaluados: estudiantes,
            promedio_global: promedio.map(round_1),
        },
        Err(e) => {
            warn!("icfes summary failed: {}", e);
            IcfesSummary::default()
        }
    }
}

async fn top_hechos(pool: &PgPool) -> Vec<serde_json::Value> {
    let mut qb = rows_query();
    qb.push(
        "SELECT hecho, SUM(personas)::bigint AS personas FROM seguridad.victimas_conflicto \
         WHERE personas IS NOT NULL GROUP BY hecho ORDER BY personas DESC LIMIT 5",
    );
    json_rows(pool, qb).await.unwrap_or_else(|e| {
        warn!("victimizing events query failed: {}", e);
        Vec::new()
    })
}

// Headline cards of the dashboard
pub async fn summary(pool: web::Data<PgPool>, config: web::Data<Config>) -> impl Responder {
    let pool = pool.get_ref();
    let mut summary = Summary {
        municipio: config.municipality_name.clone(),
        divipola: config.dane_code.clone(),
        departamento: DEPARTAMENTO,
        region: REGION,
        ..Summary::default()
    };

    summary.poblacion_censal_2018 = optional_sum(
        pool,
        "SELECT SUM(total_personas::text::bigint)::bigint FROM cartografia.manzanas_censales \
         WHERE total_personas::text ~ '^[0-9]+$'",
    )
    .await;
    summary.manzanas_censales = count_or_zero(pool, "cartografia.manzanas_censales").await;
    summary.edificaciones_osm = count_or_zero(pool, "cartografia.osm_edificaciones").await;
    summary.vias_osm = count_or_zero(pool, "cartografia.osm_vias").await;
    summary.establecimientos_comerciales = count_or_zero(pool, "servicios.google_places").await;
    summary.establecimientos_educativos = count_or_zero(pool, "socioeconomico.establecimientos_educativos").await;
    summary.matricula_total = optional_sum(
        pool,
        "SELECT SUM(total_matricula)::bigint FROM socioeconomico.establecimientos_educativos",
    )
    .await;
    summary.icfes = icfes_summary(pool).await;
    summary.ips_salud = count_or_zero(pool, "socioeconomico.ips_salud").await;

    for (key, table) in CRIME_TOTALS {
        let total = optional_sum(pool, &format!("SELECT SUM(cantidad)::bigint FROM {}", table)).await;
        summary.set_crime_total(key, total.unwrap_or(0));
    }
    summary.total_victimas_conflicto =
        optional_sum(pool, "SELECT SUM(personas)::bigint FROM seguridad.victimas_conflicto")
            .await
            .unwrap_or(0);
    summary.principales_hechos_victimizantes = top_hechos(pool).await;
    summary.prestadores_servicios = count_or_zero(pool, "servicios.prestadores_raw").await;

    HttpResponse::Ok().json(summary)
}

async fn fetch_catalog(pool: &PgPool) -> Result<Vec<CatalogEntry>, ApiError> {
    let mut catalog = Vec::new();
    for (schema, table) in served_tables(pool).await? {
        let records = count_or_zero(pool, &quoted_table(&schema, &table)).await;
        let columns = table_columns(pool, &schema, &table).await?;
        catalog.push(CatalogEntry {
            full_name: format!("{}.{}", schema, table),
            schema,
            table,
            records,
            columns,
        });
    }
    Ok(catalog)
}

// Every loaded table with its row count and columns
pub async fn data_catalog(pool: web::Data<PgPool>) -> impl Responder {
    match fetch_catalog(pool.get_ref()).await {
        Ok(catalog) => HttpResponse::Ok().json(catalog),
        Err(e) => {
            error!("Failed to build data catalog: {}", e);
            e.error_response()
        }
    }
}
