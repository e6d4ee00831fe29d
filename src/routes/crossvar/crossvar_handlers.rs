use std::time::Duration;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::warn;
use serde_json::{json, Value};
use sqlx::PgPool;

use super::crossvar_models::{
    pearson, round_to, xy_pairs, Regression, ScatterQuery, ScatterResponse, SecurityMatrixQuery, VariableName,
    SECURITY_TABLES,
};
use crate::cache::ResponseCache;
use crate::db::{json_rows, non_empty, rows_query};
use crate::errors::ApiError;
use crate::models::variable::{find_variable, Variable, VARIABLES};

const CACHE_TTL: Duration = Duration::from_secs(600);

pub async fn list_variables() -> impl Responder {
    HttpResponse::Ok().json(VARIABLES)
}

async fn matrix_rows(pool: &PgPool, dane_code: Option<&str>) -> Result<Vec<Value>, sqlx::Error> {
    let mut qb = rows_query();
    for (i, (label, table)) in SECURITY_TABLES.iter().enumerate() {
        if i > 0 {
            qb.push(" UNION ALL ");
        }
        qb.push(format!(
            "SELECT '{}' AS tipo, EXTRACT(YEAR FROM fecha)::int AS anio, SUM(cantidad) AS total FROM {} WHERE 1=1",
            label, table
        ));
        if let Some(code) = dane_code {
            qb.push(" AND dane_code = ").push_bind(code);
        }
        qb.push(" GROUP BY anio");
    }
    qb.push(" ORDER BY tipo, anio");
    json_rows(pool, qb).await
}

// Yearly totals per crime type
pub async fn security_matrix(
    pool: web::Data<PgPool>,
    cache: web::Data<ResponseCache>,
    req: HttpRequest,
    query: web::Query<SecurityMatrixQuery>,
) -> impl Responder {
    cache
        .respond(&req, CACHE_TTL, async {
            let data = match matrix_rows(pool.get_ref(), non_empty(&query.dane_code)).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("security_matrix error: {}", e);
                    Vec::new()
                }
            };
            Ok(json!({ "data": data }))
        })
        .await
}

async fn scatter_points(pool: &PgPool, x: &Variable, y: &Variable) -> Result<Vec<Value>, sqlx::Error> {
    let mut qb = rows_query();
    qb.push(
        "WITH x_data AS (SELECT DISTINCT ON (entidad) entidad AS municipio, codigo_entidad, \
         dato_numerico AS valor, anio FROM socioeconomico.terridata WHERE indicador = ",
    )
    .push_bind(x.indicador)
    .push(
        " ORDER BY entidad, anio DESC), \
         y_data AS (SELECT DISTINCT ON (entidad) entidad AS municipio, codigo_entidad, \
         dato_numerico AS valor, anio FROM socioeconomico.terridata WHERE indicador = ",
    )
    .push_bind(y.indicador)
    .push(
        " ORDER BY entidad, anio DESC) \
         SELECT x.municipio AS label, x.valor AS x, y.valor AS y \
         FROM x_data x JOIN y_data y ON x.codigo_entidad = y.codigo_entidad \
         WHERE x.valor IS NOT NULL AND y.valor IS NOT NULL",
    );
    json_rows(pool, qb).await
}

async fn scatter_body(pool: &PgPool, var_x: &str, var_y: &str) -> Result<Value, ApiError> {
    let (Some(x), Some(y)) = (find_variable(var_x), find_variable(var_y)) else {
        return Ok(json!({ "points": [], "correlation": 0, "n": 0, "error": "Variable no encontrada" }));
    };

    let points = match scatter_points(pool, x, y).await {
        Ok(points) => points,
        Err(e) => {
            warn!("scatter error: {}", e);
            return Ok(json!({ "points": [], "correlation": 0, "n": 0 }));
        }
    };
    let (xs, ys) = xy_pairs(&points);
    let correlation = pearson(&xs, &ys);

    Ok(serde_json::to_value(ScatterResponse {
        var_x: VariableName { name: x.name },
        var_y: VariableName { name: y.name },
        n: points.len(),
        points,
        correlation,
        regression: Regression { r_squared: round_to(correlation * correlation, 3) },
    })
    .unwrap_or(Value::Null))
}

// Two TerriData indicators crossed across municipalities
pub async fn scatter(
    pool: web::Data<PgPool>,
    cache: web::Data<ResponseCache>,
    req: HttpRequest,
    query: web::Query<ScatterQuery>,
) -> impl Responder {
    cache
        .respond(&req, CACHE_TTL, scatter_body(pool.get_ref(), &query.var_x, &query.var_y))
        .await
}

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App};
    use serde_json::Value;

    use crate::cache::ResponseCache;
    use crate::routes::routes::crossvar_configure;
    use crate::routes::test_support;

    #[actix_web::test]
    async fn variables_and_unknown_scatter() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::lazy_pool()))
                .app_data(web::Data::new(ResponseCache::new()))
                .configure(crossvar_configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/crossvar/variables").to_request();
        let variables: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(variables.as_array().map(|v| v.len()), Some(8));
        assert_eq!(variables[0], serde_json::json!({"id": "poblacion", "name": "Población total"}));

        let req = test::TestRequest::get()
            .uri("/api/crossvar/scatter?var_x=poblacion&var_y=pib")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "Variable no encontrada");
        assert_eq!(body["n"], 0);
    }
}
