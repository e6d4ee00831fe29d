pub mod routes;

pub mod root {
    pub mod root_handlers;
    pub mod root_models;
}

pub mod layers {
    pub mod layers_handlers;
    pub mod layers_models;
}

pub mod geo {
    pub mod geo_handlers;
    pub mod geo_models;
}

pub mod indicators {
    pub mod indicators_handlers;
    pub mod indicators_models;
}

pub mod crossvar {
    pub mod crossvar_handlers;
    pub mod crossvar_models;
}

pub mod stats {
    pub mod stats_handlers;
    pub mod stats_models;
}

pub mod analytics {
    pub mod analytics_handlers;
    pub mod analytics_models;
}

pub mod empleo {
    pub mod empleo_handlers;
    pub mod empleo_models;
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use sqlx::postgres::{PgPool, PgPoolOptions};

    use crate::config::Config;

    /// A pool that never connects unless a query runs.
    pub fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://observatorio@localhost/observatorio")
            .unwrap()
    }

    pub fn config() -> Config {
        Config {
            database_url: "postgres://observatorio@localhost/observatorio".into(),
            server_address: "127.0.0.1:8080".into(),
            dane_code: "05045".into(),
            municipality_name: "Apartadó".into(),
            data_dir: PathBuf::from("data"),
            docs_dir: PathBuf::from("docs"),
            max_connections: 1,
        }
    }
}
