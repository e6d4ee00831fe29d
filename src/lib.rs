pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod etl;
pub mod models;
pub mod routes;
