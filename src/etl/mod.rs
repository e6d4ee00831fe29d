//! Extract, clean and load pipelines feeding the PostGIS database.

pub mod frame;
pub mod heuristics;
pub mod loader;
pub mod pipelines;
pub mod report;
pub mod runner;
pub mod sources;
