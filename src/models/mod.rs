// src/models/mod.rs

pub mod layer;
pub mod variable;
