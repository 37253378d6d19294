// src/lib.rs

pub mod clean;
pub mod config;
pub mod fetch;
pub mod load;
pub mod pipeline;
pub mod table;
