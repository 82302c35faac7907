pub mod api;
pub mod classifier;
pub mod config;
pub mod context;
pub mod generator;
pub mod metrics;
pub mod model;
pub mod simulation;
