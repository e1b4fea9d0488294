pub mod agent;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod grid;
pub mod navigation;
pub mod player;
pub mod rng;
pub mod targeting;
pub mod types;
