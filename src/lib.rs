pub mod cohort;
pub mod components;
pub mod config;
pub mod engine;
pub mod hex;
pub mod naming;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod web;
pub mod world;

pub use config::SimulationConfig;
pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use world::{World, WorldSnapshot};
