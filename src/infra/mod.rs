//! Инфраструктурный слой вокруг движка:
//! - генерация ID;
//! - RNG-реализации для модулей правил;
//! - абстракция хранения и in-memory реализация;
//! - конфиг движка;
//! - засев встроенных модулей правил.

pub mod config;
pub mod ids;
pub mod persistence;
pub mod rng;
pub mod rng_seed;
pub mod seed;

pub use config::{ConfigError, EngineConfig};
pub use ids::*;
pub use persistence::*;
pub use rng::*;
pub use rng_seed::RngSeed;
pub use seed::seed_builtin_rules;
