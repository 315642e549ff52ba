//! Coordinator wiring the stages together.

mod config;
mod core;

pub use self::config::{ManagerConfig, StageSettings};
pub use self::core::{ManagerError, ManagerStats, QueryManager};
