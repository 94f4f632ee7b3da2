pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;
pub use config::toml_config::TomlConfig;

pub use adapters::{ControllerClient, LocalStorage};
pub use app::pipelines::Dot1xAuditPipeline;
pub use crate::core::{audit::FleetAuditor, engine::AuditEngine};
pub use utils::error::{AuditError, Result};
