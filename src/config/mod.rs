//! Configuration module for plansync.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `plansync.yaml`
//! - Environment variable overrides
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, ENV_GROUND_STATION, ENV_PLAN_DIR, ENV_SIM_LATENCY_MS,
    find_config_file,
};
pub use spec::{
    CONFIG_TEMPLATE, DEFAULT_GROUND_STATION, DEFAULT_SIM_LATENCY_MS, DocumentConfig,
    OfflineEditingConfig, PlanSyncConfig, SimulatorConfig, StorageConfig,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
