//! Configuration system for Flow.
//!
//! A single YAML file with four sections:
//! 1. `refine` - flagging and acceptance thresholds
//! 2. `highlight` - report presentation
//! 3. `models` - inference service endpoint and model identifiers
//! 4. `concurrency` - sentence-level parallelism

pub use self::global::{ConcurrencyConfig, Config, HighlightConfig, ModelsConfig};
pub use self::refine::{PllMethod, RefineConfig};

mod global;
mod refine;

use eyre::Result;
use std::path::PathBuf;

/// Load configuration from the standard search paths and validate it.
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<Config> {
    let config = Config::load(explicit_path)?;
    config.validate()?;
    Ok(config)
}
