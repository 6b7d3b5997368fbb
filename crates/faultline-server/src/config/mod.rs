//! Server config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use faultline_core::error::{FaultlineError, Result};

pub use schema::{
    FailureSection, FaultlineConfig, LatencySection, LogFormat, LogSection, MetricsSection,
    ServerSection,
};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "FAULTLINE_CONFIG";
/// File picked up from the working directory when `FAULTLINE_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "faultline.yaml";

/// Resolve the config: `$FAULTLINE_CONFIG`, else `faultline.yaml` if present,
/// else built-in defaults.
pub fn load() -> Result<FaultlineConfig> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return load_from_file(&path);
    }
    if Path::new(DEFAULT_CONFIG_FILE).exists() {
        return load_from_file(DEFAULT_CONFIG_FILE);
    }
    Ok(FaultlineConfig::default())
}

pub fn load_from_file(path: &str) -> Result<FaultlineConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| FaultlineError::Internal(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<FaultlineConfig> {
    let cfg: FaultlineConfig = serde_yaml::from_str(s)
        .map_err(|e| FaultlineError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
