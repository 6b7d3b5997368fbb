use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use faultline_core::error::{FaultlineError, Result};
use faultline_core::synthetic::{failure, latency};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaultlineConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub latency: LatencySection,

    #[serde(default)]
    pub failure: FailureSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub log: LogSection,
}

impl Default for FaultlineConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            latency: LatencySection::default(),
            failure: FailureSection::default(),
            metrics: MetricsSection::default(),
            log: LogSection::default(),
        }
    }
}

impl FaultlineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FaultlineError::UnsupportedVersion);
        }
        self.server.validate()?;
        self.latency.validate()?;
        self.failure.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            FaultlineError::BadRequest(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8000".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatencySection {
    #[serde(default = "default_min_ms")]
    pub min_ms: u64,

    #[serde(default = "default_spread_ms")]
    pub spread_ms: u64,
}

impl Default for LatencySection {
    fn default() -> Self {
        Self {
            min_ms: default_min_ms(),
            spread_ms: default_spread_ms(),
        }
    }
}

impl LatencySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=60000).contains(&self.min_ms) {
            return Err(FaultlineError::BadRequest(
                "latency.min_ms must be between 1 and 60000".into(),
            ));
        }
        if !(1..=60000).contains(&self.spread_ms) {
            return Err(FaultlineError::BadRequest(
                "latency.spread_ms must be between 1 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_min_ms() -> u64 {
    latency::DEFAULT_MIN_MS
}
fn default_spread_ms() -> u64 {
    latency::DEFAULT_SPREAD_MS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureSection {
    #[serde(default = "default_gateway_timeout_ms")]
    pub gateway_timeout_ms: u64,
}

impl Default for FailureSection {
    fn default() -> Self {
        Self {
            gateway_timeout_ms: default_gateway_timeout_ms(),
        }
    }
}

impl FailureSection {
    pub fn validate(&self) -> Result<()> {
        if self.gateway_timeout_ms > 60000 {
            return Err(FaultlineError::BadRequest(
                "failure.gateway_timeout_ms must be between 0 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }
}

fn default_gateway_timeout_ms() -> u64 {
    failure::DEFAULT_GATEWAY_TIMEOUT_MS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_true")]
    pub default_metrics: bool,

    #[serde(default = "default_collect_interval_ms")]
    pub collect_interval_ms: u64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            default_metrics: true,
            collect_interval_ms: default_collect_interval_ms(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=600000).contains(&self.collect_interval_ms) {
            return Err(FaultlineError::BadRequest(
                "metrics.collect_interval_ms must be between 100 and 600000".into(),
            ));
        }
        Ok(())
    }

    pub fn collect_interval(&self) -> Duration {
        Duration::from_millis(self.collect_interval_ms)
    }
}

fn default_true() -> bool {
    true
}
fn default_collect_interval_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    #[serde(default)]
    pub format: LogFormat,
}
