//! tempo.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use tempo_health::IntervalConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Name used in log lines.
    #[serde(default = "default_name")]
    pub name: String,
    pub intervals: IntervalConfig,
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// GET `path` on `address`; 2xx is healthy.
    Http {
        address: String,
        #[serde(default = "default_path")]
        path: String,
    },
    /// Open a TCP connection to `address`.
    Tcp { address: String },
}

fn default_name() -> String {
    "tempo".to_string()
}

fn default_path() -> String {
    "/healthz".to_string()
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.intervals.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A starter config probing a local HTTP health endpoint.
    pub fn scaffold() -> Self {
        DaemonConfig {
            name: default_name(),
            intervals: IntervalConfig::new(
                Duration::from_secs(30),
                Duration::from_secs(5),
                Duration::from_secs(60),
            )
            .with_probe_timeout(Duration::from_secs(2)),
            probe: ProbeConfig::Http {
                address: "127.0.0.1:8080".to_string(),
                path: default_path(),
            },
        }
    }
}
