//! Global `tracing` subscriber for the burnwatch binary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// The `log:` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level for everything without an override.
    pub level: String,
    /// Crate name (`burnwatch-rpc-ws` or `burnwatch_rpc_ws`) to level.
    pub components: BTreeMap<String, String>,
    /// One JSON object per line instead of the human-readable format.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            components: BTreeMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// `EnvFilter` directive string, e.g. `info,burnwatch_rpc_ws=debug`.
    pub fn directives(&self) -> String {
        self.components
            .iter()
            .fold(self.level.clone(), |mut out, (target, level)| {
                out.push(',');
                out.push_str(&target.replace('-', "_"));
                out.push('=');
                out.push_str(level);
                out
            })
    }

    fn filter(&self) -> EnvFilter {
        if let Ok(from_env) = EnvFilter::try_from_default_env() {
            return from_env;
        }
        EnvFilter::try_new(self.directives()).unwrap_or_else(|e| {
            eprintln!("invalid log directives {:?} ({e}), using info", self.directives());
            EnvFilter::new("info")
        })
    }
}

/// Install the process-wide subscriber. `RUST_LOG` wins over `config` when set.
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(config.filter());
    if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_overrides_use_crate_names() {
        let mut config = LogConfig::default();
        config.components.insert("burnwatch-rpc-ws".into(), "debug".into());
        config.components.insert("burnwatch-core".into(), "trace".into());
        assert_eq!(
            config.directives(),
            "info,burnwatch_core=trace,burnwatch_rpc_ws=debug"
        );
    }

    #[test]
    fn yaml_defaults() {
        let config: LogConfig = serde_yaml::from_str("json: true").unwrap();
        assert_eq!(config.level, "info");
        assert!(config.components.is_empty());
        assert!(config.json);
    }
}
