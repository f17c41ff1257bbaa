//! Application configuration: YAML file, then command-line/env overrides.

use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use burnwatch_alert::formatter::DEFAULT_EXPLORER_URL;
use burnwatch_alert::notifier::DEFAULT_TELEGRAM_API_URL;
use burnwatch_alert::price::DEFAULT_PRICE_API_URL;
use burnwatch_alert::security::DEFAULT_SECURITY_API_URL;
use burnwatch_alert::TelegramConfig;
use burnwatch_core::verifier::{DEAD_ADDRESS, WETH};
use burnwatch_core::VerifierConfig;
use burnwatch_observability::LogConfig;
use burnwatch_rpc_core::RetryConfig;
use burnwatch_rpc_ws::WsClientConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub rpc: RpcSection,
    pub chain: ChainSection,
    pub enrichment: EnrichmentSection,
    pub telegram: TelegramSection,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcSection {
    pub ws_url: Option<String>,
    /// Calls go over the WebSocket when unset.
    pub http_url: Option<String>,
    pub call_timeout_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// `0` stops on the first disconnect.
    pub max_reconnect_attempts: u32,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            ws_url: None,
            http_url: None,
            call_timeout_ms: 10_000,
            max_retries: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            max_reconnect_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainSection {
    pub dead_address: Address,
    pub wrapped_native: Address,
    pub lp_name_marker: String,
    pub explorer_url: String,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            dead_address: DEAD_ADDRESS,
            wrapped_native: WETH,
            lp_name_marker: "Uniswap".into(),
            explorer_url: DEFAULT_EXPLORER_URL.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentSection {
    pub security_api_url: String,
    pub price_api_url: String,
    pub chain_id: String,
    pub network: String,
    pub timeout_ms: u64,
}

impl Default for EnrichmentSection {
    fn default() -> Self {
        Self {
            security_api_url: DEFAULT_SECURITY_API_URL.into(),
            price_api_url: DEFAULT_PRICE_API_URL.into(),
            chain_id: "1".into(),
            network: "eth".into(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_url: String,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_url: DEFAULT_TELEGRAM_API_URL.into(),
        }
    }
}

/// Values from the command line or environment; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ws_url: Option<String>,
    pub http_url: Option<String>,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub log_level: Option<String>,
    pub json_logs: bool,
}

impl AppConfig {
    /// Load from `path`, or start from defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if overrides.ws_url.is_some() {
            self.rpc.ws_url = overrides.ws_url;
        }
        if overrides.http_url.is_some() {
            self.rpc.http_url = overrides.http_url;
        }
        if overrides.bot_token.is_some() {
            self.telegram.bot_token = overrides.bot_token;
        }
        if overrides.chat_id.is_some() {
            self.telegram.chat_id = overrides.chat_id;
        }
        if let Some(level) = overrides.log_level {
            self.log.level = level;
        }
        if overrides.json_logs {
            self.log.json = true;
        }
    }

    /// Check that everything needed to run is present.
    pub fn validate(&self, dry_run: bool) -> Result<()> {
        match self.rpc.ws_url.as_deref() {
            None | Some("") => bail!("rpc.ws_url is required (or --ws-url / BURNWATCH_WS_URL)"),
            Some(url) if !(url.starts_with("ws://") || url.starts_with("wss://")) => {
                bail!("rpc.ws_url must be a ws:// or wss:// URL, got {url}")
            }
            Some(_) => {}
        }
        if self.chain.lp_name_marker.is_empty() {
            bail!("chain.lp_name_marker must not be empty");
        }
        if !dry_run {
            if self.telegram.bot_token.as_deref().unwrap_or("").is_empty() {
                bail!("telegram.bot_token is required unless --dry-run is set");
            }
            if self.telegram.chat_id.as_deref().unwrap_or("").is_empty() {
                bail!("telegram.chat_id is required unless --dry-run is set");
            }
        }
        Ok(())
    }

    pub fn call_deadline(&self) -> Duration {
        Duration::from_millis(self.rpc.call_timeout_ms)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.rpc.max_retries,
            initial_backoff: Duration::from_millis(self.rpc.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.rpc.max_backoff_ms),
            ..RetryConfig::default()
        }
    }

    pub fn ws_client(&self) -> WsClientConfig {
        WsClientConfig {
            max_reconnect_attempts: self.rpc.max_reconnect_attempts,
            ..WsClientConfig::default()
        }
    }

    pub fn verifier(&self) -> VerifierConfig {
        VerifierConfig {
            dead_address: self.chain.dead_address,
            wrapped_native: self.chain.wrapped_native,
            lp_name_marker: self.chain.lp_name_marker.clone(),
        }
    }

    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_millis(self.enrichment.timeout_ms)
    }

    /// `None` unless both credentials are set.
    pub fn telegram(&self) -> Option<TelegramConfig> {
        Some(TelegramConfig {
            api_url: self.telegram.api_url.clone(),
            bot_token: self.telegram.bot_token.clone()?,
            chat_id: self.telegram.chat_id.clone()?,
            timeout: self.enrichment_timeout(),
        })
    }
}
