//! GoPlus token-security lookup.

use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;

use crate::enrichment::TokenSecuritySource;
use crate::error::EnrichError;

pub const DEFAULT_SECURITY_API_URL: &str = "https://api.gopluslabs.io";

/// Token security report. Every field is optional; the accessors supply
/// placeholders for missing values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenSecurity {
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    /// `"0"` or `"1"`.
    pub is_honeypot: Option<String>,
    /// Decimal fraction, e.g. `"0.05"` for 5%.
    pub buy_tax: Option<String>,
    pub sell_tax: Option<String>,
    pub holder_count: Option<String>,
    /// Largest holders first.
    #[serde(default)]
    pub holders: Vec<Holder>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Holder {
    pub address: String,
    /// Decimal fraction of supply.
    #[serde(default)]
    pub percent: String,
}

impl TokenSecurity {
    pub fn name(&self) -> &str {
        non_empty(&self.token_name).unwrap_or("Unknown")
    }

    pub fn symbol(&self) -> &str {
        non_empty(&self.token_symbol).unwrap_or("UNK")
    }

    pub fn holder_count(&self) -> &str {
        non_empty(&self.holder_count).unwrap_or("0")
    }

    /// `None` when the honeypot check is missing or inconclusive.
    pub fn honeypot(&self) -> Option<bool> {
        match self.is_honeypot.as_deref() {
            Some("0") => Some(false),
            Some("1") => Some(true),
            _ => None,
        }
    }

    pub fn buy_tax(&self) -> Option<f64> {
        non_empty(&self.buy_tax)?.parse().ok()
    }

    pub fn sell_tax(&self) -> Option<f64> {
        non_empty(&self.sell_tax)?.parse().ok()
    }
}

impl Holder {
    pub fn fraction(&self) -> f64 {
        self.percent.parse().unwrap_or_default()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct GoPlusResponse {
    #[serde(default)]
    result: HashMap<String, TokenSecurity>,
}

/// Extract the report for `token` from a GoPlus response body.
pub fn parse_security_response(body: &str, token: Address) -> Result<TokenSecurity, EnrichError> {
    let mut response: GoPlusResponse = serde_json::from_str(body)?;
    let key = format!("{token:#x}");
    if let Some(report) = response.result.remove(&key) {
        return Ok(report);
    }
    response
        .result
        .into_values()
        .next()
        .ok_or_else(|| EnrichError::Missing(format!("token security for {key}")))
}

/// Client for the GoPlus `token_security` endpoint.
pub struct GoPlusClient {
    http: reqwest::Client,
    base_url: String,
    chain_id: String,
}

impl GoPlusClient {
    pub fn new(
        base_url: impl Into<String>,
        chain_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EnrichError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chain_id: chain_id.into(),
        })
    }
}

#[async_trait]
impl TokenSecuritySource for GoPlusClient {
    async fn token_security(&self, token: Address) -> Result<TokenSecurity, EnrichError> {
        let url = format!("{}/api/v1/token_security/{}", self.base_url, self.chain_id);
        let resp = self
            .http
            .get(&url)
            .query(&[("contract_addresses", format!("{token:#x}"))])
            .header(reqwest::header::ACCEPT, "*/*")
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(EnrichError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_security_response(&body, token)
    }
}
