//! GeckoTerminal pool price lookup.

use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;

use crate::enrichment::PriceSource;
use crate::error::EnrichError;

pub const DEFAULT_PRICE_API_URL: &str = "https://app.geckoterminal.com";

/// Market data for a pool's base token. Unparseable figures are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoolPrice {
    pub price_usd: f64,
    pub swap_count_24h: u64,
    pub change_24h_percent: f64,
    pub change_5m_percent: f64,
    pub change_15m_percent: f64,
    pub change_30m_percent: f64,
    pub high_24h_usd: f64,
    pub low_24h_usd: f64,
}

/// A figure the API sends either as a JSON number or as a decimal string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Figure {
    Number(f64),
    Text(String),
}

impl Figure {
    fn as_f64(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().unwrap_or_default(),
        }
    }
}

fn figure(value: &Option<Figure>) -> f64 {
    value.as_ref().map(Figure::as_f64).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct GeckoResponse {
    #[serde(default)]
    included: Vec<Included>,
}

#[derive(Debug, Deserialize)]
struct Included {
    #[serde(default)]
    attributes: PoolAttributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PoolAttributes {
    base_price_in_usd: Option<Figure>,
    swap_count: Option<Figure>,
    base_price_in_usd_percent_change: Option<Figure>,
    price_change_data: PriceChangeData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PriceChangeData {
    last_300_s: Window,
    last_900_s: Window,
    last_1800_s: Window,
    last_86400_s: DayWindow,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Window {
    base_token_usd: Option<Figure>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DayWindow {
    prices: DayPrices,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DayPrices {
    base_token_high_price_in_usd: Option<Figure>,
    base_token_low_price_in_usd: Option<Figure>,
}

/// Extract the first included pool's figures from a GeckoTerminal body.
pub fn parse_price_response(body: &str) -> Result<PoolPrice, EnrichError> {
    let response: GeckoResponse = serde_json::from_str(body)?;
    let attrs = response
        .included
        .into_iter()
        .next()
        .map(|i| i.attributes)
        .ok_or_else(|| EnrichError::Missing("pool price".into()))?;
    let changes = &attrs.price_change_data;

    Ok(PoolPrice {
        price_usd: figure(&attrs.base_price_in_usd),
        swap_count_24h: figure(&attrs.swap_count).max(0.0) as u64,
        change_24h_percent: figure(&attrs.base_price_in_usd_percent_change),
        change_5m_percent: figure(&changes.last_300_s.base_token_usd),
        change_15m_percent: figure(&changes.last_900_s.base_token_usd),
        change_30m_percent: figure(&changes.last_1800_s.base_token_usd),
        high_24h_usd: figure(&changes.last_86400_s.prices.base_token_high_price_in_usd),
        low_24h_usd: figure(&changes.last_86400_s.prices.base_token_low_price_in_usd),
    })
}

/// Client for GeckoTerminal's pool endpoint.
pub struct GeckoTerminalClient {
    http: reqwest::Client,
    base_url: String,
    network: String,
}

impl GeckoTerminalClient {
    pub fn new(
        base_url: impl Into<String>,
        network: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EnrichError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            network: network.into(),
        })
    }
}

#[async_trait]
impl PriceSource for GeckoTerminalClient {
    async fn pool_price(&self, pool: Address) -> Result<PoolPrice, EnrichError> {
        let url = format!("{}/api/p1/{}/pools/{pool:#x}", self.base_url, self.network);
        let resp = self
            .http
            .get(&url)
            .query(&[("include", "pairs"), ("base_token", "0")])
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
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
        parse_price_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_included_pool_attributes() {
        let body = r#"{
            "data": {"id": "1", "attributes": {}},
            "included": [{
                "id": "p1",
                "type": "pair",
                "attributes": {
                    "base_price_in_usd": "0.000012345",
                    "base_address": "0x6b175474e89094c44da98b954eedeac495271d0f",
                    "swap_count": 1532,
                    "base_price_in_usd_percent_change": "-12.5",
                    "price_change_data": {
                        "last_300_s": {"base_token_usd": "1.5"},
                        "last_900_s": {"base_token_usd": "-3"},
                        "last_1800_s": {"base_token_usd": "not a number"},
                        "last_86400_s": {"prices": {
                            "base_token_high_price_in_usd": "0.00002",
                            "base_token_low_price_in_usd": "0.00001"
                        }}
                    }
                }
            }]
        }"#;
        let price = parse_price_response(body).unwrap();
        assert_eq!(price.price_usd, 0.000012345);
        assert_eq!(price.swap_count_24h, 1532);
        assert_eq!(price.change_24h_percent, -12.5);
        assert_eq!(price.change_5m_percent, 1.5);
        assert_eq!(price.change_15m_percent, -3.0);
        assert_eq!(price.change_30m_percent, 0.0);
        assert_eq!(price.high_24h_usd, 0.00002);
        assert_eq!(price.low_24h_usd, 0.00001);
    }

    #[test]
    fn swap_count_may_be_a_string() {
        let body = r#"{"included": [{"attributes": {"swap_count": "77"}}]}"#;
        assert_eq!(parse_price_response(body).unwrap().swap_count_24h, 77);
    }

    #[test]
    fn missing_included_is_an_error() {
        let err = parse_price_response(r#"{"data": {}}"#).unwrap_err();
        assert!(matches!(err, EnrichError::Missing(_)));
    }
}
