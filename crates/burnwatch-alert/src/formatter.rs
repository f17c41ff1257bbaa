//! Telegram HTML alert rendering.

use std::fmt::Write as _;

use burnwatch_core::{BurnMetrics, TokenInfo, VerifiedBurn};

use crate::enrichment::Enrichment;
use crate::price::PoolPrice;
use crate::security::TokenSecurity;

pub const DEFAULT_EXPLORER_URL: &str = "https://etherscan.io";

const UNKNOWN: &str = "Unknown 🟨";

/// Everything known about one burn.
#[derive(Debug, Clone)]
pub struct BurnReport {
    pub burn: VerifiedBurn,
    pub token: TokenInfo,
    pub metrics: BurnMetrics,
    pub enrichment: Enrichment,
    /// Whole USD, zero when unknown.
    pub market_cap: u64,
}

#[derive(Debug, Clone)]
pub struct AlertFormatter {
    explorer_url: String,
}

impl Default for AlertFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPLORER_URL)
    }
}

impl AlertFormatter {
    pub fn new(explorer_url: impl Into<String>) -> Self {
        Self {
            explorer_url: explorer_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Render the alert in Telegram's HTML subset.
    pub fn format(&self, report: &BurnReport) -> String {
        let explorer = &self.explorer_url;
        let token = report.burn.underlying_token.to_string();
        let tx = report.burn.candidate.transaction_hash;
        let security = &report.enrichment.security;
        let metrics = &report.metrics;

        let mut msg = String::new();
        let _ = writeln!(msg, "🔥🔥New LP Burn Detected🔥🔥");
        let _ = writeln!(
            msg,
            "<a href=\"{explorer}/address/{token}\">{}</a><b>({})</b>",
            escape_html(security.name()),
            escape_html(security.symbol())
        );
        let _ = writeln!(msg, "<code>{token}</code>");
        let _ = writeln!(msg);
        let _ = writeln!(msg, "💰<b>Mcap:</b> ${}", thousands(report.market_cap));
        let _ = writeln!(
            msg,
            "        <b>⎿ Hash:</b> <a href=\"{explorer}/tx/{tx}\">Click Here</a>"
        );
        let _ = writeln!(
            msg,
            "        <b>⎿ Burned:</b> {:.1}({:.2}%)",
            metrics.burned_amount, metrics.burn_percentage
        );
        let _ = writeln!(msg);
        let _ = writeln!(msg, "🔵 Honeypot : {}", honeypot(security));
        let _ = writeln!(msg, "        <b>⎿ Buy Tax:</b> {}", tax(security.buy_tax()));
        let _ = writeln!(msg, "        <b>⎿ Sell Tax:</b> {}", tax(security.sell_tax()));
        let _ = writeln!(
            msg,
            "        <b>⎿ Clogged:</b> {} ({:.1}%)",
            thousands(metrics.clogged_amount.max(0.0) as u64),
            metrics.clogged_percentage
        );
        let _ = writeln!(msg);
        let _ = writeln!(
            msg,
            "📊 <b>24h Swaps:</b> {}",
            thousands(report.enrichment.price.swap_count_24h)
        );
        write_price(&mut msg, &report.enrichment.price);
        let _ = writeln!(
            msg,
            "👤 Current Holders Count: {}",
            escape_html(security.holder_count())
        );
        let _ = writeln!(
            msg,
            "        <b>⎿ Top Holders:</b> {}",
            self.top_holders(security)
        );
        let _ = writeln!(msg);
        let _ = write!(
            msg,
            "<b>Chart:</b> <a href=\"https://www.dextools.io/app/en/ether/pair-explorer/{token}\">DexTools</a> \
             | <a href=\"https://dexscreener.com/ethereum/{token}\">DexScreener</a> \
             | <a href=\"https://dexspy.io/eth/token/{token}\">DexSpy</a>"
        );
        msg
    }

    fn top_holders(&self, security: &TokenSecurity) -> String {
        if security.holders.is_empty() {
            return "N/A".into();
        }
        security
            .holders
            .iter()
            .take(2)
            .map(|h| {
                format!(
                    "<a href=\"{}/address/{}\">{:.2}%</a>",
                    self.explorer_url,
                    escape_html(&h.address),
                    h.fraction() * 100.0
                )
            })
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Price block; a zero price means the lookup failed and only `Unknown` is shown.
fn write_price(msg: &mut String, price: &PoolPrice) {
    if price.price_usd <= 0.0 {
        let _ = writeln!(msg, "💲<b>Price:</b> {UNKNOWN}");
        return;
    }
    let _ = writeln!(
        msg,
        "💲<b>Price:</b> {} (24h {:+.1}%)",
        usd(price.price_usd),
        price.change_24h_percent
    );
    let _ = writeln!(
        msg,
        "        <b>⎿ 5m | 15m | 30m:</b> {:+.1}% | {:+.1}% | {:+.1}%",
        price.change_5m_percent, price.change_15m_percent, price.change_30m_percent
    );
    let _ = writeln!(
        msg,
        "        <b>⎿ 24h Range:</b> {} - {}",
        usd(price.low_24h_usd),
        usd(price.high_24h_usd)
    );
}

/// Dollar amount with four significant digits below $1.
fn usd(value: f64) -> String {
    if value >= 1.0 || value <= 0.0 || !value.is_finite() {
        return format!("${value:.2}");
    }
    let leading_zeros = (-value.log10()).floor() as usize;
    format!("${value:.prec$}", prec = (leading_zeros + 4).min(18))
}

fn honeypot(security: &TokenSecurity) -> &'static str {
    match security.honeypot() {
        Some(false) => "False 🟩",
        Some(true) => "True 🟥",
        None => UNKNOWN,
    }
}

fn tax(fraction: Option<f64>) -> String {
    match fraction {
        Some(f) => format!("{:.1}%", f * 100.0),
        None => UNKNOWN.into(),
    }
}

/// `1234567` → `"1,234,567"`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
