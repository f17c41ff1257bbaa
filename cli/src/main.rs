//! burnwatch: watch Ethereum for Uniswap V2 LP burns and alert on Telegram.
//!
//! # Commands
//! ```text
//! burnwatch [watch]              stream dead-address transfers and alert on LP burns
//! burnwatch check --tx <hash>    run the pipeline once for one transaction
//! ```
//!
//! Configuration comes from `--config <file.yaml>`, with `--ws-url`,
//! `--http-url`, `--bot-token` and `--chat-id` (or their `BURNWATCH_*`
//! environment variables) taking precedence.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use alloy_primitives::B256;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use burnwatch_alert::{
    AlertFormatter, BurnAlertPipeline, BurnOutcome, Enricher, GeckoTerminalClient, GoPlusClient,
    LogNotifier, Notifier, TelegramNotifier,
};
use burnwatch_core::{
    subscribe_dead_transfers, watch, BurnCalculator, BurnVerifier, ContractReader, RpcChainReader,
};
use burnwatch_observability::init_tracing;
use burnwatch_rpc_core::{RpcTransport, Retrying};
use burnwatch_rpc_http::{HttpClientConfig, HttpRpcClient};
use burnwatch_rpc_ws::WsRpcClient;

mod config;

use config::{AppConfig, Overrides};

#[derive(Parser)]
#[command(
    name = "burnwatch",
    about = "Detect Uniswap V2 LP burns on Ethereum and send Telegram alerts",
    version
)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// WebSocket RPC endpoint (subscriptions, and calls when --http-url is unset)
    #[arg(long, env = "BURNWATCH_WS_URL", global = true)]
    ws_url: Option<String>,

    /// HTTP RPC endpoint for calls
    #[arg(long, env = "BURNWATCH_HTTP_URL", global = true)]
    http_url: Option<String>,

    /// Telegram bot token
    #[arg(long, env = "BURNWATCH_BOT_TOKEN", global = true, hide_env_values = true)]
    bot_token: Option<String>,

    /// Telegram chat ID
    #[arg(long, env = "BURNWATCH_CHAT_ID", global = true)]
    chat_id: Option<String>,

    /// Log alerts instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Emit JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    /// Global log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch for LP burns until the subscription fails (default)
    Watch,
    /// Run the burn pipeline once for a transaction hash
    Check {
        /// Transaction hash (0x-prefixed)
        #[arg(long)]
        tx: B256,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            ws_url: self.ws_url.clone(),
            http_url: self.http_url.clone(),
            bot_token: self.bot_token.clone(),
            chat_id: self.chat_id.clone(),
            log_level: self.log_level.clone(),
            json_logs: self.json_logs,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "burnwatch stopped");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply(cli.overrides());
    init_tracing(&config.log).map_err(|e| anyhow!("installing log subscriber: {e}"))?;
    config.validate(cli.dry_run)?;

    let ws_url = config.rpc.ws_url.clone().unwrap_or_default();
    let ws = Arc::new(
        WsRpcClient::connect(&ws_url, config.ws_client())
            .await
            .with_context(|| format!("connecting to {ws_url}"))?,
    );

    let calls: Arc<dyn RpcTransport> = match &config.rpc.http_url {
        Some(url) => {
            let http = HttpRpcClient::new(
                url.as_str(),
                HttpClientConfig {
                    request_timeout: config.call_deadline(),
                },
            )?;
            Arc::new(Retrying::new(http, config.retry(), config.call_deadline()))
        }
        None => Arc::new(Retrying::new(
            ws.clone(),
            config.retry(),
            config.call_deadline(),
        )),
    };
    tracing::info!(ws = %ws_url, calls = %calls.url(), dry_run = cli.dry_run, "burnwatch starting");

    let pipeline = build_pipeline(&config, calls, cli.dry_run)?;

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            let logs = subscribe_dead_transfers(ws.as_ref(), config.chain.dead_address).await?;
            watch(logs, &pipeline).await?;
            Ok(())
        }
        Command::Check { tx } => match pipeline.process(tx).await? {
            BurnOutcome::Rejected(reason) => {
                println!("{tx}: not an LP burn ({reason})");
                Ok(())
            }
            BurnOutcome::Alerted(report) => {
                println!(
                    "{tx}: LP burn of {:.1} LP ({:.2}%), clog {:.1}%",
                    report.metrics.burned_amount,
                    report.metrics.burn_percentage,
                    report.metrics.clogged_percentage
                );
                Ok(())
            }
        },
    }
}

fn build_pipeline(
    config: &AppConfig,
    calls: Arc<dyn RpcTransport>,
    dry_run: bool,
) -> Result<BurnAlertPipeline> {
    let contracts = Arc::new(ContractReader::new(Arc::new(RpcChainReader::new(calls)))?);
    let timeout = config.enrichment_timeout();

    let security = GoPlusClient::new(
        config.enrichment.security_api_url.as_str(),
        config.enrichment.chain_id.as_str(),
        timeout,
    )?;
    let price = GeckoTerminalClient::new(
        config.enrichment.price_api_url.as_str(),
        config.enrichment.network.as_str(),
        timeout,
    )?;

    let notifier: Arc<dyn Notifier> = match config.telegram() {
        Some(telegram) if !dry_run => Arc::new(TelegramNotifier::new(telegram)?),
        _ => Arc::new(LogNotifier),
    };

    Ok(BurnAlertPipeline::new(
        BurnVerifier::new(contracts.clone(), config.verifier()),
        BurnCalculator::new(contracts),
        Enricher::new(Arc::new(security), Arc::new(price)),
        AlertFormatter::new(config.chain.explorer_url.as_str()),
        notifier,
    ))
}
