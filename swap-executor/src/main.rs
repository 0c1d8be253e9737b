//! Entrypoint for the swap executor

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(unsafe_code)]
#![deny(clippy::uninlined_format_args)]

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use swap_executor::{
    chain_client::ChainClient,
    cli::{Cli, SwapConfig},
    clock::SystemClock,
    error::SwapError,
    orchestrator::{resolve_route, SwapOrchestrator, SwapRequest},
    signer::{LocalSigner, TransactionSigner},
    submitter::TransactionSubmitter,
    telemetry::configure_telemetry,
};
use tracing::{error, info};

/// Main entrypoint for the swap executor
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    configure_telemetry(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(safety = ?e.safety(), retry_safe = e.is_retry_safe(), "swap failed: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Fetch, quote, and execute the configured swap, printing the outcome
async fn run(cli: Cli) -> Result<(), SwapError> {
    let config = cli.into_config()?;
    let SwapConfig { rpc_url, signer, router, fee_bps, receipt_poll_interval, .. } = &config;

    let client = ChainClient::new(rpc_url, *router, *fee_bps, *receipt_poll_interval).await?;
    let chain_id = match config.chain_id {
        Some(chain_id) => chain_id,
        None => client.chain_id().await?,
    };
    let signer = LocalSigner::new(signer.clone(), chain_id);
    info!(chain_id, sender = %signer.address(), "connected to {rpc_url}");

    let route = resolve_route(&client, config.token_in, config.token_out, config.via_token).await?;
    let input_amount = route.input_token().parse_amount(&config.amount_in)?;
    let request = SwapRequest {
        route,
        input_amount,
        slippage: config.slippage,
        recipient: config.recipient,
        deadline_window_secs: config.deadline_window_secs,
    };

    let submitter = TransactionSubmitter::new(Arc::new(client), Arc::new(signer));
    let orchestrator = SwapOrchestrator::new(submitter, config.router, SystemClock);
    let outcome = orchestrator.execute(&request).await?;

    let output = serde_json::to_string_pretty(&outcome).map_err(SwapError::configuration)?;
    println!("{output}");
    Ok(())
}
