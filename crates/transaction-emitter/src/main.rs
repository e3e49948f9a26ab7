// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stress_config::config::{PersistableConfig, StressConfig};
use stress_logger::{Level, StressLogger, prelude::*};
use stress_transaction_emitter_lib::{
    ConfigArgs, StatisticArgs, broadcast_transactions, compute_statistic, generate_transactions,
};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[clap(name = "stress-transaction-emitter", about = "Transaction stress test harness")]
struct Args {
    /// Log level, RUST_LOG takes precedence when set
    #[clap(long, global = true, default_value = "info")]
    log_level: Level,

    /// Also append logs to this file
    #[clap(long, global = true)]
    log_file: Option<PathBuf>,

    #[clap(subcommand)]
    command: StressCommand,
}

#[derive(Subcommand, Debug)]
enum StressCommand {
    /// Synthesizes signed transactions into the output directory, and
    /// extracts a historical block range for replay when enabled.
    Generate(ConfigArgs),

    /// Broadcasts the generated and/or replayed transactions at the configured
    /// rate, then measures the blocks produced meanwhile.
    Broadcast(ConfigArgs),

    /// Computes the TPS of a block range.
    Statistic(StatisticArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    StressLogger::builder()
        .level(args.log_level)
        .log_file(args.log_file.clone())
        .build()
        .context("Failed to initialize logging")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping");
                cancel.cancel();
            }
        });
    }

    let result = run(args.command, &cancel).await;
    if let Err(error) = &result {
        error!("{:#}", error);
    }
    result
}

async fn run(command: StressCommand, cancel: &CancellationToken) -> Result<()> {
    match command {
        StressCommand::Generate(args) => {
            let config = load_config(&args.config)?;
            let summary = generate_transactions(&config, cancel).await?;
            let generated: usize = summary.generated.iter().map(|task| task.written).sum();
            info!(
                "Generated {} transactions in {} files, replayed {}",
                generated,
                summary.generated.len(),
                summary.replayed.unwrap_or(0)
            );
        },
        StressCommand::Broadcast(args) => {
            let config = load_config(&args.config)?;
            let summary = broadcast_transactions(&config, cancel).await?;
            if let Some(report) = &summary.generated {
                info!("Broadcast generated transactions: {}", report);
            }
            if let Some(report) = &summary.replayed {
                info!("Broadcast replayed transactions: {}", report);
            }
        },
        StressCommand::Statistic(args) => {
            // only the node urls and the statistic section matter here
            let config = StressConfig::load_config(&args.config_args.config).with_context(|| {
                format!("Failed to load config {}", args.config_args.config.display())
            })?;
            let statistic =
                compute_statistic(&config, args.start_block, args.end_block, &args.output).await?;
            info!(
                "Blocks [{}, {}): tps {:.2}, miss block rate {:.4}",
                statistic.first_block,
                statistic.last_block,
                statistic.tps,
                statistic.miss_block_rate
            );
        },
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<StressConfig> {
    StressConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}
