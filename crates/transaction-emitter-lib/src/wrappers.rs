// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{
    broadcast::{BroadcastEngine, BroadcastReport, BroadcastTask},
    statistic::{BlockStatistic, StatisticSettings},
};
use anyhow::{Context, Result, anyhow, bail};
use std::{path::Path, sync::Arc, time::Duration};
use stress_config::config::{StatisticConfig, StressConfig};
use stress_logger::prelude::*;
use stress_rest_client::{ChainClient, Client};
use stress_transaction_generator_lib::{
    ChainReference, GenerationSummary, GeneratorSettings, REPLAY_FILE_NAME, ReferenceUpdater,
    ReplayExtractor, TransactionFactory, TransactionGenerator, TransactionMix, plan_tasks,
};
use tokio_util::sync::CancellationToken;

pub const REPLAY_ID_FILE_NAME: &str = "broadcast-relay-trx-id.csv";
pub const GENERATE_RESULT_FILE_NAME: &str = "broadcast-generate-result";
pub const REPLAY_RESULT_FILE_NAME: &str = "broadcast-relay-result";

/// The id file of the `task_index`th generated file.
pub fn broadcast_id_file_name(task_index: usize) -> String {
    format!("broadcast-trx-id{}.csv", task_index)
}

#[derive(Debug, Default)]
pub struct GenerateSummary {
    pub generated: Vec<GenerationSummary>,
    /// Records written to the replay file, when replay is enabled
    pub replayed: Option<usize>,
}

#[derive(Debug, Default)]
pub struct BroadcastSummary {
    pub generated: Option<BroadcastReport>,
    pub replayed: Option<BroadcastReport>,
}

fn connect(url: &str) -> Result<Arc<dyn ChainClient>> {
    let client = Client::from_str_url(url).with_context(|| format!("Invalid node url {}", url))?;
    Ok(Arc::new(client))
}

async fn create_output_dir(output_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))
}

pub async fn generate_transactions(
    config: &StressConfig,
    cancel: &CancellationToken,
) -> Result<GenerateSummary> {
    config
        .sanitize()
        .context("Invalid stress test configuration")?;
    let reference_client = match &config.reference.url {
        Some(url) if config.reference.update => Some(connect(url)?),
        _ => None,
    };
    let replay_client = match &config.replay.url {
        Some(url) if config.replay.enable => Some(connect(url)?),
        _ => None,
    };
    generate_transactions_with_clients(config, reference_client, replay_client, cancel).await
}

/// Runs the generation phase, then the replay extraction, each when enabled.
/// Nothing is written until the configuration and the starting reference
/// have been resolved.
pub async fn generate_transactions_with_clients(
    config: &StressConfig,
    reference_client: Option<Arc<dyn ChainClient>>,
    replay_client: Option<Arc<dyn ChainClient>>,
    cancel: &CancellationToken,
) -> Result<GenerateSummary> {
    config
        .sanitize()
        .context("Invalid stress test configuration")?;
    let mut summary = GenerateSummary::default();

    if config.generate {
        let mix = TransactionMix::new(
            config
                .transaction_mix
                .iter()
                .map(|(txn_type, weight)| (*txn_type, *weight)),
        )
        .context("Invalid transaction mix")?;
        let reference = Arc::new(
            ChainReference::initialize(&config.reference, reference_client.as_deref()).await?,
        );
        let factory = Arc::new(TransactionFactory::from_config(
            &config.account,
            reference.clone(),
        )?);
        create_output_dir(&config.output_dir).await?;
        summary.generated = generate(config, factory, mix, reference, reference_client, cancel)
            .await?;
    }

    if config.replay.enable {
        let client = replay_client.ok_or_else(|| anyhow!("Replay needs a node to read from"))?;
        create_output_dir(&config.output_dir).await?;
        let written = ReplayExtractor::new(client)
            .extract_to_file(
                config.replay.start_block_number,
                config.replay.end_block_number,
                &config.output_dir.join(REPLAY_FILE_NAME),
                config.flush_batch_size,
                cancel,
            )
            .await?;
        summary.replayed = Some(written);
    }

    if !config.generate && !config.replay.enable {
        warn!("Neither generation nor replay is enabled, nothing to do");
    }
    Ok(summary)
}

async fn generate(
    config: &StressConfig,
    factory: Arc<TransactionFactory>,
    mix: TransactionMix,
    reference: Arc<ChainReference>,
    reference_client: Option<Arc<dyn ChainClient>>,
    cancel: &CancellationToken,
) -> Result<Vec<GenerationSummary>> {
    // a failed refresh cancels this run only
    let run_token = cancel.child_token();
    let updater = match reference_client {
        Some(client) if config.reference.update => Some(ReferenceUpdater::spawn(
            reference,
            client,
            Duration::from_secs(config.reference.refresh_interval_secs),
            run_token.clone(),
        )),
        _ => None,
    };

    let tasks = plan_tasks(
        config.total_transactions,
        config.single_task_transactions,
        &config.output_dir,
    );
    let generator = TransactionGenerator::new(factory, mix, GeneratorSettings {
        num_workers: config.num_generator_workers,
        flush_batch_size: config.flush_batch_size,
        seed: config.seed,
    });
    let result = generator.run_all(&tasks, &run_token).await;
    if let Some(updater) = updater {
        updater.shutdown().await?;
    }
    let summaries = result?;

    let written: usize = summaries.iter().map(|summary| summary.written).sum();
    info!(
        "Generated {} transactions into {} files",
        written,
        summaries.len()
    );
    Ok(summaries)
}

pub async fn broadcast_transactions(
    config: &StressConfig,
    cancel: &CancellationToken,
) -> Result<BroadcastSummary> {
    config
        .sanitize()
        .context("Invalid stress test configuration")?;
    let clients = config
        .broadcast
        .urls
        .iter()
        .map(|url| connect(url))
        .collect::<Result<Vec<_>>>()?;
    broadcast_transactions_with_clients(config, clients, cancel).await
}

/// Broadcasts the generated files, then the replay file, each when enabled.
/// The head block is read from the first client around each phase and the
/// blocks in between are measured into a report in the output directory.
pub async fn broadcast_transactions_with_clients(
    config: &StressConfig,
    clients: Vec<Arc<dyn ChainClient>>,
    cancel: &CancellationToken,
) -> Result<BroadcastSummary> {
    config
        .sanitize()
        .context("Invalid stress test configuration")?;
    let Some(statistic_client) = clients.first().cloned() else {
        bail!("No broadcast url configured");
    };
    let mut engine = BroadcastEngine::new(clients, config.tps)?;
    let settings = StatisticSettings::from(&config.statistic);
    let output_dir = &config.output_dir;
    let save_ids = config.broadcast.save_transaction_ids;
    let mut summary = BroadcastSummary::default();

    if config.broadcast.generated {
        let tasks: Vec<_> = plan_tasks(
            config.total_transactions,
            config.single_task_transactions,
            output_dir,
        )
        .into_iter()
        .map(|task| BroadcastTask {
            source: task.output,
            id_output: save_ids.then(|| output_dir.join(broadcast_id_file_name(task.task_index))),
            task_index: task.task_index,
            total_tasks: task.total_tasks,
        })
        .collect();
        info!("Broadcasting {} generated files", tasks.len());
        let report = broadcast_phase(
            &mut engine,
            &tasks,
            statistic_client.as_ref(),
            settings,
            &output_dir.join(GENERATE_RESULT_FILE_NAME),
            cancel,
        )
        .await?;
        summary.generated = Some(report);
    }

    if config.broadcast.replayed {
        let task = BroadcastTask {
            source: output_dir.join(REPLAY_FILE_NAME),
            id_output: save_ids.then(|| output_dir.join(REPLAY_ID_FILE_NAME)),
            task_index: 0,
            total_tasks: 1,
        };
        info!("Broadcasting replayed transactions");
        let report = broadcast_phase(
            &mut engine,
            &[task],
            statistic_client.as_ref(),
            settings,
            &output_dir.join(REPLAY_RESULT_FILE_NAME),
            cancel,
        )
        .await?;
        summary.replayed = Some(report);
    }

    if !config.broadcast.generated && !config.broadcast.replayed {
        warn!("Neither generated nor replayed transactions are selected for broadcast");
    }
    Ok(summary)
}

async fn broadcast_phase(
    engine: &mut BroadcastEngine,
    tasks: &[BroadcastTask],
    client: &dyn ChainClient,
    settings: StatisticSettings,
    result_path: &Path,
    cancel: &CancellationToken,
) -> Result<BroadcastReport> {
    let start_block = head_block_number(client).await;
    let report = engine.run_all(tasks, cancel).await?;
    let end_block = head_block_number(client).await;

    if let (Some(start), Some(end)) = (start_block, end_block) {
        match BlockStatistic::collect(client, start, end, settings).await {
            Ok(statistic) => statistic.write_report(result_path).await?,
            Err(error) => warn!(
                "No block statistic for blocks [{}, {}]: {:#}",
                start, end, error
            ),
        }
    }
    Ok(report)
}

async fn head_block_number(client: &dyn ChainClient) -> Option<u64> {
    match client.get_head_block().await {
        Ok(block) => Some(block.number()),
        Err(error) => {
            warn!("[{}] Failed to fetch head block: {}", client.endpoint(), error);
            None
        },
    }
}

/// Measures `[start_block, end_block]` on the reference node, or the first
/// broadcast node, and writes the report to `output`.
pub async fn compute_statistic(
    config: &StressConfig,
    start_block: u64,
    end_block: u64,
    output: &Path,
) -> Result<BlockStatistic> {
    let url = config
        .reference
        .url
        .as_deref()
        .or_else(|| config.broadcast.urls.first().map(String::as_str))
        .ok_or_else(|| anyhow!("No node url configured for the block statistic"))?;
    let client = connect(url)?;
    compute_statistic_with_client(
        client.as_ref(),
        &config.statistic,
        start_block,
        end_block,
        output,
    )
    .await
}

pub async fn compute_statistic_with_client(
    client: &dyn ChainClient,
    config: &StatisticConfig,
    start_block: u64,
    end_block: u64,
    output: &Path,
) -> Result<BlockStatistic> {
    let statistic = BlockStatistic::collect(client, start_block, end_block, config.into()).await?;
    statistic.write_report(output).await?;
    info!("Block statistic written to {}", output.display());
    Ok(statistic)
}
