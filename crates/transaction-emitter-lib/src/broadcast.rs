// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{
    counters::{FAILED_SUBMISSIONS, SUBMITTED_TRANSACTIONS},
    id_capture::IdCapture,
    throttle::FixedWindowThrottle,
};
use anyhow::{Context, Result, bail};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{fmt, path::PathBuf, sync::Arc, time::Duration};
use stress_logger::prelude::*;
use stress_rest_client::ChainClient;
use stress_transaction_generator_lib::TransactionFileReader;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// One transaction file to broadcast, and where to put the ids, if anywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastTask {
    pub source: PathBuf,
    pub id_output: Option<PathBuf>,
    pub task_index: usize,
    pub total_tasks: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BroadcastReport {
    /// Records admitted by the throttle, submitted or not
    pub count: u64,
    pub submitted: u64,
    pub failed: u64,
    pub cost: Duration,
}

impl BroadcastReport {
    pub fn tps(&self) -> f64 {
        let cost_ms = self.cost.as_millis().max(1);
        self.count as f64 * 1000.0 / cost_ms as f64
    }

    fn add(&mut self, other: &BroadcastReport) {
        self.count += other.count;
        self.submitted += other.submitted;
        self.failed += other.failed;
    }
}

impl fmt::Display for BroadcastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count: {}, submitted: {}, failed: {}, cost: {:?}, tps: {:.2}",
            self.count,
            self.submitted,
            self.failed,
            self.cost,
            self.tps()
        )
    }
}

/// Replays transaction files against a set of nodes, each record going to a
/// randomly chosen node, at no more than `tps` submissions per second.
///
/// One throttle window spans every task the engine runs, so file boundaries
/// do not reopen the budget.
pub struct BroadcastEngine {
    clients: Vec<Arc<dyn ChainClient>>,
    throttle: FixedWindowThrottle,
    rng: StdRng,
}

impl BroadcastEngine {
    pub fn new(clients: Vec<Arc<dyn ChainClient>>, tps: usize) -> Result<Self> {
        if clients.is_empty() {
            bail!("No broadcast url configured");
        }
        Ok(Self {
            clients,
            throttle: FixedWindowThrottle::new(tps),
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Broadcasts the tasks one after the other. The report's cost spans all
    /// of them.
    pub async fn run_all(
        &mut self,
        tasks: &[BroadcastTask],
        cancel: &CancellationToken,
    ) -> Result<BroadcastReport> {
        let start = Instant::now();
        info!(
            "Broadcasting {} tasks at up to {} tps",
            tasks.len(),
            self.throttle.tps()
        );
        let mut total = BroadcastReport::default();
        for task in tasks {
            total.add(&self.run(task, cancel).await?);
        }
        total.cost = start.elapsed();
        info!("Broadcast finished: {}", total);
        Ok(total)
    }

    pub async fn run(
        &mut self,
        task: &BroadcastTask,
        cancel: &CancellationToken,
    ) -> Result<BroadcastReport> {
        let start = Instant::now();
        info!(
            "Start to broadcast task {}/{} from {}",
            task.task_index + 1,
            task.total_tasks,
            task.source.display()
        );

        let mut reader = TransactionFileReader::open(&task.source).await?;
        let capture = match &task.id_output {
            Some(path) => Some(IdCapture::create(path).await?),
            None => None,
        };

        let mut report = BroadcastReport::default();
        let result = self
            .submit_all(&mut reader, capture.as_ref(), &mut report, cancel)
            .await
            .with_context(|| {
                format!(
                    "Broadcast task {}/{} stopped after {} transactions",
                    task.task_index + 1,
                    task.total_tasks,
                    report.count
                )
            });
        // drain the id writer even when the broadcast failed
        if let Some(capture) = capture {
            let captured = capture.finish().await?;
            debug!("Captured {} transaction ids", captured);
        }
        result?;

        report.cost = start.elapsed();
        info!(
            "Broadcast task {}/{} finished: {}",
            task.task_index + 1,
            task.total_tasks,
            report
        );
        Ok(report)
    }

    async fn submit_all(
        &mut self,
        reader: &mut TransactionFileReader,
        capture: Option<&IdCapture>,
        report: &mut BroadcastReport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        while let Some(txn) = reader.next().await {
            let txn = txn?;
            self.throttle.acquire(cancel).await?;
            report.count += 1;

            let client = &self.clients[self.rng.gen_range(0, self.clients.len())];
            match client.submit(&txn).await {
                Ok(()) => {
                    report.submitted += 1;
                    SUBMITTED_TRANSACTIONS.inc();
                },
                Err(error) => {
                    report.failed += 1;
                    FAILED_SUBMISSIONS.inc();
                    sample!(
                        SampleRate::Duration(Duration::from_secs(10)),
                        warn!(
                            "[{}] Failed to submit transaction {}: {}",
                            client.endpoint(),
                            txn.id(),
                            error
                        )
                    );
                },
            }
            if let Some(capture) = capture {
                capture.record(txn.id());
            }

            sample!(
                SampleRate::Duration(Duration::from_secs(30)),
                info!(
                    "Broadcast {} transactions from {}, {} failed",
                    report.count,
                    reader.path().display(),
                    report.failed
                )
            );
        }
        Ok(())
    }
}
