// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{
    storage::TransactionFileWriter, transaction_factory::TransactionFactory,
    transaction_mix::TransactionMix,
};
use anyhow::{Context, Result, bail};
use rand::{SeedableRng, rngs::StdRng};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use stress_logger::prelude::*;
use stress_types::SignedTransaction;
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

pub const GENERATED_FILE_PREFIX: &str = "generate-trx";
pub const REPLAY_FILE_NAME: &str = "relay-trx.bin";

pub fn generated_file_name(task_index: usize) -> String {
    format!("{}{}.bin", GENERATED_FILE_PREFIX, task_index)
}

/// One output file worth of transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationTask {
    pub requested_count: usize,
    pub output: PathBuf,
    pub task_index: usize,
    pub total_tasks: usize,
}

/// Splits `total` into `ceil(total / cap)` tasks, the last one carrying the
/// remainder. A zero total still yields one (empty) task.
pub fn plan_tasks(total: usize, cap: usize, output_dir: &Path) -> Vec<GenerationTask> {
    let cap = cap.max(1);
    let total_tasks = total.div_ceil(cap).max(1);
    (0..total_tasks)
        .map(|task_index| GenerationTask {
            requested_count: (total - task_index * cap).min(cap),
            output: output_dir.join(generated_file_name(task_index)),
            task_index,
            total_tasks,
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct GenerationSummary {
    pub task_index: usize,
    pub total_tasks: usize,
    pub output: PathBuf,
    pub written: usize,
    pub elapsed: Duration,
}

/// The single consumer of a transaction channel: appends records to a file in
/// arrival order until the expected number has been written.
pub struct TransactionSink {
    writer: TransactionFileWriter,
    expected: usize,
    flush_batch_size: usize,
    task_index: usize,
    total_tasks: usize,
}

impl TransactionSink {
    pub fn new(
        writer: TransactionFileWriter,
        expected: usize,
        flush_batch_size: usize,
        task_index: usize,
        total_tasks: usize,
    ) -> Self {
        Self {
            writer,
            expected,
            flush_batch_size: flush_batch_size.max(1),
            task_index,
            total_tasks,
        }
    }

    pub fn spawn(
        self,
        receiver: UnboundedReceiver<SignedTransaction>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<usize>> {
        tokio::spawn(self.consume(receiver, cancel))
    }

    /// Returns the number of records written, which equals `expected` on
    /// success.
    pub async fn consume(
        mut self,
        mut receiver: UnboundedReceiver<SignedTransaction>,
        cancel: CancellationToken,
    ) -> Result<usize> {
        let path = self.writer.path().to_path_buf();
        let mut remaining = self.expected;
        while remaining > 0 {
            let txn = tokio::select! {
                biased;
                _ = cancel.cancelled() => bail!(
                    "Cancelled with {} of {} transactions written, partially written file {}",
                    self.writer.written(),
                    self.expected,
                    path.display()
                ),
                txn = receiver.recv() => txn,
            };
            let Some(txn) = txn else {
                bail!(
                    "Producers stopped after {} of {} transactions, partially written file {}",
                    self.writer.written(),
                    self.expected,
                    path.display()
                );
            };

            self.writer
                .append(&txn)
                .await
                .with_context(|| format!("Partially written file {}", path.display()))?;
            remaining -= 1;

            if self.writer.written() % self.flush_batch_size == 0 {
                self.writer.flush().await?;
                info!(
                    "task {}/{}, remain: {}, pending: {}",
                    self.task_index + 1,
                    self.total_tasks,
                    remaining,
                    receiver.len()
                );
            }
        }
        self.writer.finish().await
    }
}

#[derive(Clone, Debug)]
pub struct GeneratorSettings {
    pub num_workers: usize,
    pub flush_batch_size: usize,
    /// Seeds the producers' type draws; random when unset.
    pub seed: Option<u64>,
}

/// Runs generation tasks: `num_workers` blocking producers build and sign
/// transactions concurrently, one `TransactionSink` writes them out.
pub struct TransactionGenerator {
    factory: Arc<TransactionFactory>,
    mix: Arc<TransactionMix>,
    settings: GeneratorSettings,
}

impl TransactionGenerator {
    pub fn new(
        factory: Arc<TransactionFactory>,
        mix: TransactionMix,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            factory,
            mix: Arc::new(mix),
            settings,
        }
    }

    /// Runs the tasks one after the other.
    pub async fn run_all(
        &self,
        tasks: &[GenerationTask],
        cancel: &CancellationToken,
    ) -> Result<Vec<GenerationSummary>> {
        let mut summaries = Vec::with_capacity(tasks.len());
        for task in tasks {
            summaries.push(self.run(task, cancel).await?);
        }
        Ok(summaries)
    }

    pub async fn run(
        &self,
        task: &GenerationTask,
        cancel: &CancellationToken,
    ) -> Result<GenerationSummary> {
        let start = Instant::now();
        info!(
            "Start generating task {}/{}: {} transactions into {}",
            task.task_index + 1,
            task.total_tasks,
            task.requested_count,
            task.output.display()
        );

        let writer = TransactionFileWriter::create(&task.output).await?;
        if task.requested_count == 0 {
            writer.finish().await?;
            return Ok(self.summary(task, 0, start));
        }

        let (sender, receiver) = unbounded_channel();
        let consumer = TransactionSink::new(
            writer,
            task.requested_count,
            self.settings.flush_batch_size,
            task.task_index,
            task.total_tasks,
        )
        .spawn(receiver, cancel.clone());

        let num_workers = self.settings.num_workers.max(1);
        let producers: Vec<_> = (0..num_workers)
            .map(|worker| {
                let count = share(task.requested_count, num_workers, worker);
                let rng = match self.settings.seed {
                    Some(seed) => StdRng::seed_from_u64(
                        seed.wrapping_add((task.task_index * num_workers + worker) as u64),
                    ),
                    None => StdRng::from_entropy(),
                };
                let producer = Producer {
                    factory: self.factory.clone(),
                    mix: self.mix.clone(),
                    sender: sender.clone(),
                    cancel: cancel.clone(),
                    rng,
                    count,
                };
                tokio::task::spawn_blocking(move || producer.run())
            })
            .collect();
        // the channel closes once every producer is done
        drop(sender);

        let written = consumer
            .await
            .context("Transaction consumer panicked")?
            .with_context(|| format!("Generation task {} failed", task.task_index + 1))?;
        for producer in producers {
            producer.await.context("Transaction producer panicked")?;
        }

        let summary = self.summary(task, written, start);
        info!(
            "Generation task {}/{} finished: {} transactions in {:?}, output {}",
            task.task_index + 1,
            task.total_tasks,
            written,
            summary.elapsed,
            task.output.display()
        );
        Ok(summary)
    }

    fn summary(&self, task: &GenerationTask, written: usize, start: Instant) -> GenerationSummary {
        GenerationSummary {
            task_index: task.task_index,
            total_tasks: task.total_tasks,
            output: task.output.clone(),
            written,
            elapsed: start.elapsed(),
        }
    }
}

/// The number of units `worker` produces when `total` is spread over
/// `num_workers`.
fn share(total: usize, num_workers: usize, worker: usize) -> usize {
    total / num_workers + usize::from(worker < total % num_workers)
}

struct Producer {
    factory: Arc<TransactionFactory>,
    mix: Arc<TransactionMix>,
    sender: UnboundedSender<SignedTransaction>,
    cancel: CancellationToken,
    rng: StdRng,
    count: usize,
}

impl Producer {
    fn run(mut self) -> usize {
        let mut sent = 0;
        while sent < self.count && !self.cancel.is_cancelled() {
            let txn = self.factory.create(self.mix.sample(&mut self.rng));
            if self.sender.send(txn).is_err() {
                // consumer is gone, its error is reported by the task
                break;
            }
            sent += 1;
        }
        sent
    }
}

/// Writes already-built transactions through a `TransactionSink`, fed by a
/// single sequential producer.
pub async fn write_transactions(
    txns: Vec<SignedTransaction>,
    output: &Path,
    flush_batch_size: usize,
    cancel: &CancellationToken,
) -> Result<usize> {
    let writer = TransactionFileWriter::create(output).await?;
    let expected = txns.len();
    if expected == 0 {
        return writer.finish().await;
    }

    let (sender, receiver) = unbounded_channel();
    let consumer = TransactionSink::new(writer, expected, flush_batch_size, 0, 1)
        .spawn(receiver, cancel.clone());
    let producer = tokio::spawn(async move {
        for txn in txns {
            if sender.send(txn).is_err() {
                break;
            }
        }
    });

    let written = consumer.await.context("Transaction consumer panicked")??;
    producer.await.context("Transaction producer panicked")?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage::TransactionFileReader, transaction_factory::tests::test_factory};
    use claims::{assert_err, assert_ok};
    use std::collections::HashSet;
    use stress_types::transaction::TransactionType;

    fn generator(num_workers: usize) -> TransactionGenerator {
        TransactionGenerator::new(
            Arc::new(test_factory()),
            TransactionMix::new([
                (TransactionType::Transfer, 70),
                (TransactionType::TransferFungibleAsset, 20),
                (TransactionType::TriggerContract, 10),
            ])
            .unwrap(),
            GeneratorSettings {
                num_workers,
                flush_batch_size: 1000,
                seed: Some(7),
            },
        )
    }

    #[test]
    fn test_plan_tasks() {
        let dir = Path::new("/tmp/out");
        let tasks = plan_tasks(25, 10, dir);
        assert_eq!(
            tasks.iter().map(|t| t.requested_count).collect::<Vec<_>>(),
            vec![10, 10, 5]
        );
        assert!(tasks.iter().all(|t| t.total_tasks == 3));
        assert_eq!(tasks[2].output, dir.join("generate-trx2.bin"));

        assert_eq!(plan_tasks(20, 10, dir).len(), 2);
        assert_eq!(plan_tasks(20, 10, dir)[1].requested_count, 10);
        assert_eq!(plan_tasks(7, 100, dir)[0].requested_count, 7);

        let empty = plan_tasks(0, 10, dir);
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].requested_count, 0);
    }

    #[test]
    fn test_share() {
        let shares: Vec<_> = (0..4).map(|worker| share(10, 4, worker)).collect();
        assert_eq!(shares, vec![3, 3, 2, 2]);
        assert_eq!((0..3).map(|worker| share(1, 3, worker)).sum::<usize>(), 1);
    }

    async fn run_count(count: usize) -> Vec<SignedTransaction> {
        let dir = tempfile::tempdir().unwrap();
        let task = GenerationTask {
            requested_count: count,
            output: dir.path().join(generated_file_name(0)),
            task_index: 0,
            total_tasks: 1,
        };
        let summary = assert_ok!(generator(4).run(&task, &CancellationToken::new()).await);
        assert_eq!(summary.written, count);
        TransactionFileReader::read_all(&task.output).await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_exact_record_counts() {
        assert!(run_count(0).await.is_empty());
        assert_eq!(run_count(1).await.len(), 1);

        let txns = run_count(10_000).await;
        assert_eq!(txns.len(), 10_000);
        // no duplicates
        let ids: HashSet<_> = txns.iter().map(|txn| txn.id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_generated_mix_matches_weights() {
        let txns = run_count(10_000).await;
        for (txn_type, percent) in [
            (TransactionType::Transfer, 70.0),
            (TransactionType::TransferFungibleAsset, 20.0),
            (TransactionType::TriggerContract, 10.0),
        ] {
            let count = txns
                .iter()
                .filter(|txn| txn.payload().payload_type() == txn_type)
                .count();
            let observed = count as f64 * 100.0 / txns.len() as f64;
            assert!((observed - percent).abs() <= 5.0, "{}: {}%", txn_type, observed);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_all_writes_one_file_per_task() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = plan_tasks(25, 10, dir.path());
        let summaries = assert_ok!(generator(3).run_all(&tasks, &CancellationToken::new()).await);
        assert_eq!(summaries.len(), 3);
        for (task, summary) in tasks.iter().zip(&summaries) {
            assert_eq!(summary.written, task.requested_count);
            let txns = TransactionFileReader::read_all(&task.output).await.unwrap();
            assert_eq!(txns.len(), task.requested_count);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        let task = GenerationTask {
            requested_count: 1_000,
            output: dir.path().join(generated_file_name(0)),
            task_index: 0,
            total_tasks: 1,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_err!(generator(2).run(&task, &cancel).await);
    }

    #[tokio::test]
    async fn test_write_transactions_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join(REPLAY_FILE_NAME);
        let factory = test_factory();
        let txns: Vec<_> = (0..50)
            .map(|_| factory.create(TransactionType::Transfer))
            .collect();

        let written = assert_ok!(
            write_transactions(txns.clone(), &output, 7, &CancellationToken::new()).await
        );
        assert_eq!(written, 50);
        assert_eq!(TransactionFileReader::read_all(&output).await.unwrap(), txns);

        let empty = dir.path().join("empty.bin");
        assert_eq!(
            write_transactions(vec![], &empty, 7, &CancellationToken::new())
                .await
                .unwrap(),
            0
        );
        assert!(empty.exists());
    }
}
