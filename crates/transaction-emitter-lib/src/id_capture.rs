// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::counters::CAPTURED_IDS;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use stress_logger::prelude::*;
use stress_types::HashValue;
use tokio::{
    fs::File,
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};

/// Lines written between two flushes of an id file.
pub const ID_FLUSH_INTERVAL: usize = 10_000;

/// Writes the ids of broadcast transactions to a file, one lowercase hex id
/// per line, from a dedicated task fed over an unbounded channel.
pub struct IdCapture {
    sender: UnboundedSender<HashValue>,
    handle: JoinHandle<Result<usize>>,
}

impl IdCapture {
    pub async fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .await
            .with_context(|| format!("Failed to create id file {}", path.display()))?;
        let (sender, receiver) = unbounded_channel();
        let handle = tokio::spawn(write_ids(
            BufWriter::new(file),
            receiver,
            path.to_path_buf(),
        ));
        Ok(Self { sender, handle })
    }

    pub fn record(&self, id: HashValue) {
        // a closed channel means the writer failed; `finish` reports why
        let _ = self.sender.send(id);
    }

    /// Closes the channel, waits until every queued id is on disk and returns
    /// the number of lines written.
    pub async fn finish(self) -> Result<usize> {
        drop(self.sender);
        self.handle.await.context("Transaction id writer panicked")?
    }
}

async fn write_ids(
    mut writer: BufWriter<File>,
    mut receiver: UnboundedReceiver<HashValue>,
    path: PathBuf,
) -> Result<usize> {
    let mut written = 0;
    while let Some(id) = receiver.recv().await {
        writer
            .write_all(format!("{}\n", id).as_bytes())
            .await
            .with_context(|| format!("Failed to write to {}", path.display()))?;
        written += 1;
        CAPTURED_IDS.inc();
        if written % ID_FLUSH_INTERVAL == 0 {
            writer
                .flush()
                .await
                .with_context(|| format!("Failed to flush {}", path.display()))?;
            info!(
                "Captured {} transaction ids into {}, pending {}",
                written,
                path.display(),
                receiver.len()
            );
        }
    }
    writer
        .flush()
        .await
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(written)
}
