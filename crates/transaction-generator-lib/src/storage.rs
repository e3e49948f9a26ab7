// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Transaction files: a sequence of frames, each a 4-byte big-endian length
//! followed by one BCS-encoded `SignedTransaction`.

use crate::counters::WRITTEN_RECORDS;
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::path::{Path, PathBuf};
use stress_types::SignedTransaction;
use tokio::fs::File;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .new_codec()
}

pub struct TransactionFileWriter {
    path: PathBuf,
    sink: FramedWrite<File, LengthDelimitedCodec>,
    written: usize,
}

impl TransactionFileWriter {
    /// Creates (or truncates) the file at `path`.
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .with_context(|| format!("Failed to create transaction file {}", path.display()))?;
        Ok(Self {
            path,
            sink: FramedWrite::new(file, codec()),
            written: 0,
        })
    }

    /// Buffers one record. Nothing is guaranteed on disk until `flush`.
    pub async fn append(&mut self, txn: &SignedTransaction) -> Result<()> {
        self.sink
            .feed(Bytes::from(txn.to_bytes()))
            .await
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        self.written += 1;
        WRITTEN_RECORDS.inc();
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        SinkExt::<Bytes>::flush(&mut self.sink)
            .await
            .with_context(|| format!("Failed to flush {}", self.path.display()))
    }

    /// Flushes and closes the file, returning the number of records written.
    pub async fn finish(mut self) -> Result<usize> {
        SinkExt::<Bytes>::close(&mut self.sink)
            .await
            .with_context(|| format!("Failed to close {}", self.path.display()))?;
        Ok(self.written)
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug)]
pub struct TransactionFileReader {
    path: PathBuf,
    stream: FramedRead<File, LengthDelimitedCodec>,
}

impl TransactionFileReader {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .with_context(|| format!("Failed to open transaction file {}", path.display()))?;
        Ok(Self {
            path,
            stream: FramedRead::new(file, codec()),
        })
    }

    /// The next record, or `None` at end of file. A truncated trailing frame
    /// is an error.
    pub async fn next(&mut self) -> Option<Result<SignedTransaction>> {
        let frame = self.stream.next().await?;
        Some(
            frame
                .with_context(|| format!("Failed to read {}", self.path.display()))
                .and_then(|bytes| {
                    SignedTransaction::from_bytes(&bytes).with_context(|| {
                        format!("Corrupt transaction record in {}", self.path.display())
                    })
                }),
        )
    }

    pub async fn read_all<P: AsRef<Path>>(path: P) -> Result<Vec<SignedTransaction>> {
        let mut reader = Self::open(path).await?;
        let mut txns = Vec::new();
        while let Some(txn) = reader.next().await {
            txns.push(txn?);
        }
        Ok(txns)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction_factory::tests::test_factory;
    use claims::assert_err;
    use stress_types::transaction::TransactionType;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_records_come_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("txns.bin");
        let factory = test_factory();
        let txns: Vec<_> = TransactionType::ALL
            .iter()
            .cycle()
            .take(30)
            .map(|txn_type| factory.create(*txn_type))
            .collect();

        let mut writer = TransactionFileWriter::create(&path).await.unwrap();
        for txn in &txns {
            writer.append(txn).await.unwrap();
        }
        assert_eq!(writer.finish().await.unwrap(), 30);

        let read = TransactionFileReader::read_all(&path).await.unwrap();
        assert_eq!(read, txns);
    }

    #[tokio::test]
    async fn test_frame_layout_is_length_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.bin");
        let txn = test_factory().create(TransactionType::Transfer);

        let mut writer = TransactionFileWriter::create(&path).await.unwrap();
        writer.append(&txn).await.unwrap();
        writer.finish().await.unwrap();

        let raw = std::fs::read(&path).unwrap();
        let body = txn.to_bytes();
        assert_eq!(&raw[..4], &(body.len() as u32).to_be_bytes());
        assert_eq!(&raw[4..], body.as_slice());
    }

    #[tokio::test]
    async fn test_empty_and_truncated_files() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.bin");
        TransactionFileWriter::create(&empty)
            .await
            .unwrap()
            .finish()
            .await
            .unwrap();
        assert!(TransactionFileReader::read_all(&empty).await.unwrap().is_empty());

        let truncated = dir.path().join("truncated.bin");
        let mut file = File::create(&truncated).await.unwrap();
        file.write_all(&[0, 0, 0, 10, 1, 2]).await.unwrap();
        file.flush().await.unwrap();
        assert_err!(TransactionFileReader::read_all(&truncated).await);

        assert_err!(TransactionFileReader::open(dir.path().join("missing.bin")).await);
    }
}
