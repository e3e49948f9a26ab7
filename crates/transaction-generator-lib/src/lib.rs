// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod chain_reference;
pub mod counters;
pub mod generation;
pub mod replay;
pub mod storage;
pub mod transaction_factory;
pub mod transaction_mix;

pub use chain_reference::{ChainReference, ReferenceBlock, ReferenceUpdater};
pub use generation::{
    GenerationSummary, GenerationTask, GeneratorSettings, REPLAY_FILE_NAME, TransactionGenerator,
    TransactionSink, generated_file_name, plan_tasks, write_transactions,
};
pub use replay::{REPLAY_PAGE_SIZE, ReplayExtractor};
pub use storage::{TransactionFileReader, TransactionFileWriter};
pub use transaction_factory::{ContractParams, TransactionFactory, transfer_call_data};
pub use transaction_mix::{MixError, TransactionMix};
