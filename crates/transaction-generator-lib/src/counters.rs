// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, register_int_counter, register_int_counter_vec};

/// Transactions built and signed by producers, by type.
pub static GENERATED_TRANSACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "stress_generator_generated_transactions",
        "Number of transactions built and signed, by type",
        &["type"]
    )
    .unwrap()
});

/// Records appended to transaction files.
pub static WRITTEN_RECORDS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "stress_generator_written_records",
        "Number of transaction records written to output files"
    )
    .unwrap()
});

pub static REFERENCE_REFRESHES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "stress_generator_reference_refreshes",
        "Number of successful chain reference refreshes"
    )
    .unwrap()
});

pub static REPLAYED_BLOCKS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "stress_generator_replayed_blocks",
        "Number of historical blocks fetched for replay"
    )
    .unwrap()
});
