// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use prometheus::{IntCounter, register_int_counter};

/// Transactions accepted by a node.
pub static SUBMITTED_TRANSACTIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "stress_emitter_submitted_transactions",
        "Number of transactions accepted by a node"
    )
    .unwrap()
});

/// Submissions that returned an error, including node-side rejections.
pub static FAILED_SUBMISSIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "stress_emitter_failed_submissions",
        "Number of transaction submissions that failed"
    )
    .unwrap()
});

pub static THROTTLE_SLEEPS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "stress_emitter_throttle_sleeps",
        "Number of times the broadcast waited for the next one-second window"
    )
    .unwrap()
});

pub static CAPTURED_IDS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "stress_emitter_captured_ids",
        "Number of transaction ids written to id files"
    )
    .unwrap()
});
