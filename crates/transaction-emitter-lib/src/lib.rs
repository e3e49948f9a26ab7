// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod args;
pub mod broadcast;
pub mod counters;
pub mod id_capture;
pub mod statistic;
pub mod throttle;
mod wrappers;

// These are the top level things you should need to run the harness.
pub use args::{ConfigArgs, StatisticArgs};
pub use wrappers::{
    BroadcastSummary, GenerateSummary, broadcast_transactions, compute_statistic,
    generate_transactions,
};

// We export these if you want finer grained control.
pub use broadcast::{BroadcastEngine, BroadcastReport, BroadcastTask};
pub use id_capture::{ID_FLUSH_INTERVAL, IdCapture};
pub use statistic::{BlockStatistic, STATISTIC_PAGE_SIZE, StatisticSettings};
pub use throttle::{FixedWindowThrottle, THROTTLE_WINDOW};
pub use wrappers::{
    GENERATE_RESULT_FILE_NAME, REPLAY_ID_FILE_NAME, REPLAY_RESULT_FILE_NAME,
    broadcast_id_file_name, broadcast_transactions_with_clients, compute_statistic_with_client,
    generate_transactions_with_clients,
};
