// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Logging for the stress harness: a one-shot global subscriber plus a
//! `sample!` macro for rate-limiting hot-path log lines.

#![forbid(unsafe_code)]

mod logger;
pub mod sample;

pub use logger::{Level, StressLogger, StressLoggerBuilder};
pub use sample::{SampleRate, Sampling};

/// Re-export of the tracing macros, so callers only depend on this crate.
pub mod prelude {
    pub use crate::{
        sample,
        sample::{SampleRate, Sampling},
    };
    pub use tracing::{debug, error, info, trace, warn};
}

