// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

// All modules should be declared below
mod account_config;
mod broadcast_config;
mod config_sanitizer;
mod error;
mod persistable_config;
mod reference_config;
mod replay_config;
mod statistic_config;
mod stress_config;

// All public usage statements should be declared below
pub use account_config::*;
pub use broadcast_config::*;
pub use config_sanitizer::ConfigSanitizer;
pub use error::*;
pub use persistable_config::*;
pub use reference_config::*;
pub use replay_config::*;
pub use statistic_config::*;
pub use stress_config::*;
