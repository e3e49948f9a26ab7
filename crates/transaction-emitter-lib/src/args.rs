// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
pub struct ConfigArgs {
    /// Path to the YAML stress test configuration
    #[clap(short, long, default_value = "stress.yaml")]
    pub config: PathBuf,
}

#[derive(Clone, Debug, Parser)]
pub struct StatisticArgs {
    #[clap(flatten)]
    pub config_args: ConfigArgs,

    /// First block of the measured range
    #[clap(short, long)]
    pub start_block: u64,

    /// Last block of the measured range
    #[clap(short, long)]
    pub end_block: u64,

    /// Where to write the report
    #[clap(short, long, default_value = "tps-statistic-result")]
    pub output: PathBuf,
}
