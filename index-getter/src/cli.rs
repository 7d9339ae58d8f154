use crate::burst::BurstConfig;
use crate::runner::RunConfig;
use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct CliArguments {
    /// Base URL of the server under test
    #[arg(short = 'H', long, env = "INDEX_GETTER_HOST")]
    pub host: Url,

    /// Print the report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Keep users busy for a fixed time, paced by karga
    Run(RunArgs),
    /// Send a fixed number of requests as fast as possible
    Burst(BurstArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of concurrent users
    #[arg(short, long, default_value_t = 1)]
    pub users: usize,

    /// Seconds to hold the target rate
    #[arg(short = 't', long, default_value_t = 10)]
    pub run_time: u64,

    /// Seconds to ramp up to the target rate, requires --rate
    #[arg(long, default_value_t = 0)]
    pub ramp_up: u64,

    /// Target requests per second, unbounded by default
    #[arg(short, long)]
    pub rate: Option<f64>,
}

impl From<&RunArgs> for RunConfig {
    fn from(args: &RunArgs) -> Self {
        RunConfig::builder()
            .users(args.users)
            .run_time(Duration::from_secs(args.run_time))
            .ramp_up(Duration::from_secs(args.ramp_up))
            .rate(args.rate.unwrap_or(f64::MAX))
            .build()
    }
}

#[derive(Args, Debug, Clone)]
pub struct BurstArgs {
    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 1)]
    pub workers: usize,

    /// Total number of requests
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub requests: usize,
}

impl From<&BurstArgs> for BurstConfig {
    fn from(args: &BurstArgs) -> Self {
        BurstConfig::builder()
            .workers(args.workers)
            .requests(args.requests)
            .build()
    }
}
