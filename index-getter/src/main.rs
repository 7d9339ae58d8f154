use clap::Parser;
use index_getter::cli::{CliArguments, Command};
use index_getter::{burst, runner, HttpSession, IndexGetterUser};
use serde::Serialize;
use std::fmt::Debug;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn print_report<R: Serialize + Debug>(report: &R, json: bool) -> index_getter::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report:#?}");
    }
    Ok(())
}

async fn execute(args: CliArguments) -> index_getter::Result<()> {
    let session = HttpSession::new(args.host.as_str())?;
    match &args.command {
        Command::Run(opts) => {
            let report = runner::run::<IndexGetterUser>(session, &opts.into()).await?;
            print_report(&report, args.json)
        }
        Command::Burst(opts) => {
            let report = burst::run::<IndexGetterUser>(session, &opts.into()).await?;
            print_report(&report, args.json)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArguments::parse();

    match execute(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
