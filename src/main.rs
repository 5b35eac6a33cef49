use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use scamshield::blocker::{Propagation, Verdict};
use scamshield::config::Config;
use scamshield::directory::SequentialDirectory;
use scamshield::init::{init_extension, init_intelligence, init_main_app, setup_logging};
use scamshield::intel::{CallReport, NumberIntelligence};
use scamshield::number::PhoneNumber;
use scamshield::stats::SyncStats;

#[derive(Parser)]
#[command(name = "scamshield", about = "Manage the shared call block list")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a number to the block list and reload the extension
    Block { number: String },
    /// Remove a number from the block list and reload the extension
    Unblock { number: String },
    /// Print the block list in directory order
    List,
    /// Fetch the risk report for a number
    Lookup { number: String },
    /// Look a number up and block it if it crosses the policy thresholds
    Screen { number: String },
    /// Submit a call report to the remote service
    Report {
        #[arg(long)]
        username: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        date: String,
    },
    /// Run one call-directory extension request and print its entries
    Directory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Config
    let config_exists = cli.config.exists();
    let config = if config_exists {
        Config::load(&cli.config).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    if !config_exists {
        info!("Config file not found, using defaults.");
    }

    // 3. Dispatch
    match cli.command {
        Command::Directory => run_directory(&config).await,
        Command::Report {
            username,
            number,
            reason,
            date,
        } => {
            let client = init_intelligence(&config, SyncStats::new())?;
            let receipt = client
                .report_call(&CallReport {
                    username,
                    number,
                    reason,
                    date,
                })
                .await?;
            println!("{}", receipt.message);
            Ok(())
        }
        Command::Lookup { number } => {
            let client = init_intelligence(&config, SyncStats::new())?;
            let report = client.assess_number(PhoneNumber::parse(&number)?).await?;
            println!(
                "{}: risk {}/100, reported {} time(s)",
                report.phone_number, report.risk_score, report.times_reported
            );
            Ok(())
        }
        command => run_main_app(&config, command).await,
    }
}

/// Acts as the extension process: the shared container is only read.
async fn run_directory(config: &Config) -> Result<()> {
    let provider = init_extension(config);
    let invocation =
        tokio::task::spawn_blocking(move || provider.begin_request(SequentialDirectory::new()))
            .await?;
    info!("Extension request finished: {:?}", invocation.state);
    for number in invocation.output? {
        println!("{}", number.international());
    }
    Ok(())
}

async fn run_main_app(config: &Config, command: Command) -> Result<()> {
    let app = init_main_app(config)?;

    match command {
        Command::Block { number } => {
            let outcome = app.service.block(&number).await?;
            println!("{} {:?}", outcome.number.international(), outcome.change);
            print_propagation(&outcome.propagation);
        }
        Command::Unblock { number } => {
            let outcome = app.service.unblock(&number).await?;
            println!("{} {:?}", outcome.number.international(), outcome.change);
            print_propagation(&outcome.propagation);
        }
        Command::List => {
            for number in app.service.list().await? {
                println!("{}", number.international());
            }
        }
        Command::Screen { number } => {
            let outcome = app.service.screen(&number).await?;
            println!(
                "{}: risk {}/100, reported {} time(s)",
                outcome.report.phone_number,
                outcome.report.risk_score,
                outcome.report.times_reported
            );
            match (outcome.verdict, outcome.block) {
                (Verdict::Block, Some(block)) => {
                    println!("Blocked ({:?})", block.change);
                    print_propagation(&block.propagation);
                }
                (Verdict::Block, None) => bail!("policy chose to block but nothing was stored"),
                (Verdict::Allow, _) => println!("Not blocked"),
            }
        }
        Command::Lookup { .. } | Command::Report { .. } | Command::Directory => {
            bail!("command does not run against the main app")
        }
    }

    app.stats.log_summary();
    Ok(())
}

fn print_propagation(propagation: &Propagation) {
    match propagation {
        Propagation::Applied => println!("Call blocking updated."),
        Propagation::Pending(e) => println!("Saved; will take effect shortly ({}).", e),
    }
}
