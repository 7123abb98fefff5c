pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

#[derive(Debug, Parser)]
#[command(
    name = "caseworth",
    about = "Caseworth case valuation CLI",
    long_about = "Value personal-injury cases, inspect settlement ranges, and operate the Caseworth database and configuration.",
    after_help = "Examples:\n  caseworth value --input claim.json --trace\n  caseworth assess --case CASE-1 --sync-medical\n  caseworth range --low 30000 --likely 60000 --high 90000 --policy-limit 50000\n  caseworth doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Value a standalone input file (.json or .toml, `-` for stdin)")]
    Value {
        #[arg(long, help = "Path to the valuation input")]
        input: PathBuf,
        #[arg(long, help = "Skip the remote valuation service even when enabled")]
        local: bool,
        #[arg(long, help = "Include the step-by-step local calculation")]
        trace: bool,
    },
    #[command(about = "Value a stored case: reconcile its figures, calculate, and save the analysis")]
    Assess {
        #[arg(long = "case", help = "Identifier of the case to value")]
        case_id: String,
        #[arg(long, help = "Recompute the past-medical element from medical records first")]
        sync_medical: bool,
        #[arg(long, help = "Skip the remote valuation service even when enabled")]
        local: bool,
    },
    #[command(about = "Order a three-point settlement estimate and compute bar segments")]
    Range {
        #[arg(long)]
        low: Decimal,
        #[arg(long)]
        likely: Decimal,
        #[arg(long)]
        high: Decimal,
        #[arg(long, help = "Policy limit to mark on the settlement bar")]
        policy_limit: Option<Decimal>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, valuation service settings, and database schema")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    let result = match cli.command {
        Command::Value { input, local, trace } => commands::value::run(&input, local, trace),
        Command::Assess { case_id, sync_medical, local } => {
            commands::assess::run(&case_id, sync_medical, local)
        }
        Command::Range { low, likely, high, policy_limit } => {
            commands::range::run(low, likely, high, policy_limit)
        }
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
