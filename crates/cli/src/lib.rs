pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "leadline",
    about = "Leadline operator CLI",
    long_about = "Operate leadline runtime readiness, migrations, config inspection, and offline conversation simulation.",
    after_help = "Examples:\n  leadline doctor --json\n  leadline config\n  leadline simulate YES 1 2 1 1 no 6"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, SMS gateway readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Drive the follow-up dialogue offline against an in-memory store",
        long_about = "Starts a follow-up for a demo contact and feeds it the given technician replies, printing every SMS that would have been sent. No database or provider is touched."
    )]
    Simulate {
        #[arg(help = "Technician replies, applied in order (e.g. YES 1 2 1 1 no 6)")]
        replies: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Simulate { replies } => commands::simulate::run(&replies),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
