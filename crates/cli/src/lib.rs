pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "vidsage",
    about = "Vidsage operator CLI",
    long_about = "Inspect configuration, check warehouse readiness, seed the demo catalog and ask the chat pipeline a question.",
    after_help = "Examples:\n  vidsage doctor --json\n  vidsage config\n  vidsage seed\n  vidsage ask \"videos about sleep\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, completion client readiness and warehouse connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Create and fill the demo catalog tables in the configured SQLite warehouse")]
    Seed,
    #[command(about = "Run one question through the chat pipeline and print the reply as JSON")]
    Ask {
        #[arg(required = true, help = "Question to ask, as a single user message")]
        text: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Seed => commands::seed::run(),
        Command::Ask { text } => commands::ask::run(&text.join(" ")),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
