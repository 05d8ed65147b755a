pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::build::BuildArgs;
use crate::commands::evaluate::EvaluateArgs;
use crate::commands::recommend::RecommendArgs;
use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "markovrec",
    about = "Markov chain next-item recommender",
    long_about = "Build an order-k Markov chain from interaction logs, recommend items by random \
                  walk, and evaluate recommendations against held-out purchases.",
    after_help = "Examples:\n  markovrec build -i events.csv -o chain.json.gz -k 2 -t 3600\n  \
                  markovrec recommend -m chain.json.gz -i events.csv -d items.csv -n 10 \
                  -o recs.json --seed 7\n  \
                  markovrec evaluate -i recs.json -p purchases.csv -o evals.tsv\n  markovrec config"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "FILE", help = "Config file (default: markovrec.toml)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Train a Markov chain from an interaction table and save it")]
    Build(BuildArgs),
    #[command(about = "Recommend items for every user with a saved chain")]
    Recommend(RecommendArgs),
    #[command(about = "Score recommendations against held-out purchases")]
    Evaluate(EvaluateArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn execute(cli: Cli) -> CommandResult {
    match cli.command {
        Command::Build(args) => commands::build::run(args, cli.config),
        Command::Recommend(args) => commands::recommend::run(args, cli.config),
        Command::Evaluate(args) => commands::evaluate::run(args, cli.config),
        Command::Config => commands::config::run(cli.config),
    }
}

pub fn run() -> ExitCode {
    let result = execute(Cli::parse());

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
