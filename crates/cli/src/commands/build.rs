use std::path::PathBuf;

use clap::Args;
use markovrec_core::config::ConfigOverrides;
use markovrec_core::report::{ReportCategory, ReportEvent, ReportOutcome, Reporter, RunId};
use markovrec_core::training::build_chain;
use markovrec_data::{ensure_absent, ensure_exists, load_interactions};
use serde_json::json;

use crate::commands::{load_config, reporter, CommandError, CommandResult, CommonArgs, Completed};

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    #[arg(short, long, value_name = "FILE", help = "Interaction table (CSV/TSV, optionally .gz)")]
    pub input: PathBuf,
    #[arg(short, long, value_name = "FILE", help = "Chain file to create (JSON, optionally .gz)")]
    pub output: PathBuf,
    #[arg(short = 'k', long, help = "Markov chain order")]
    pub order: Option<usize>,
    #[arg(
        short = 't',
        long = "session-threshold",
        help = "Largest time gap kept inside one session (`inf` never splits)"
    )]
    pub session_threshold: Option<f64>,
    #[arg(long = "column-time", value_name = "NAME", help = "Header of the time column")]
    pub column_time: Option<String>,
    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn run(args: BuildArgs, config_path: Option<PathBuf>) -> CommandResult {
    CommandResult::from_outcome("build", execute(args, config_path))
}

fn execute(args: BuildArgs, config_path: Option<PathBuf>) -> Result<Completed, CommandError> {
    let config = load_config(
        config_path,
        ConfigOverrides {
            order: args.order,
            session_threshold: args.session_threshold,
            column_user: args.common.column_user.clone(),
            column_item: args.common.column_item.clone(),
            column_time: args.column_time.clone(),
            ..ConfigOverrides::default()
        },
    )?;
    let options = config.build_options();
    options.validate()?;
    ensure_exists(&args.input)?;
    ensure_absent(&args.output)?;

    let reporter = reporter(args.common.quiet);
    let run_id = RunId::generate();

    let histories = load_interactions(&args.input, &config.columns)?;
    reporter.emit(
        ReportEvent::new(
            &run_id,
            "load.interactions",
            ReportCategory::Load,
            ReportOutcome::Completed,
        )
        .with_metadata("path", args.input.display())
        .with_metadata("users", histories.len()),
    );

    let (chain, summary) = build_chain(&histories, options, &run_id, reporter.as_ref())?;

    chain.dump(&args.output).map_err(CommandError::output)?;
    reporter.emit(
        ReportEvent::new(
            &run_id,
            "chain.persisted",
            ReportCategory::Persist,
            ReportOutcome::Completed,
        )
        .with_metadata("path", args.output.display()),
    );

    Ok(Completed::new(
        format!(
            "built order-{} chain with {} states from {} users",
            options.order, summary.states, summary.users
        ),
        json!({
            "run_id": run_id.0,
            "output": args.output.display().to_string(),
            "order": options.order,
            "session_threshold": options.session_threshold.to_string(),
            "users": summary.users,
            "interactions": summary.interactions,
            "paths": summary.paths,
            "ingested_paths": summary.ingested_paths,
            "dropped_paths": summary.dropped_paths,
            "states": summary.states,
            "vocabulary": summary.vocabulary,
            "total_count": summary.total_count,
        }),
    ))
}
