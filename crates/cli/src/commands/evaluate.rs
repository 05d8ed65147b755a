use std::path::PathBuf;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::Args;
use markovrec_core::config::ConfigOverrides;
use markovrec_core::evaluation::{evaluate, EvaluationMetric};
use markovrec_core::report::{ReportCategory, ReportEvent, ReportOutcome, Reporter, RunId};
use markovrec_data::{
    ensure_absent, ensure_exists, load_purchases, read_recommendations, write_evaluations,
};
use serde_json::json;

use crate::commands::{load_config, reporter, CommandError, CommandResult, CommonArgs, Completed};

#[derive(Debug, Clone, Args)]
pub struct EvaluateArgs {
    #[arg(short, long, value_name = "FILE", help = "Recommendations written by `recommend`")]
    pub input: PathBuf,
    #[arg(short, long, value_name = "FILE", help = "Held-out purchase table (CSV/TSV)")]
    pub purchases: PathBuf,
    #[arg(short, long, value_name = "FILE", help = "Evaluation table to create (TSV)")]
    pub output: PathBuf,
    #[arg(long, default_value = "count", value_parser = metric_parser(), help = "Scoring metric")]
    pub metric: EvaluationMetric,
    #[arg(
        long = "column-time",
        value_name = "NAME",
        help = "Purchase time column ordering the reference ranking (file order otherwise)"
    )]
    pub column_time: Option<String>,
    #[command(flatten)]
    pub common: CommonArgs,
}

fn metric_parser() -> impl TypedValueParser<Value = EvaluationMetric> {
    PossibleValuesParser::new(["count", "kendall"])
        .try_map(|value| value.parse::<EvaluationMetric>())
}

pub fn run(args: EvaluateArgs, config_path: Option<PathBuf>) -> CommandResult {
    CommandResult::from_outcome("evaluate", execute(args, config_path))
}

fn execute(args: EvaluateArgs, config_path: Option<PathBuf>) -> Result<Completed, CommandError> {
    let config = load_config(
        config_path,
        ConfigOverrides {
            column_user: args.common.column_user.clone(),
            column_item: args.common.column_item.clone(),
            ..ConfigOverrides::default()
        },
    )?;
    let metric = args.metric;
    ensure_exists(&args.input)?;
    ensure_exists(&args.purchases)?;
    ensure_absent(&args.output)?;

    let reporter = reporter(args.common.quiet);
    let run_id = RunId::generate();

    let recommendations = read_recommendations(&args.input)?;
    let time_column = match metric {
        EvaluationMetric::Kendall => args.column_time.as_deref(),
        EvaluationMetric::Count => None,
    };
    let purchases = load_purchases(
        &args.purchases,
        &config.columns.user,
        &config.columns.item,
        time_column,
    )?;
    reporter.emit(
        ReportEvent::new(&run_id, "load.inputs", ReportCategory::Load, ReportOutcome::Completed)
            .with_metadata("recommended_users", recommendations.len())
            .with_metadata("purchasing_users", purchases.len()),
    );

    let report = evaluate(&recommendations, &purchases, metric, &run_id, reporter.as_ref());
    write_evaluations(&args.output, &report).map_err(CommandError::output)?;

    let summary = &report.summary;
    let details = match metric {
        EvaluationMetric::Count => json!({
            "run_id": run_id.0,
            "output": args.output.display().to_string(),
            "metric": metric.as_str(),
            "evaluated_users": summary.evaluated_users,
            "skipped_users": summary.skipped_users,
            "recs_purchased": summary.recs_purchased,
            "optimal_recs_purchased": summary.optimal_recs_purchased,
            "hit_ratio": summary.hit_ratio(),
        }),
        EvaluationMetric::Kendall => json!({
            "run_id": run_id.0,
            "output": args.output.display().to_string(),
            "metric": metric.as_str(),
            "evaluated_users": summary.evaluated_users,
            "skipped_users": summary.skipped_users,
            "defined_scores": summary.defined_scores,
            "mean_score": summary.mean_score,
        }),
    };

    Ok(Completed::new(
        format!(
            "evaluated {} users ({} skipped without purchases)",
            summary.evaluated_users, summary.skipped_users
        ),
        details,
    ))
}
