use std::path::PathBuf;

use clap::Args;
use markovrec_core::chain::MarkovChain;
use markovrec_core::config::ConfigOverrides;
use markovrec_core::recommend::{RecommendOptions, Recommender};
use markovrec_core::report::{ReportCategory, ReportEvent, ReportOutcome, Reporter, RunId};
use markovrec_data::{
    ensure_absent, ensure_exists, load_interactions, load_item_vocabulary, write_recommendations,
    RecommendationLayout,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use crate::commands::{load_config, reporter, CommandError, CommandResult, CommonArgs, Completed};

#[derive(Debug, Clone, Args)]
pub struct RecommendArgs {
    #[arg(
        short = 'm',
        long = "markov",
        value_name = "FILE",
        help = "Chain file written by `build`"
    )]
    pub chain: PathBuf,
    #[arg(short, long, value_name = "FILE", help = "Interaction table (CSV/TSV, optionally .gz)")]
    pub input: PathBuf,
    #[arg(
        short = 'd',
        long = "item-details",
        value_name = "FILE",
        help = "Item table supplying the fallback vocabulary"
    )]
    pub item_details: PathBuf,
    #[arg(short = 'n', long = "num-recs", help = "Recommendations per user")]
    pub num_recs: usize,
    #[arg(short, long, value_name = "FILE", help = "Recommendations file to create (JSON)")]
    pub output: PathBuf,
    #[arg(long = "no-pseudocount", help = "Sample from raw transition counts")]
    pub no_pseudocount: bool,
    #[arg(long, help = "Seed for reproducible recommendations")]
    pub seed: Option<u64>,
    #[arg(long = "num-steps", help = "Random walk step budget per user")]
    pub num_steps: Option<usize>,
    #[arg(long, help = "Write only the top item per user (or null)")]
    pub single: bool,
    #[arg(long = "column-time", value_name = "NAME", help = "Header of the time column")]
    pub column_time: Option<String>,
    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn run(args: RecommendArgs, config_path: Option<PathBuf>) -> CommandResult {
    CommandResult::from_outcome("recommend", execute(args, config_path))
}

fn execute(args: RecommendArgs, config_path: Option<PathBuf>) -> Result<Completed, CommandError> {
    let config = load_config(
        config_path,
        ConfigOverrides {
            num_steps: args.num_steps,
            pseudocount: args.no_pseudocount.then_some(false),
            seed: args.seed,
            column_user: args.common.column_user.clone(),
            column_item: args.common.column_item.clone(),
            column_time: args.column_time.clone(),
            ..ConfigOverrides::default()
        },
    )?;
    let options = RecommendOptions::new(args.num_recs).with_num_steps(config.recommend.num_steps);
    options.validate()?;
    for input in [&args.chain, &args.input, &args.item_details] {
        ensure_exists(input)?;
    }
    ensure_absent(&args.output)?;

    let reporter = reporter(args.common.quiet);
    let run_id = RunId::generate();

    let mut chain = MarkovChain::load(&args.chain)?;
    reporter.emit(
        ReportEvent::new(&run_id, "chain.loaded", ReportCategory::Load, ReportOutcome::Completed)
            .with_metadata("path", args.chain.display())
            .with_metadata("order", chain.order())
            .with_metadata("states", chain.state_count()),
    );
    if config.recommend.pseudocount {
        chain.add_pseudocount()?;
    }

    let histories = load_interactions(&args.input, &config.columns)?;
    let vocabulary = load_item_vocabulary(&args.item_details, &config.columns.item)?;
    reporter.emit(
        ReportEvent::new(&run_id, "load.inputs", ReportCategory::Load, ReportOutcome::Completed)
            .with_metadata("users", histories.len())
            .with_metadata("vocabulary", vocabulary.len()),
    );

    let mut rng = match config.recommend.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let recommender = Recommender::new(&chain, vocabulary, options)?;
    let (recommendations, summary) =
        recommender.recommend_all(&histories, &mut rng, &run_id, reporter.as_ref())?;

    let layout =
        if args.single { RecommendationLayout::Single } else { RecommendationLayout::List };
    write_recommendations(&args.output, &recommendations, layout).map_err(CommandError::output)?;
    reporter.emit(
        ReportEvent::new(
            &run_id,
            "recommend.persisted",
            ReportCategory::Persist,
            ReportOutcome::Completed,
        )
        .with_metadata("path", args.output.display()),
    );

    Ok(Completed::new(
        format!("wrote recommendations for {} users", summary.users),
        json!({
            "run_id": run_id.0,
            "output": args.output.display().to_string(),
            "users": summary.users,
            "num_recs": args.num_recs,
            "effective_num_recs": recommender.target_count(),
            "pseudocount": config.recommend.pseudocount,
            "seed": config.recommend.seed,
            "exact_states": summary.exact_states,
            "nearest_states": summary.nearest_states,
            "walked_items": summary.walked_items,
            "filled_items": summary.filled_items,
        }),
    ))
}
