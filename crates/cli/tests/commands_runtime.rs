use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use clap::error::ErrorKind;
use clap::Parser;
use markovrec_cli::commands::CommandResult;
use markovrec_cli::{execute, Cli};
use serde_json::Value;
use tempfile::TempDir;

const EVENTS: &str = "user,item,time\nu1,A,0\nu1,B,10\nu1,C,50\nu2,A,0\nu2,B,5\nu2,C,7\n";
const ITEMS: &str = "item\tname\nA\talpha\nB\tbeta\nC\tgamma\nD\tdelta\nE\tepsilon\n";

#[test]
fn build_reports_session_split_and_dropped_paths() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let events = write(&dir, "events.csv", "user,item,time\nu1,A,0\nu1,B,10\nu1,C,50\n");
        let chain = dir.path().join("chain.json");

        let result = run_cli(&["build", "-i", s(&events), "-o", s(&chain), "-k", "1", "-t", "30"]);
        assert_eq!(result.exit_code, 0, "expected successful build: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "build");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["details"]["paths"], 2);
        assert_eq!(payload["details"]["ingested_paths"], 1);
        assert_eq!(payload["details"]["dropped_paths"], 1);
        assert_eq!(payload["details"]["states"], 1);
        assert_eq!(payload["details"]["total_count"], 1);
        assert!(chain.exists());
    });
}

#[test]
fn build_recommend_evaluate_pipeline() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let events = write(&dir, "events.csv", EVENTS);
        let items = write(&dir, "items.tsv", ITEMS);
        let purchases = write(&dir, "purchases.csv", "user,item\nu1,B\nu1,D\nu3,A\n");
        let chain = dir.path().join("chain.json.gz");
        let recs = dir.path().join("recs.json");
        let evals = dir.path().join("evals.tsv");

        let built = run_cli(&["build", "-i", s(&events), "-o", s(&chain), "-t", "30", "-q"]);
        assert_eq!(built.exit_code, 0, "build failed: {}", built.output);

        let recommended = run_cli(&[
            "recommend", "-m", s(&chain), "-i", s(&events), "-d", s(&items), "-n", "2", "-o",
            s(&recs), "--seed", "7", "-q",
        ]);
        assert_eq!(recommended.exit_code, 0, "recommend failed: {}", recommended.output);
        let payload = parse_payload(&recommended.output);
        assert_eq!(payload["details"]["users"], 2);
        assert_eq!(payload["details"]["nearest_states"], 2);
        assert_eq!(payload["details"]["seed"], 7);

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&recs).expect("read recs")).expect("json");
        for user in ["u1", "u2"] {
            let list = written[user].as_array().expect("list per user");
            assert_eq!(list.len(), 2);
            assert_ne!(list[0], list[1]);
        }

        let evaluated =
            run_cli(&["evaluate", "-i", s(&recs), "-p", s(&purchases), "-o", s(&evals), "-q"]);
        assert_eq!(evaluated.exit_code, 0, "evaluate failed: {}", evaluated.output);
        let payload = parse_payload(&evaluated.output);
        assert_eq!(payload["details"]["evaluated_users"], 1);
        assert_eq!(payload["details"]["skipped_users"], 1);
        assert_eq!(payload["details"]["optimal_recs_purchased"], 2);

        let table = fs::read_to_string(&evals).expect("read evals");
        assert!(table.starts_with("user\trecs_purchased\toptimal_recs_purchased\nu1\t"));
        assert_eq!(table.lines().count(), 2);
    });
}

#[test]
fn seeded_recommendations_are_reproducible() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let events = write(&dir, "events.csv", EVENTS);
        let items = write(&dir, "items.tsv", ITEMS);
        let chain = dir.path().join("chain.json");
        assert_eq!(run_cli(&["build", "-i", s(&events), "-o", s(&chain), "-q"]).exit_code, 0);

        let mut outputs = Vec::new();
        for name in ["first.json", "second.json"] {
            let recs = dir.path().join(name);
            let result = run_cli(&[
                "recommend", "-m", s(&chain), "-i", s(&events), "-d", s(&items), "-n", "4",
                "-o", s(&recs), "--seed", "2024", "-q",
            ]);
            assert_eq!(result.exit_code, 0, "recommend failed: {}", result.output);
            outputs.push(fs::read_to_string(&recs).expect("read recs"));
        }

        assert_eq!(outputs[0], outputs[1]);
    });
}

#[test]
fn single_layout_writes_one_item_per_user() {
    with_env(&[("MARKOVREC_SEED", "11")], || {
        let dir = TempDir::new().expect("temp dir");
        let events = write(&dir, "events.csv", EVENTS);
        let items = write(&dir, "items.tsv", ITEMS);
        let chain = dir.path().join("chain.json");
        let recs = dir.path().join("recs.json");
        assert_eq!(run_cli(&["build", "-i", s(&events), "-o", s(&chain), "-q"]).exit_code, 0);

        let result = run_cli(&[
            "recommend", "-m", s(&chain), "-i", s(&events), "-d", s(&items), "-n", "3", "-o",
            s(&recs), "--single", "--no-pseudocount", "-q",
        ]);
        assert_eq!(result.exit_code, 0, "recommend failed: {}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["details"]["pseudocount"], false);
        assert_eq!(payload["details"]["seed"], 11);

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&recs).expect("read recs")).expect("json");
        assert!(written["u1"].is_string());
        assert!(written["u2"].is_string());
    });
}

#[test]
fn zero_recommendations_is_a_config_error() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let events = write(&dir, "events.csv", EVENTS);
        let items = write(&dir, "items.tsv", ITEMS);
        let chain = dir.path().join("chain.json");
        let recs = dir.path().join("recs.json");
        assert_eq!(run_cli(&["build", "-i", s(&events), "-o", s(&chain), "-q"]).exit_code, 0);

        let result = run_cli(&[
            "recommend", "-m", s(&chain), "-i", s(&events), "-d", s(&items), "-n", "0", "-o",
            s(&recs),
        ]);

        assert_eq!(result.exit_code, 2);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_config");
        assert!(!recs.exists());
    });
}

#[test]
fn empty_chain_fails_without_writing_output() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let events = write(&dir, "events.csv", "user,item,time\nu1,A,0\nu2,B,0\n");
        let items = write(&dir, "items.tsv", ITEMS);
        let chain = dir.path().join("chain.json");
        let recs = dir.path().join("recs.json");
        assert_eq!(run_cli(&["build", "-i", s(&events), "-o", s(&chain), "-q"]).exit_code, 0);

        let result = run_cli(&[
            "recommend", "-m", s(&chain), "-i", s(&events), "-d", s(&items), "-n", "2", "-o",
            s(&recs), "-q",
        ]);

        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "no_known_states");
        assert!(!recs.exists());
    });
}

#[test]
fn existing_output_is_refused() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let events = write(&dir, "events.csv", EVENTS);
        let chain = write(&dir, "chain.json", "{}");

        let result = run_cli(&["build", "-i", s(&events), "-o", s(&chain)]);

        assert_eq!(result.exit_code, 5);
        assert_eq!(parse_payload(&result.output)["error_class"], "already_exists");
        assert_eq!(fs::read_to_string(&chain).expect("read"), "{}");
    });
}

#[test]
fn input_errors_are_classified() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let chain = dir.path().join("chain.json");
        let cases = [
            (dir.path().join("absent.csv"), None, "not_found"),
            (
                dir.path().join("bad_time.csv"),
                Some("user,item,time\nu1,A,noon\n"),
                "malformed_time",
            ),
            (dir.path().join("no_time.csv"), Some("user,item\nu1,A\n"), "missing_column"),
        ];

        for (path, content, expected_class) in cases {
            if let Some(content) = content {
                fs::write(&path, content).expect("write input");
            }

            let result = run_cli(&["build", "-i", s(&path), "-o", s(&chain)]);

            assert_eq!(result.exit_code, 3, "{expected_class}: {}", result.output);
            assert_eq!(parse_payload(&result.output)["error_class"], expected_class);
            assert!(!chain.exists());
        }
    });
}

#[test]
fn invalid_env_config_fails_validation() {
    with_env(&[("MARKOVREC_MARKOV_ORDER", "0")], || {
        let dir = TempDir::new().expect("temp dir");
        let events = write(&dir, "events.csv", EVENTS);
        let chain = dir.path().join("chain.json");

        let result = run_cli(&["build", "-i", s(&events), "-o", s(&chain)]);

        assert_eq!(result.exit_code, 2);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "build");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn evaluate_count_metric_matches_expected_table() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let recs = write(&dir, "recs.json", r#"{"u1": ["X", "Y", "Z"]}"#);
        let purchases = write(&dir, "purchases.tsv", "user\titem\nu1\tY\nu1\tW\n");
        let evals = dir.path().join("evals.tsv");

        let result =
            run_cli(&["evaluate", "-i", s(&recs), "-p", s(&purchases), "-o", s(&evals), "-q"]);

        assert_eq!(result.exit_code, 0, "evaluate failed: {}", result.output);
        assert_eq!(
            fs::read_to_string(&evals).expect("read evals"),
            "user\trecs_purchased\toptimal_recs_purchased\nu1\t1\t2\n"
        );
        assert_eq!(parse_payload(&result.output)["details"]["hit_ratio"], 0.5);
    });
}

#[test]
fn evaluate_kendall_accepts_mixed_layouts() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let recs = write(&dir, "recs.json", r#"{"u1": ["A", "B", "C"], "u2": "Q"}"#);
        let purchases = write(
            &dir,
            "purchases.csv",
            "user,item,bought_at\nu1,C,3\nu1,A,1\nu1,B,2\nu2,Q,5\n",
        );
        let evals = dir.path().join("evals.tsv");

        let result = run_cli(&[
            "evaluate", "-i", s(&recs), "-p", s(&purchases), "-o", s(&evals), "--metric",
            "kendall", "--column-time", "bought_at", "-q",
        ]);

        assert_eq!(result.exit_code, 0, "evaluate failed: {}", result.output);
        assert_eq!(
            fs::read_to_string(&evals).expect("read evals"),
            "user\tscore\nu1\t1\nu2\tnan\n"
        );
        let payload = parse_payload(&result.output);
        assert_eq!(payload["details"]["defined_scores"], 1);
        assert_eq!(payload["details"]["mean_score"], 1.0);
    });
}

#[test]
fn unknown_metric_is_rejected_by_the_parser() {
    let parsed = Cli::try_parse_from([
        "markovrec", "evaluate", "-i", "recs.json", "-p", "purchases.csv", "-o", "evals.tsv",
        "--metric", "ndcg",
    ]);

    let error = parsed.expect_err("unsupported metric should not parse");
    assert_eq!(error.kind(), ErrorKind::InvalidValue);
    let rendered = error.to_string();
    assert!(rendered.contains("count"), "choices should be listed: {rendered}");
    assert!(rendered.contains("kendall"), "choices should be listed: {rendered}");
}

#[test]
fn config_command_attributes_sources() {
    with_env(&[("MARKOVREC_MARKOV_ORDER", "3")], || {
        let dir = TempDir::new().expect("temp dir");
        let config = write(&dir, "markovrec.toml", "[recommend]\nnum_steps = 50\n");

        let result = run_cli(&["config", "--config", s(&config)]);

        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("- chain.order = 3 (source: env (MARKOVREC_MARKOV_ORDER))"));
        assert!(result.output.contains(&format!(
            "- recommend.num_steps = 50 (source: file ({}))",
            config.display()
        )));
        assert!(result.output.contains("- columns.user = user (source: default)"));
    });
}

fn run_cli(args: &[&str]) -> CommandResult {
    let cli = Cli::try_parse_from(std::iter::once("markovrec").chain(args.iter().copied()))
        .expect("arguments should parse");
    execute(cli)
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

fn s(path: &Path) -> &str {
    path.to_str().expect("temp paths are utf-8")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "MARKOVREC_MARKOV_ORDER",
        "MARKOVREC_SESSION_THRESHOLD",
        "MARKOVREC_NUM_STEPS",
        "MARKOVREC_PSEUDOCOUNT",
        "MARKOVREC_SEED",
        "MARKOVREC_COLUMN_USER",
        "MARKOVREC_COLUMN_ITEM",
        "MARKOVREC_COLUMN_TIME",
        "MARKOVREC_LOGGING_LEVEL",
        "MARKOVREC_LOGGING_FORMAT",
        "MARKOVREC_LOG_LEVEL",
        "MARKOVREC_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
