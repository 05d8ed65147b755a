//! Build phase: segment every user history and ingest the resulting paths.

use std::collections::BTreeMap;

use crate::chain::MarkovChain;
use crate::domain::UserHistory;
use crate::errors::DomainError;
use crate::report::{ReportCategory, ReportEvent, ReportOutcome, Reporter, RunId};
use crate::session::segment;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildOptions {
    pub order: usize,
    pub session_threshold: f64,
}

impl BuildOptions {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.order == 0 {
            return Err(DomainError::InvalidConfig(
                "markov chain order must be positive".to_string(),
            ));
        }
        if self.session_threshold.is_nan() || self.session_threshold <= 0.0 {
            return Err(DomainError::InvalidConfig(format!(
                "session threshold must be positive, got {}",
                self.session_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub users: usize,
    pub interactions: usize,
    pub paths: usize,
    pub ingested_paths: usize,
    pub dropped_paths: usize,
    pub states: usize,
    pub vocabulary: usize,
    pub total_count: u64,
}

impl BuildSummary {
    fn record_chain(&mut self, chain: &MarkovChain) {
        self.states = chain.state_count();
        self.vocabulary = chain.labels().len();
        self.total_count = chain.total_count();
    }
}

/// Trains a fresh chain from per-user histories, visiting users in key order.
pub fn build_chain(
    histories: &BTreeMap<String, UserHistory>,
    options: BuildOptions,
    run_id: &RunId,
    reporter: &dyn Reporter,
) -> Result<(MarkovChain, BuildSummary), DomainError> {
    options.validate()?;
    let mut chain = MarkovChain::new(options.order)?;
    let mut summary = BuildSummary::default();

    reporter.emit(
        ReportEvent::new(
            run_id,
            "chain.build.started",
            ReportCategory::Build,
            ReportOutcome::Started,
        )
        .with_metadata("users", histories.len())
        .with_metadata("order", options.order)
        .with_metadata("session_threshold", options.session_threshold),
    );

    for history in histories.values() {
        summary.users += 1;
        summary.interactions += history.len();
        for session in segment(history, options.session_threshold) {
            summary.paths += 1;
            if chain.add_path(&session.items())? {
                summary.ingested_paths += 1;
            } else {
                summary.dropped_paths += 1;
            }
        }
    }
    summary.record_chain(&chain);

    reporter.emit(
        ReportEvent::new(
            run_id,
            "chain.build.completed",
            ReportCategory::Build,
            ReportOutcome::Completed,
        )
        .with_metadata("users", summary.users)
        .with_metadata("interactions", summary.interactions)
        .with_metadata("paths", summary.paths)
        .with_metadata("ingested_paths", summary.ingested_paths)
        .with_metadata("dropped_paths", summary.dropped_paths)
        .with_metadata("states", summary.states)
        .with_metadata("vocabulary", summary.vocabulary)
        .with_metadata("total_count", summary.total_count),
    );

    Ok((chain, summary))
}
