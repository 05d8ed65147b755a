use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::chain::{MarkovChain, DEFAULT_NUM_STEPS};
use crate::domain::UserHistory;
use crate::errors::DomainError;
use crate::report::{ReportCategory, ReportEvent, ReportOutcome, Reporter, RunId};

use super::fallback::fill_random;
use super::resolver::{resolve_state, CandidateWindow, Resolution};
use super::sampler::sample_walk;

/// Ordered recommendations keyed by user id.
pub type RecommendationSet = BTreeMap<String, Vec<String>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecommendOptions {
    pub num_recs: usize,
    pub num_steps: usize,
}

impl RecommendOptions {
    pub fn new(num_recs: usize) -> Self {
        Self { num_recs, num_steps: DEFAULT_NUM_STEPS }
    }

    pub fn with_num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.num_recs == 0 {
            return Err(DomainError::InvalidConfig(
                "number of recommendations must be positive".to_string(),
            ));
        }
        if self.num_steps == 0 {
            return Err(DomainError::InvalidConfig(
                "random walk step budget must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecommendation {
    pub items: Vec<String>,
    pub resolution: Resolution,
    /// Items contributed by the random walk; the rest came from the filler.
    pub walked: usize,
    pub filled: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecommendationSummary {
    pub users: usize,
    pub exact_states: usize,
    pub nearest_states: usize,
    pub walked_items: usize,
    pub filled_items: usize,
}

#[derive(Clone, Debug)]
pub struct Recommender<'a> {
    chain: &'a MarkovChain,
    vocabulary: Vec<String>,
    options: RecommendOptions,
}

impl<'a> Recommender<'a> {
    /// `vocabulary` supplies the fallback items and bounds the list length.
    pub fn new<I>(
        chain: &'a MarkovChain,
        vocabulary: I,
        options: RecommendOptions,
    ) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = String>,
    {
        options.validate()?;
        let vocabulary: BTreeSet<String> = vocabulary.into_iter().collect();
        Ok(Self { chain, vocabulary: vocabulary.into_iter().collect(), options })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Effective list length: the requested count bounded by the vocabulary.
    pub fn target_count(&self) -> usize {
        self.options.num_recs.min(self.vocabulary.len())
    }

    pub fn recommend_for<R: Rng + ?Sized>(
        &self,
        history: &UserHistory,
        rng: &mut R,
    ) -> Result<UserRecommendation, DomainError> {
        let recent = history.recent_items(self.chain.order());
        let window = CandidateWindow::new(self.chain.order(), &recent);
        let resolution = resolve_state(self.chain, &window, rng)?;

        let target = self.target_count();
        let mut items =
            sample_walk(self.chain, &resolution.state, target, self.options.num_steps, rng);
        let walked = items.len();
        let filled = fill_random(&mut items, target, &self.vocabulary, rng);

        Ok(UserRecommendation { items, resolution, walked, filled })
    }

    /// Recommends for every user in ascending user-id order.
    pub fn recommend_all<R: Rng + ?Sized>(
        &self,
        histories: &BTreeMap<String, UserHistory>,
        rng: &mut R,
        run_id: &RunId,
        reporter: &dyn Reporter,
    ) -> Result<(RecommendationSet, RecommendationSummary), DomainError> {
        reporter.emit(
            ReportEvent::new(
                run_id,
                "recommend.started",
                ReportCategory::Recommend,
                ReportOutcome::Started,
            )
            .with_metadata("users", histories.len())
            .with_metadata("num_recs", self.options.num_recs)
            .with_metadata("target_count", self.target_count()),
        );

        let mut recommendations = RecommendationSet::new();
        let mut summary = RecommendationSummary::default();
        for (user, history) in histories {
            let recommendation = match self.recommend_for(history, rng) {
                Ok(recommendation) => recommendation,
                Err(error) => {
                    reporter.emit(
                        ReportEvent::new(
                            run_id,
                            "recommend.failed",
                            ReportCategory::Recommend,
                            ReportOutcome::Failed,
                        )
                        .with_metadata("user", user)
                        .with_metadata("error", &error),
                    );
                    return Err(error);
                }
            };

            summary.users += 1;
            if recommendation.resolution.is_exact() {
                summary.exact_states += 1;
            } else {
                summary.nearest_states += 1;
            }
            summary.walked_items += recommendation.walked;
            summary.filled_items += recommendation.filled;
            recommendations.insert(user.clone(), recommendation.items);
        }

        reporter.emit(
            ReportEvent::new(
                run_id,
                "recommend.completed",
                ReportCategory::Recommend,
                ReportOutcome::Completed,
            )
            .with_metadata("users", summary.users)
            .with_metadata("exact_states", summary.exact_states)
            .with_metadata("nearest_states", summary.nearest_states)
            .with_metadata("walked_items", summary.walked_items)
            .with_metadata("filled_items", summary.filled_items),
        );

        Ok((recommendations, summary))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::chain::MarkovChain;
    use crate::domain::{Interaction, Timestamp, UserHistory};
    use crate::errors::DomainError;
    use crate::recommend::{RecommendOptions, Recommender};
    use crate::report::{InMemoryReporter, RunId};

    fn history(items: &[&str]) -> UserHistory {
        UserHistory::from_unsorted(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    Interaction::new(Timestamp::new(index as f64).expect("finite"), *item)
                })
                .collect(),
        )
    }

    fn vocabulary(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| (*item).to_owned()).collect()
    }

    fn trained_chain() -> MarkovChain {
        let mut chain = MarkovChain::new(1).expect("valid order");
        chain.add_path(&["A", "B", "C"]).expect("ingest");
        chain.add_path(&["B", "C", "D"]).expect("ingest");
        chain
    }

    #[test]
    fn zero_recommendations_is_invalid() {
        let chain = trained_chain();

        let result = Recommender::new(&chain, vocabulary(&["A"]), RecommendOptions::new(0));

        assert!(matches!(result, Err(DomainError::InvalidConfig(_))));
    }

    #[test]
    fn zero_step_budget_is_invalid() {
        let chain = trained_chain();
        let options = RecommendOptions::new(2).with_num_steps(0);

        assert!(Recommender::new(&chain, vocabulary(&["A"]), options).is_err());
    }

    #[test]
    fn recommendations_reach_min_of_count_and_vocabulary() {
        let chain = trained_chain();
        let vocabulary = vocabulary(&["A", "B", "C", "D", "E", "F"]);
        let recommender =
            Recommender::new(&chain, vocabulary.clone(), RecommendOptions::new(4)).expect("valid");
        let mut rng = StdRng::seed_from_u64(8);

        let result = recommender.recommend_for(&history(&["A"]), &mut rng).expect("recommend");

        assert_eq!(result.items.len(), 4);
        assert_eq!(result.items[..2], ["B".to_owned(), "C".to_owned()]);
        assert_eq!(result.walked, 3);
        assert_eq!(result.filled, 1);
        let distinct: HashSet<&String> = result.items.iter().collect();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn small_vocabulary_caps_the_list() {
        let chain = trained_chain();
        let recommender =
            Recommender::new(&chain, vocabulary(&["C", "D"]), RecommendOptions::new(5))
                .expect("valid");
        let mut rng = StdRng::seed_from_u64(8);

        let result = recommender.recommend_for(&history(&["B"]), &mut rng).expect("recommend");

        assert_eq!(recommender.target_count(), 2);
        assert_eq!(result.items, vec!["C".to_owned(), "D".to_owned()]);
    }

    #[test]
    fn unknown_final_item_uses_nearest_state_without_error() {
        let chain = trained_chain();
        let recommender =
            Recommender::new(&chain, vocabulary(&["A", "B", "C", "D"]), RecommendOptions::new(2))
                .expect("valid");
        let mut rng = StdRng::seed_from_u64(21);

        let result =
            recommender.recommend_for(&history(&["A", "never-seen"]), &mut rng).expect("recommend");

        assert!(!result.resolution.is_exact());
        assert_eq!(result.items.len(), 2);
    }

    #[test]
    fn empty_chain_is_fatal() {
        let chain = MarkovChain::new(1).expect("valid order");
        let recommender =
            Recommender::new(&chain, vocabulary(&["A"]), RecommendOptions::new(1)).expect("valid");
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(
            recommender.recommend_for(&history(&["A"]), &mut rng),
            Err(DomainError::NoKnownStates)
        );
    }

    #[test]
    fn recommend_all_is_reproducible_and_reports_progress() {
        let mut chain = trained_chain();
        chain.add_pseudocount().expect("smoothing");
        let recommender = Recommender::new(
            &chain,
            vocabulary(&["A", "B", "C", "D", "E"]),
            RecommendOptions::new(3),
        )
        .expect("valid");
        let histories: BTreeMap<String, UserHistory> = [
            ("u1".to_owned(), history(&["A", "B"])),
            ("u2".to_owned(), history(&["D"])),
            ("u3".to_owned(), history(&["Z"])),
        ]
        .into_iter()
        .collect();
        let reporter = InMemoryReporter::default();
        let run_id = RunId("run-1".to_owned());

        let (first, summary) = recommender
            .recommend_all(&histories, &mut StdRng::seed_from_u64(77), &run_id, &reporter)
            .expect("recommend all");
        let (second, _) = recommender
            .recommend_all(&histories, &mut StdRng::seed_from_u64(77), &run_id, &reporter)
            .expect("recommend all");

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert!(first.values().all(|items| items.len() == 3));
        assert_eq!(summary.users, 3);
        assert_eq!(summary.exact_states, 1);
        assert_eq!(summary.nearest_states, 2);
        assert_eq!(
            reporter.event_types(),
            vec![
                "recommend.started".to_owned(),
                "recommend.completed".to_owned(),
                "recommend.started".to_owned(),
                "recommend.completed".to_owned(),
            ]
        );
    }
}
