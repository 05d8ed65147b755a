//! Order-k Markov chain over item sequences.
//!
//! States are windows of the `order` most recent items; each known state maps
//! to integer counts of the item that followed it. Labels are interned into a
//! [`LabelIndex`] so states hold compact ids instead of strings.
//!
//! ```
//! use markovrec_core::chain::MarkovChain;
//!
//! let mut chain = MarkovChain::new(1).expect("positive order");
//! chain.add_path(&["A", "B", "C"]).expect("chain accepts paths");
//!
//! let state = chain.state_for(&["A"]).expect("A is known");
//! assert_eq!(chain.get_label(&state).expect("known state"), vec![Some("A")]);
//! ```

mod labels;
mod persist;
mod state;
mod walk;

use std::collections::BTreeMap;

pub use labels::{ItemId, LabelIndex};
pub use state::State;
pub use walk::{RandomWalk, DEFAULT_NUM_STEPS};

use crate::errors::DomainError;

/// Baseline count added per known-state/item pair by [`MarkovChain::add_pseudocount`].
pub const PSEUDOCOUNT: u64 = 1;

pub type TransitionCounts = BTreeMap<ItemId, u64>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkovChain {
    order: usize,
    labels: LabelIndex,
    transitions: BTreeMap<State, TransitionCounts>,
    pseudocount_applied: bool,
    frozen: bool,
}

impl MarkovChain {
    pub fn new(order: usize) -> Result<Self, DomainError> {
        if order == 0 {
            return Err(DomainError::InvalidConfig(
                "markov chain order must be positive".to_string(),
            ));
        }

        Ok(Self {
            order,
            labels: LabelIndex::new(),
            transitions: BTreeMap::new(),
            pseudocount_applied: false,
            frozen: false,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn labels(&self) -> &LabelIndex {
        &self.labels
    }

    /// True once the chain has been loaded from disk; ingestion is closed.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn pseudocount_applied(&self) -> bool {
        self.pseudocount_applied
    }

    /// Ingests one path. Returns `false` without touching the chain when the
    /// path has no full window (`items.len() <= order`).
    ///
    /// Every window `items[i - order..i]` gains one count toward `items[i]`.
    pub fn add_path<S: AsRef<str>>(&mut self, items: &[S]) -> Result<bool, DomainError> {
        if self.frozen {
            return Err(DomainError::InvariantViolation(
                "cannot ingest paths into a chain loaded from disk".to_string(),
            ));
        }
        if items.len() <= self.order {
            return Ok(false);
        }

        let ids: Vec<ItemId> =
            items.iter().map(|item| self.labels.intern(item.as_ref())).collect();
        for end in self.order..ids.len() {
            let window = &ids[end - self.order..end];
            let state = State::new(window.iter().copied().map(Some).collect());
            *self.transitions.entry(state).or_default().entry(ids[end]).or_insert(0) += 1;
        }

        Ok(true)
    }

    /// Adds [`PSEUDOCOUNT`] from every known state to every vocabulary item.
    ///
    /// States without outgoing transitions stay unknown. A second call fails so
    /// smoothing cannot compound within one run.
    pub fn add_pseudocount(&mut self) -> Result<(), DomainError> {
        if self.pseudocount_applied {
            return Err(DomainError::InvariantViolation(
                "pseudocounts were already added to this chain".to_string(),
            ));
        }

        let vocabulary: Vec<ItemId> = self.labels.ids().collect();
        for counts in self.transitions.values_mut() {
            for id in &vocabulary {
                *counts.entry(*id).or_insert(0) += PSEUDOCOUNT;
            }
        }
        self.pseudocount_applied = true;

        Ok(())
    }

    /// Labels of a known state's slots, `None` for padding.
    pub fn get_label(&self, state: &State) -> Result<Vec<Option<&str>>, DomainError> {
        if !self.is_known(state) {
            return Err(DomainError::UnknownState(self.describe(state)));
        }

        Ok(self.slot_labels(state))
    }

    pub fn slot_labels(&self, state: &State) -> Vec<Option<&str>> {
        state.slots().iter().map(|slot| slot.and_then(|id| self.labels.label(id))).collect()
    }

    /// Encodes a right-aligned window of labels. `None` when any label is not
    /// in the vocabulary.
    pub fn state_for<S: AsRef<str>>(&self, window: &[S]) -> Option<State> {
        let ids = window
            .iter()
            .map(|label| self.labels.id(label.as_ref()))
            .collect::<Option<Vec<_>>>()?;
        Some(State::right_aligned(self.order, &ids))
    }

    pub fn is_known(&self, state: &State) -> bool {
        self.transitions.get(state).is_some_and(|counts| !counts.is_empty())
    }

    pub fn transitions_from(&self, state: &State) -> Option<&TransitionCounts> {
        self.transitions.get(state)
    }

    /// States with at least one outgoing transition, in ascending order.
    pub fn known_states(&self) -> impl Iterator<Item = &State> {
        self.transitions.iter().filter(|(_, counts)| !counts.is_empty()).map(|(state, _)| state)
    }

    pub fn state_count(&self) -> usize {
        self.known_states().count()
    }

    pub fn total_count(&self) -> u64 {
        self.transitions.values().flat_map(|counts| counts.values()).sum()
    }

    pub fn describe(&self, state: &State) -> String {
        let slots: Vec<String> = state
            .slots()
            .iter()
            .map(|slot| match slot.and_then(|id| self.labels.label(id)) {
                Some(label) => format!("{label:?}"),
                None => "<pad>".to_string(),
            })
            .collect();
        format!("({})", slots.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use crate::chain::{MarkovChain, State, PSEUDOCOUNT};
    use crate::errors::DomainError;

    fn count(chain: &MarkovChain, from: &[&str], to: &str) -> u64 {
        let state = chain.state_for(from).expect("state labels are known");
        let to = chain.labels().id(to).expect("target label is known");
        chain.transitions_from(&state).and_then(|counts| counts.get(&to)).copied().unwrap_or(0)
    }

    #[test]
    fn zero_order_is_rejected() {
        assert!(matches!(MarkovChain::new(0), Err(DomainError::InvalidConfig(_))));
    }

    #[test]
    fn short_paths_are_dropped_without_growing_labels() {
        let mut chain = MarkovChain::new(2).expect("valid order");

        assert_eq!(chain.add_path(&["A", "B"]), Ok(false));
        assert_eq!(chain.add_path(&["A"]), Ok(false));
        assert!(chain.labels().is_empty());
        assert_eq!(chain.state_count(), 0);
    }

    #[test]
    fn path_of_order_plus_one_adds_exactly_one_count() {
        let mut chain = MarkovChain::new(2).expect("valid order");

        assert_eq!(chain.add_path(&["A", "B", "C"]), Ok(true));

        assert_eq!(chain.total_count(), 1);
        assert_eq!(count(&chain, &["A", "B"], "C"), 1);
    }

    #[test]
    fn every_full_window_is_counted() {
        let mut chain = MarkovChain::new(1).expect("valid order");
        chain.add_path(&["A", "B", "A", "B"]).expect("ingest");
        chain.add_path(&["A", "C"]).expect("ingest");

        assert_eq!(count(&chain, &["A"], "B"), 2);
        assert_eq!(count(&chain, &["B"], "A"), 1);
        assert_eq!(count(&chain, &["A"], "C"), 1);
        assert_eq!(chain.total_count(), 4);
        assert_eq!(chain.state_count(), 2);
    }

    #[test]
    fn final_item_of_a_path_has_no_outgoing_state() {
        let mut chain = MarkovChain::new(1).expect("valid order");
        chain.add_path(&["A", "B"]).expect("ingest");

        let b = chain.state_for(&["B"]).expect("B is in the vocabulary");
        assert!(!chain.is_known(&b));
        assert!(matches!(chain.get_label(&b), Err(DomainError::UnknownState(_))));
    }

    #[test]
    fn pseudocount_reaches_every_vocabulary_item_from_known_states_only() {
        let mut chain = MarkovChain::new(1).expect("valid order");
        chain.add_path(&["A", "B"]).expect("ingest");
        chain.add_path(&["C", "D", "E"]).expect("ingest");

        chain.add_pseudocount().expect("first pseudocount pass");

        assert_eq!(count(&chain, &["A"], "B"), 1 + PSEUDOCOUNT);
        assert_eq!(count(&chain, &["A"], "E"), PSEUDOCOUNT);
        assert_eq!(count(&chain, &["D"], "A"), PSEUDOCOUNT);
        assert_eq!(chain.state_count(), 3);
        let e = chain.state_for(&["E"]).expect("E is in the vocabulary");
        assert!(!chain.is_known(&e));
    }

    #[test]
    fn pseudocount_is_applied_at_most_once() {
        let mut chain = MarkovChain::new(1).expect("valid order");
        chain.add_path(&["A", "B"]).expect("ingest");
        chain.add_pseudocount().expect("first pass");

        assert!(matches!(chain.add_pseudocount(), Err(DomainError::InvariantViolation(_))));
        assert_eq!(count(&chain, &["A"], "B"), 1 + PSEUDOCOUNT);
    }

    #[test]
    fn get_label_returns_padding_as_none() {
        let mut chain = MarkovChain::new(2).expect("valid order");
        chain.add_path(&["A", "B", "C"]).expect("ingest");

        let padded = chain.state_for(&["A"]).expect("A is known");
        assert_eq!(padded.slots()[0], None);
        assert!(chain.get_label(&padded).is_err());

        let full = chain.state_for(&["A", "B"]).expect("labels are known");
        assert_eq!(chain.get_label(&full), Ok(vec![Some("A"), Some("B")]));
    }

    #[test]
    fn describe_renders_padding_slots() {
        let chain = MarkovChain::new(2).expect("valid order");

        assert_eq!(chain.describe(&State::new(vec![None, None])), "(<pad>, <pad>)");
    }
}
