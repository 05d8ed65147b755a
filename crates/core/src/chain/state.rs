use serde::{Deserialize, Serialize};

use crate::chain::labels::ItemId;

/// Order-k conditioning context. `None` is the padding slot used when a
/// history is shorter than the chain order; it never equals a real item.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(Vec<Option<ItemId>>);

impl State {
    pub fn new(slots: Vec<Option<ItemId>>) -> Self {
        Self(slots)
    }

    /// A state of exactly `order` slots ending with `ids`, left-padded when short.
    /// Extra leading ids beyond `order` are dropped.
    pub fn right_aligned(order: usize, ids: &[ItemId]) -> Self {
        let kept = &ids[ids.len().saturating_sub(order)..];
        let mut slots = vec![None; order - kept.len()];
        slots.extend(kept.iter().copied().map(Some));
        Self(slots)
    }

    pub fn slots(&self) -> &[Option<ItemId>] {
        &self.0
    }

    pub fn order(&self) -> usize {
        self.0.len()
    }

    /// Drops the oldest slot and appends `next`.
    pub fn advance(&self, next: ItemId) -> Self {
        let mut slots = Vec::with_capacity(self.0.len());
        slots.extend(self.0.iter().skip(1).copied());
        slots.push(Some(next));
        Self(slots)
    }
}
