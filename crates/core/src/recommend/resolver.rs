//! Nearest-state resolution for histories the chain has never seen.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::chain::{MarkovChain, State};
use crate::errors::DomainError;

/// The `order` most recent items of a user, right-aligned and left-padded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateWindow<'a> {
    slots: Vec<Option<&'a str>>,
}

impl<'a> CandidateWindow<'a> {
    pub fn new(order: usize, recent: &[&'a str]) -> Self {
        let kept = &recent[recent.len().saturating_sub(order)..];
        let mut slots = vec![None; order - kept.len()];
        slots.extend(kept.iter().copied().map(Some));
        Self { slots }
    }

    pub fn slots(&self) -> &[Option<&'a str>] {
        &self.slots
    }

    fn items(&self) -> Vec<&'a str> {
        self.slots.iter().flatten().copied().collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub state: State,
    pub distance: usize,
    /// Number of known states sharing the minimum distance.
    pub ties: usize,
}

impl Resolution {
    pub fn is_exact(&self) -> bool {
        self.distance == 0
    }
}

/// Position-wise mismatch count. Padding compares equal only to padding.
pub fn hamming_distance(
    chain: &MarkovChain,
    state: &State,
    window: &CandidateWindow<'_>,
) -> usize {
    chain
        .slot_labels(state)
        .iter()
        .zip(window.slots())
        .filter(|(known, candidate)| known != candidate)
        .count()
}

/// Maps `window` to a known state: the window itself when it has outgoing
/// transitions, otherwise a uniformly random pick among the known states at
/// minimum Hamming distance.
pub fn resolve_state<R: Rng + ?Sized>(
    chain: &MarkovChain,
    window: &CandidateWindow<'_>,
    rng: &mut R,
) -> Result<Resolution, DomainError> {
    if window.slots().len() != chain.order() {
        return Err(DomainError::InvalidConfig(format!(
            "candidate window has {} slots but chain order is {}",
            window.slots().len(),
            chain.order()
        )));
    }

    let items = window.items();
    if let Some(state) = chain.state_for(&items) {
        if chain.is_known(&state) {
            return Ok(Resolution { state, distance: 0, ties: 1 });
        }
    }

    let mut best_distance = usize::MAX;
    let mut nearest: Vec<&State> = Vec::new();
    for state in chain.known_states() {
        let distance = hamming_distance(chain, state, window);
        if distance < best_distance {
            best_distance = distance;
            nearest.clear();
        }
        if distance == best_distance {
            nearest.push(state);
        }
    }

    let state = nearest.choose(rng).copied().ok_or(DomainError::NoKnownStates)?;
    Ok(Resolution { state: state.clone(), distance: best_distance, ties: nearest.len() })
}
