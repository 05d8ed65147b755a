use rand::seq::SliceRandom;
use rand::Rng;

use crate::chain::{ItemId, MarkovChain, State};

/// Step cap used when callers do not choose one.
pub const DEFAULT_NUM_STEPS: usize = 1_000;

/// Weighted random walk over a chain, yielding the sampled item of each step.
///
/// The walk ends after `num_steps` samples, or earlier when the current state
/// has no outgoing transitions or only zero counts.
pub struct RandomWalk<'a, R: Rng + ?Sized> {
    chain: &'a MarkovChain,
    current: State,
    remaining: usize,
    rng: &'a mut R,
}

impl<R: Rng + ?Sized> Iterator for RandomWalk<'_, R> {
    type Item = ItemId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let outgoing: Vec<(&ItemId, &u64)> =
            self.chain.transitions_from(&self.current)?.iter().collect();
        let (next, _) = outgoing.choose_weighted(&mut *self.rng, |(_, count)| **count).ok()?;
        let next = **next;

        self.current = self.current.advance(next);
        Some(next)
    }
}

impl MarkovChain {
    /// Starts a random walk from `start`; each step picks the next item with
    /// probability proportional to its transition count.
    pub fn random_walk<'a, R: Rng + ?Sized>(
        &'a self,
        start: &State,
        num_steps: usize,
        rng: &'a mut R,
    ) -> RandomWalk<'a, R> {
        RandomWalk { chain: self, current: start.clone(), remaining: num_steps, rng }
    }
}
