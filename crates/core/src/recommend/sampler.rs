use std::collections::HashSet;

use rand::Rng;

use crate::chain::{MarkovChain, State};

/// Walks from `start` and collects up to `count` distinct items in the order
/// they are first sampled.
pub fn sample_walk<R: Rng + ?Sized>(
    chain: &MarkovChain,
    start: &State,
    count: usize,
    num_steps: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut recommendations = Vec::with_capacity(count);
    let mut walk = chain.random_walk(start, num_steps, rng);

    while recommendations.len() < count {
        let Some(next) = walk.next() else {
            break;
        };
        if !seen.insert(next) {
            continue;
        }
        if let Some(label) = chain.labels().label(next) {
            recommendations.push(label.to_owned());
        }
    }

    recommendations
}
