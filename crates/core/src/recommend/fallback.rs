use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

/// Pads `recommendations` with distinct random vocabulary items until it holds
/// `min(count, vocabulary.len())` entries. Returns how many items were added.
///
/// `vocabulary` must be free of duplicates; its order only matters for
/// reproducibility under a fixed seed.
pub fn fill_random<R: Rng + ?Sized>(
    recommendations: &mut Vec<String>,
    count: usize,
    vocabulary: &[String],
    rng: &mut R,
) -> usize {
    let target = count.min(vocabulary.len());
    if recommendations.len() >= target {
        return 0;
    }

    let chosen: HashSet<&str> = recommendations.iter().map(String::as_str).collect();
    let mut candidates: Vec<&String> =
        vocabulary.iter().filter(|item| !chosen.contains(item.as_str())).collect();
    let needed = target - recommendations.len();
    let (picked, _) = candidates.partial_shuffle(rng, needed);
    let added = picked.len();
    let picked: Vec<String> = picked.iter().map(|item| (*item).clone()).collect();
    recommendations.extend(picked);

    added
}
