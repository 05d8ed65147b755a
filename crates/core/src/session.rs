//! Session segmentation.
//!
//! A user's history is cut into paths wherever the gap between consecutive
//! interactions exceeds the session threshold. Paths are disjoint and cover
//! the whole history.

use crate::domain::{Interaction, UserHistory};

/// Threshold meaning "never split".
pub const NO_SESSION_SPLIT: f64 = f64::INFINITY;

/// A maximal run of interactions with no internal gap above the threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session<'a> {
    interactions: &'a [Interaction],
}

impl<'a> Session<'a> {
    pub fn interactions(&self) -> &'a [Interaction] {
        self.interactions
    }

    pub fn items(&self) -> Vec<&'a str> {
        self.interactions.iter().map(|interaction| interaction.item.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

/// Splits `history` into sessions. A gap exactly equal to `threshold` does not split.
pub fn segment(history: &UserHistory, threshold: f64) -> Vec<Session<'_>> {
    let interactions = history.interactions();
    if interactions.is_empty() {
        return Vec::new();
    }

    let mut sessions = Vec::new();
    let mut start = 0;
    for index in 1..interactions.len() {
        let gap = interactions[index].timestamp.gap_since(interactions[index - 1].timestamp);
        if gap > threshold {
            sessions.push(Session { interactions: &interactions[start..index] });
            start = index;
        }
    }
    sessions.push(Session { interactions: &interactions[start..] });

    sessions
}
