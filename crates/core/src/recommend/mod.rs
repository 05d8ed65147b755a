//! Inference over a trained chain.
//!
//! Each user's most recent items are resolved to a known state, a weighted
//! random walk from that state proposes distinct items, and uniformly random
//! unseen vocabulary items pad the list when the walk comes up short.
//!
//! All randomness is drawn from the single generator passed by the caller, so
//! a seeded run is reproducible.

mod engine;
pub mod fallback;
pub mod resolver;
pub mod sampler;

pub use engine::{
    RecommendOptions, RecommendationSet, RecommendationSummary, Recommender, UserRecommendation,
};
pub use fallback::fill_random;
pub use resolver::{hamming_distance, resolve_state, CandidateWindow, Resolution};
pub use sampler::sample_walk;
