pub mod chain;
pub mod config;
pub mod domain;
pub mod errors;
pub mod evaluation;
pub mod recommend;
pub mod report;
pub mod session;
pub mod training;

pub use chain::{ItemId, LabelIndex, MarkovChain, State};
pub use domain::{Interaction, Timestamp, UserHistory};
pub use errors::{DomainError, PersistenceError};
pub use evaluation::{CountScore, EvaluationMetric, EvaluationReport, PurchaseSet, UserScore};
pub use recommend::{RecommendOptions, RecommendationSet, Recommender};
pub use report::{InMemoryReporter, NullReporter, ReportEvent, Reporter, RunId};
pub use training::{build_chain, BuildOptions, BuildSummary};
