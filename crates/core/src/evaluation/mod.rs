//! Offline scoring of recommendations against held-out purchases.
//!
//! Two metrics are supported and selected per run: the purchase count
//! metric and Kendall's tau-b between the recommended order and the
//! purchase order. Users without purchases are skipped.

mod kendall;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::report::{ReportCategory, ReportEvent, ReportOutcome, Reporter, RunId};

pub use kendall::kendall_tau_b;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMetric {
    #[default]
    Count,
    Kendall,
}

impl EvaluationMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Kendall => "kendall",
        }
    }
}

impl fmt::Display for EvaluationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationMetric {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "kendall" | "kendall_tau" | "tau" => Ok(Self::Kendall),
            other => Err(DomainError::InvalidConfig(format!(
                "unsupported evaluation metric `{other}` (expected count|kendall)"
            ))),
        }
    }
}

/// One user's held-out purchases: a set for membership and, for rank
/// metrics, the first-occurrence order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurchaseSet {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl PurchaseSet {
    pub fn from_sequence<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for item in items {
            set.insert(item.into());
        }
        set
    }

    /// Appends `item` unless it was already purchased.
    pub fn insert(&mut self, item: String) -> bool {
        if self.members.contains(&item) {
            return false;
        }
        self.members.insert(item.clone());
        self.ordered.push(item);
        true
    }

    pub fn contains(&self, item: &str) -> bool {
        self.members.contains(item)
    }

    pub fn items(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// 1-based position in purchase order; absent items share `len + 1`.
    pub fn reference_rank(&self, item: &str) -> usize {
        self.ordered
            .iter()
            .position(|candidate| candidate == item)
            .map_or(self.ordered.len() + 1, |index| index + 1)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountScore {
    pub recs_purchased: usize,
    pub optimal_recs_purchased: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UserScore {
    Count(CountScore),
    Kendall(Option<f64>),
}

pub fn count_score(recommendations: &[String], purchases: &PurchaseSet) -> CountScore {
    CountScore {
        recs_purchased: recommendations.iter().filter(|item| purchases.contains(item)).count(),
        optimal_recs_purchased: purchases.len().min(recommendations.len()),
    }
}

pub fn kendall_score(recommendations: &[String], purchases: &PurchaseSet) -> Option<f64> {
    let recommended: Vec<f64> = (1..=recommendations.len()).map(|rank| rank as f64).collect();
    let reference: Vec<f64> =
        recommendations.iter().map(|item| purchases.reference_rank(item) as f64).collect();
    kendall_tau_b(&recommended, &reference)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationSummary {
    pub evaluated_users: usize,
    pub skipped_users: usize,
    pub recs_purchased: usize,
    pub optimal_recs_purchased: usize,
    pub defined_scores: usize,
    pub mean_score: Option<f64>,
}

impl EvaluationSummary {
    /// Purchased recommendations over the best achievable count.
    pub fn hit_ratio(&self) -> Option<f64> {
        (self.optimal_recs_purchased > 0)
            .then(|| self.recs_purchased as f64 / self.optimal_recs_purchased as f64)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    pub metric: EvaluationMetric,
    pub scores: BTreeMap<String, UserScore>,
    pub summary: EvaluationSummary,
}

pub fn evaluate(
    recommendations: &BTreeMap<String, Vec<String>>,
    purchases: &BTreeMap<String, PurchaseSet>,
    metric: EvaluationMetric,
    run_id: &RunId,
    reporter: &dyn Reporter,
) -> EvaluationReport {
    reporter.emit(
        ReportEvent::new(
            run_id,
            "evaluate.started",
            ReportCategory::Evaluate,
            ReportOutcome::Started,
        )
        .with_metadata("metric", metric)
        .with_metadata("users", recommendations.len()),
    );

    let mut scores = BTreeMap::new();
    let mut summary = EvaluationSummary::default();
    let mut score_total = 0.0;
    for (user, recs) in recommendations {
        let Some(user_purchases) = purchases.get(user) else {
            summary.skipped_users += 1;
            continue;
        };

        summary.evaluated_users += 1;
        let score = match metric {
            EvaluationMetric::Count => {
                let score = count_score(recs, user_purchases);
                summary.recs_purchased += score.recs_purchased;
                summary.optimal_recs_purchased += score.optimal_recs_purchased;
                UserScore::Count(score)
            }
            EvaluationMetric::Kendall => {
                let tau = kendall_score(recs, user_purchases);
                if let Some(tau) = tau {
                    summary.defined_scores += 1;
                    score_total += tau;
                }
                UserScore::Kendall(tau)
            }
        };
        scores.insert(user.clone(), score);
    }
    summary.mean_score =
        (summary.defined_scores > 0).then(|| score_total / summary.defined_scores as f64);

    let mut completed = ReportEvent::new(
        run_id,
        "evaluate.completed",
        ReportCategory::Evaluate,
        ReportOutcome::Completed,
    )
    .with_metadata("metric", metric)
    .with_metadata("evaluated_users", summary.evaluated_users)
    .with_metadata("skipped_users", summary.skipped_users);
    completed = match metric {
        EvaluationMetric::Count => completed
            .with_metadata("recs_purchased", summary.recs_purchased)
            .with_metadata("optimal_recs_purchased", summary.optimal_recs_purchased),
        EvaluationMetric::Kendall => completed
            .with_metadata("defined_scores", summary.defined_scores)
            .with_metadata(
                "mean_score",
                summary.mean_score.map_or_else(|| "nan".to_string(), |mean| mean.to_string()),
            ),
    };
    reporter.emit(completed);

    EvaluationReport { metric, scores, summary }
}
