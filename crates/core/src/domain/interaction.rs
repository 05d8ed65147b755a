use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Interaction time. Integers stay exact so nanosecond epochs keep their
/// order; floats are always finite.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Timestamp {
    Int(i64),
    Float(f64),
}

impl Timestamp {
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::MalformedTime { value: value.to_string() });
        }
        Ok(Self::Float(value))
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }

    /// Elapsed time from `earlier` to `self`, exact when both are integers.
    pub fn gap_since(self, earlier: Timestamp) -> f64 {
        match (self, earlier) {
            (Self::Int(later), Self::Int(earlier)) => {
                (i128::from(later) - i128::from(earlier)) as f64
            }
            (later, earlier) => later.as_f64() - earlier.as_f64(),
        }
    }
}

/// Orders an integer against a finite float without rounding the integer.
fn cmp_int_float(integer: i64, float: f64) -> Ordering {
    // 2^63 is exactly representable; i64 covers [-2^63, 2^63).
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if float >= BOUND {
        return Ordering::Less;
    }
    if float < -BOUND {
        return Ordering::Greater;
    }

    let floor = float.floor();
    match integer.cmp(&(floor as i64)) {
        Ordering::Equal if float > floor => Ordering::Less,
        ordering => ordering,
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match (*self, *other) {
            (Self::Int(left), Self::Int(right)) => left.cmp(&right),
            (Self::Float(left), Self::Float(right)) => {
                left.partial_cmp(&right).unwrap_or(Ordering::Equal)
            }
            (Self::Int(left), Self::Float(right)) => cmp_int_float(left, right),
            (Self::Float(left), Self::Int(right)) => cmp_int_float(right, left).reverse(),
        }
    }
}

impl FromStr for Timestamp {
    type Err = DomainError;

    /// Integers are tried first, then finite floats; anything else is
    /// `MalformedTime`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Ok(integer) = trimmed.parse::<i64>() {
            return Ok(Self::Int(integer));
        }

        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Self::Float(value)),
            _ => Err(DomainError::MalformedTime { value: raw.to_owned() }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: Timestamp,
    pub item: String,
}

impl Interaction {
    pub fn new(timestamp: Timestamp, item: impl Into<String>) -> Self {
        Self { timestamp, item: item.into() }
    }
}

/// One user's interactions in ascending time order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserHistory {
    interactions: Vec<Interaction>,
}

impl UserHistory {
    /// Builds a history from unordered interactions. The sort is stable, so
    /// interactions sharing a timestamp keep their input order.
    pub fn from_unsorted(mut interactions: Vec<Interaction>) -> Self {
        interactions.sort_by(|left, right| left.timestamp.cmp(&right.timestamp));
        Self { interactions }
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.interactions.iter().map(|interaction| interaction.item.as_str())
    }

    /// The last `count` items, oldest first.
    pub fn recent_items(&self, count: usize) -> Vec<&str> {
        let start = self.interactions.len().saturating_sub(count);
        self.interactions[start..].iter().map(|interaction| interaction.item.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}
