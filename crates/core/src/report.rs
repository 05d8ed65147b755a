use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Load,
    Build,
    Recommend,
    Evaluate,
    Persist,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    Started,
    Completed,
    Skipped,
    Failed,
}

/// Identifies one batch run; every event of the run carries the same id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEvent {
    pub run_id: RunId,
    pub event_type: String,
    pub category: ReportCategory,
    pub outcome: ReportOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl ReportEvent {
    pub fn new(
        run_id: &RunId,
        event_type: impl Into<String>,
        category: ReportCategory,
        outcome: ReportOutcome,
    ) -> Self {
        Self {
            run_id: run_id.clone(),
            event_type: event_type.into(),
            category,
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// Progress sink for long-running phases. The core only reports through an
/// explicitly passed reporter.
pub trait Reporter: Send + Sync {
    fn emit(&self, event: ReportEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn emit(&self, _event: ReportEvent) {}
}

#[derive(Clone, Default)]
pub struct InMemoryReporter {
    events: Arc<Mutex<Vec<ReportEvent>>>,
}

impl InMemoryReporter {
    pub fn events(&self) -> Vec<ReportEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.event_type).collect()
    }
}

impl Reporter for InMemoryReporter {
    fn emit(&self, event: ReportEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
