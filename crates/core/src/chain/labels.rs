use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Stable arena key for an item label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u32);

impl ItemId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bijection between item labels and dense integer ids.
///
/// Ids are assigned in first-seen order and never reused; the index only grows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelIndex {
    labels: Vec<String>,
    ids: HashMap<String, ItemId>,
}

impl LabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `label`, assigning the next free id when unseen.
    pub fn intern(&mut self, label: &str) -> ItemId {
        if let Some(id) = self.ids.get(label) {
            return *id;
        }

        let id = ItemId(self.labels.len() as u32);
        self.labels.push(label.to_owned());
        self.ids.insert(label.to_owned(), id);
        id
    }

    pub fn id(&self, label: &str) -> Option<ItemId> {
        self.ids.get(label).copied()
    }

    pub fn label(&self, id: ItemId) -> Option<&str> {
        self.labels.get(id.index()).map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.labels.len()).map(|index| ItemId(index as u32))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl TryFrom<Vec<String>> for LabelIndex {
    type Error = String;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        let mut ids = HashMap::with_capacity(labels.len());
        for (index, label) in labels.iter().enumerate() {
            if ids.insert(label.clone(), ItemId(index as u32)).is_some() {
                return Err(format!("duplicate item label `{label}` in label index"));
            }
        }
        Ok(Self { labels, ids })
    }
}

impl From<LabelIndex> for Vec<String> {
    fn from(index: LabelIndex) -> Self {
        index.labels
    }
}
