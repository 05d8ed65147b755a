use std::collections::BTreeMap;
use std::path::Path;

use markovrec_core::recommend::RecommendationSet;
use serde::Deserialize;

use crate::errors::DataError;
use crate::files::{read_input, write_output};

/// Shape of each user's entry in the recommendation JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecommendationLayout {
    /// `{"user": ["item", ...]}`
    #[default]
    List,
    /// `{"user": "item"}`, or `null` when nothing was recommended.
    Single,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecommendationEntry {
    Many(Vec<String>),
    One(Option<String>),
}

impl From<RecommendationEntry> for Vec<String> {
    fn from(entry: RecommendationEntry) -> Self {
        match entry {
            RecommendationEntry::Many(items) => items,
            RecommendationEntry::One(item) => item.into_iter().collect(),
        }
    }
}

pub fn write_recommendations(
    path: &Path,
    recommendations: &RecommendationSet,
    layout: RecommendationLayout,
) -> Result<(), DataError> {
    write_output(path, |output| {
        let written = match layout {
            RecommendationLayout::List => serde_json::to_writer(output, recommendations),
            RecommendationLayout::Single => {
                let single: BTreeMap<&String, Option<&String>> =
                    recommendations.iter().map(|(user, items)| (user, items.first())).collect();
                serde_json::to_writer(output, &single)
            }
        };
        written.map_err(|source| DataError::Json { path: path.to_path_buf(), source })
    })
}

/// Reads either layout back as ordered lists.
pub fn read_recommendations(path: &Path) -> Result<RecommendationSet, DataError> {
    let bytes = read_input(path)?;
    let entries: BTreeMap<String, RecommendationEntry> = serde_json::from_slice(&bytes)
        .map_err(|source| DataError::Json { path: path.to_path_buf(), source })?;

    Ok(entries.into_iter().map(|(user, entry)| (user, entry.into())).collect())
}
