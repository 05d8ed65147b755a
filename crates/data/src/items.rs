use std::collections::BTreeSet;
use std::path::Path;

use crate::delimited::{field, DelimitedReader};
use crate::errors::DataError;

/// Distinct non-empty values of `item_column`, sorted.
pub fn load_item_vocabulary(path: &Path, item_column: &str) -> Result<Vec<String>, DataError> {
    let mut table = DelimitedReader::open(path)?;
    let index = table.column(item_column)?;

    let mut items = BTreeSet::new();
    for record in table.records() {
        let record = record?;
        let item = field(&record, index);
        if !item.is_empty() {
            items.insert(item.to_owned());
        }
    }

    Ok(items.into_iter().collect())
}
