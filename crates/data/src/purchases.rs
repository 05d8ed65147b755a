use std::collections::BTreeMap;
use std::path::Path;

use markovrec_core::domain::Timestamp;
use markovrec_core::evaluation::PurchaseSet;

use crate::delimited::{field, DelimitedReader};
use crate::errors::DataError;

/// Loads held-out purchases per user.
///
/// With `time_column`, each user's purchases are ordered by time (ties in file
/// order); otherwise file order is kept. Repeat purchases collapse onto their
/// first occurrence.
pub fn load_purchases(
    path: &Path,
    user_column: &str,
    item_column: &str,
    time_column: Option<&str>,
) -> Result<BTreeMap<String, PurchaseSet>, DataError> {
    let mut table = DelimitedReader::open(path)?;
    read_purchases(&mut table, user_column, item_column, time_column)
}

pub(crate) fn read_purchases(
    table: &mut DelimitedReader,
    user_column: &str,
    item_column: &str,
    time_column: Option<&str>,
) -> Result<BTreeMap<String, PurchaseSet>, DataError> {
    let user_index = table.column(user_column)?;
    let item_index = table.column(item_column)?;
    let time_index = time_column.map(|column| table.column(column)).transpose()?;

    let mut raw: BTreeMap<String, Vec<(Option<Timestamp>, String)>> = BTreeMap::new();
    for record in table.records() {
        let record = record?;
        let timestamp = match time_index {
            Some(index) => Some(field(&record, index).parse::<Timestamp>()?),
            None => None,
        };
        raw.entry(field(&record, user_index).to_owned())
            .or_default()
            .push((timestamp, field(&record, item_index).to_owned()));
    }

    Ok(raw
        .into_iter()
        .map(|(user, mut purchases)| {
            purchases.sort_by(|left, right| left.0.cmp(&right.0));
            (user, PurchaseSet::from_sequence(purchases.into_iter().map(|(_, item)| item)))
        })
        .collect())
}
