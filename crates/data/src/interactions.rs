use std::collections::BTreeMap;
use std::path::Path;

use markovrec_core::config::ColumnConfig;
use markovrec_core::domain::{Interaction, Timestamp, UserHistory};

use crate::delimited::{field, DelimitedReader};
use crate::errors::DataError;

/// Loads per-user histories, each sorted by time with ties kept in file order.
pub fn load_interactions(
    path: &Path,
    columns: &ColumnConfig,
) -> Result<BTreeMap<String, UserHistory>, DataError> {
    let mut table = DelimitedReader::open(path)?;
    read_interactions(&mut table, columns)
}

pub(crate) fn read_interactions(
    table: &mut DelimitedReader,
    columns: &ColumnConfig,
) -> Result<BTreeMap<String, UserHistory>, DataError> {
    let user_index = table.column(&columns.user)?;
    let item_index = table.column(&columns.item)?;
    let time_index = table.column(&columns.time)?;

    let mut raw: BTreeMap<String, Vec<Interaction>> = BTreeMap::new();
    for record in table.records() {
        let record = record?;
        let timestamp: Timestamp = field(&record, time_index).parse()?;
        let interaction = Interaction::new(timestamp, field(&record, item_index));
        raw.entry(field(&record, user_index).to_owned()).or_default().push(interaction);
    }

    Ok(raw
        .into_iter()
        .map(|(user, interactions)| (user, UserHistory::from_unsorted(interactions)))
        .collect())
}
