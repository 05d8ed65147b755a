use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::chain::{LabelIndex, MarkovChain, State, TransitionCounts};
use crate::errors::{DomainError, PersistenceError};

#[derive(Debug, Serialize, Deserialize)]
struct ChainFile {
    order: usize,
    labels: LabelIndex,
    transitions: Vec<TransitionRow>,
    #[serde(default)]
    pseudocount_applied: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct TransitionRow {
    state: State,
    next: TransitionCounts,
}

impl MarkovChain {
    /// Writes the chain to `path`, gzip-compressed when the path ends in `.gz`.
    /// Never overwrites an existing file.
    pub fn dump(&self, path: &Path) -> Result<(), PersistenceError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| PersistenceError::io(path, source))?;

        let written = if is_gzip(path) {
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            self.write_json(&mut encoder, path).and_then(|()| {
                encoder
                    .finish()
                    .and_then(|mut inner| inner.flush())
                    .map_err(|source| PersistenceError::io(path, source))
            })
        } else {
            let mut writer = BufWriter::new(file);
            self.write_json(&mut writer, path)
                .and_then(|()| writer.flush().map_err(|source| PersistenceError::io(path, source)))
        };

        if written.is_err() {
            let _ = fs::remove_file(path);
        }
        written
    }

    /// Restores a chain written by [`MarkovChain::dump`]. The result is frozen.
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let file = File::open(path).map_err(|source| PersistenceError::io(path, source))?;
        let reader: Box<dyn Read> = if is_gzip(path) {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let decoded: ChainFile = serde_json::from_reader(reader)
            .map_err(|source| PersistenceError::Format { path: path.to_path_buf(), source })?;

        let mut chain = Self::from_file(decoded)?;
        chain.frozen = true;
        Ok(chain)
    }

    fn write_json<W: Write>(&self, writer: &mut W, path: &Path) -> Result<(), PersistenceError> {
        let payload = ChainFile {
            order: self.order,
            labels: self.labels.clone(),
            transitions: self
                .transitions
                .iter()
                .map(|(state, next)| TransitionRow { state: state.clone(), next: next.clone() })
                .collect(),
            pseudocount_applied: self.pseudocount_applied,
        };

        serde_json::to_writer_pretty(writer, &payload)
            .map_err(|source| PersistenceError::Format { path: path.to_path_buf(), source })
    }

    fn from_file(file: ChainFile) -> Result<Self, DomainError> {
        let mut chain = Self::new(file.order)?;
        let vocabulary = file.labels.len();
        let mut transitions = BTreeMap::new();

        for row in file.transitions {
            if row.state.order() != file.order {
                return Err(DomainError::InvariantViolation(format!(
                    "state has {} slots but chain order is {}",
                    row.state.order(),
                    file.order
                )));
            }
            let out_of_range = row
                .state
                .slots()
                .iter()
                .flatten()
                .chain(row.next.keys())
                .any(|id| id.index() >= vocabulary);
            if out_of_range {
                return Err(DomainError::InvariantViolation(
                    "transition references an item id outside the label index".to_string(),
                ));
            }
            if transitions.insert(row.state, row.next).is_some() {
                return Err(DomainError::InvariantViolation(
                    "chain file lists the same state twice".to_string(),
                ));
            }
        }

        chain.labels = file.labels;
        chain.transitions = transitions;
        chain.pseudocount_applied = file.pseudocount_applied;
        Ok(chain)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("gz"))
}
