//! Delimited tables with a sniffed delimiter and a named header row.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::errors::DataError;
use crate::files::read_input;

pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

const SNIFF_BYTES: usize = 64 * 1024;
const SNIFF_LINES: usize = 20;

/// Picks the candidate that splits every sampled line into the same, non-zero
/// number of fields, preferring more fields. Falls back to the candidate most
/// frequent in the first line, then to a comma.
pub fn sniff_delimiter(sample: &str) -> u8 {
    let lines: Vec<&str> =
        sample.lines().filter(|line| !line.trim().is_empty()).take(SNIFF_LINES).collect();
    let Some(first_line) = lines.first() else {
        return b',';
    };

    let mut consistent: Option<(u8, usize)> = None;
    for candidate in CANDIDATE_DELIMITERS {
        let header_count = count_unquoted(first_line, candidate);
        if header_count == 0 {
            continue;
        }
        let uniform = lines.iter().all(|line| count_unquoted(line, candidate) == header_count);
        if uniform && consistent.map_or(true, |(_, best)| header_count > best) {
            consistent = Some((candidate, header_count));
        }
    }
    if let Some((delimiter, _)) = consistent {
        return delimiter;
    }

    CANDIDATE_DELIMITERS
        .into_iter()
        .map(|candidate| (candidate, count_unquoted(first_line, candidate)))
        .filter(|(_, count)| *count > 0)
        .fold(None, |best: Option<(u8, usize)>, (candidate, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((candidate, count)),
        })
        .map_or(b',', |(delimiter, _)| delimiter)
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            quoted = !quoted;
        } else if byte == delimiter && !quoted {
            count += 1;
        }
    }
    count
}

fn sample_text(bytes: &[u8]) -> String {
    let mut end = bytes.len().min(SNIFF_BYTES);
    if end < bytes.len() {
        if let Some(newline) = bytes[..end].iter().rposition(|byte| *byte == b'\n') {
            end = newline;
        }
    }
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

pub struct DelimitedReader {
    path: PathBuf,
    headers: Vec<String>,
    inner: csv::Reader<Cursor<Vec<u8>>>,
}

impl DelimitedReader {
    pub fn open(path: &Path) -> Result<Self, DataError> {
        let bytes = read_input(path)?;
        Self::from_bytes(path, bytes)
    }

    /// `path` is only used to label errors.
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self, DataError> {
        let delimiter = sniff_delimiter(&sample_text(&bytes));
        let mut inner = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(Cursor::new(bytes));

        let headers: Vec<String> = inner
            .headers()
            .map_err(|source| DataError::csv(path, source))?
            .iter()
            .map(str::to_owned)
            .collect();
        if headers.iter().all(|header| header.is_empty()) {
            return Err(DataError::EmptyInput(path.to_path_buf()));
        }

        Ok(Self { path: path.to_path_buf(), headers, inner })
    }

    /// Index of the header named `name`.
    pub fn column(&self, name: &str) -> Result<usize, DataError> {
        self.headers.iter().position(|header| header == name).ok_or_else(|| {
            DataError::MissingColumn {
                path: self.path.clone(),
                column: name.to_owned(),
                available: self.headers.clone(),
            }
        })
    }

    pub fn records(&mut self) -> impl Iterator<Item = Result<StringRecord, DataError>> + '_ {
        let path = &self.path;
        self.inner
            .records()
            .map(move |record| record.map_err(|source| DataError::csv(path, source)))
    }
}

/// Field `index` of `record`; the reader rejects ragged rows, so it is present.
pub(crate) fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or_default()
}
