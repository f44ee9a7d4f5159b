//! Record repository: loads, parses, validates and deduplicates records from
//! line-oriented text sources.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::error::{ErrorKind, RosterResult};
use crate::roster_error;
use crate::types::{Record, RecordIdentity, is_valid_birth_date};

/// Loads the unique record collection from one or more text sources.
///
/// Each source is a line-oriented text file with one record per line,
/// whitespace-tokenized as `id firstName... lastName birthDate`. The
/// repository is stateless per call: every [`RecordRepository::load_unique_records`]
/// invocation re-reads the sources and builds the collection fresh, nothing is
/// cached between calls.
///
/// Malformed lines and unreadable sources are never fatal. Each rejected line
/// produces exactly one diagnostic and the load completes with whatever parsed
/// validly from the rest of the sources.
#[derive(Debug, Clone)]
pub struct RecordRepository {
    sources: Vec<PathBuf>,
}

impl RecordRepository {
    /// Creates a repository reading from the given source files.
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self { sources }
    }

    /// Loads all sources and returns the deduplicated record collection.
    ///
    /// Records are unique by their `(firstName, lastName, birthDate)` identity
    /// and returned in ascending identity order. When the same identity appears
    /// more than once, the first occurrence wins and later ones are silently
    /// absorbed.
    pub async fn load_unique_records(&self) -> Vec<Record> {
        let mut unique = BTreeMap::<RecordIdentity, Record>::new();

        for source in &self.sources {
            let file = match File::open(source).await {
                Ok(file) => file,
                Err(err) => {
                    warn!(source = %source.display(), error = %err, "could not open record source, skipping");
                    continue;
                }
            };

            let mut lines = BufReader::new(file).lines();
            let mut line_number = 0u64;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        warn!(source = %source.display(), error = %err, "failed to read record source, skipping rest of file");
                        break;
                    }
                };

                line_number += 1;
                if line.trim().is_empty() {
                    continue;
                }

                match parse_line(&line) {
                    Ok(record) => {
                        unique.entry(record.identity()).or_insert(record);
                    }
                    Err(err) => {
                        warn!(
                            source = %source.display(),
                            line_number,
                            error = %err,
                            "skipping malformed record line"
                        );
                    }
                }
            }
        }

        info!(records = unique.len(), "loaded unique record collection");

        unique.into_values().collect()
    }
}

/// Parses a single source line into a [`Record`].
///
/// Tokenization: the first whitespace-delimited token is the integer id, the
/// last is the birth date, the token before the date is the last name and any
/// tokens in between are joined with single spaces to form the first name. At
/// least two non-id tokens are required.
fn parse_line(line: &str) -> RosterResult<Record> {
    let mut tokens = line.split_whitespace();

    let id_token = tokens.next().unwrap_or_default();
    let id = id_token.parse::<i64>().map_err(|err| {
        roster_error!(
            ErrorKind::InvalidData,
            "Record line does not start with an integer id",
            id_token,
            source: err
        )
    })?;

    let parts = tokens.collect::<Vec<_>>();
    let [first_name_parts @ .., last_name, birth_date] = parts.as_slice() else {
        return Err(roster_error!(
            ErrorKind::InvalidData,
            "Record line does not contain enough tokens for a name and a date"
        ));
    };

    if !is_valid_birth_date(birth_date) {
        return Err(roster_error!(
            ErrorKind::InvalidData,
            "Record line does not end with a valid DD.MM.YYYY date",
            birth_date
        ));
    }

    Ok(Record {
        id,
        first_name: first_name_parts.join(" "),
        last_name: (*last_name).to_owned(),
        birth_date: (*birth_date).to_owned(),
    })
}
