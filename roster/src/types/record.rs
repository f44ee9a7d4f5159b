//! Person record type, its identity key and the bus wire codec.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, RosterResult};
use crate::roster_error;

/// A single person record distributed through the system.
///
/// Records are value types: they are copied and moved freely and never shared
/// mutably across tasks. The `id` field is advisory and not part of the record
/// identity, since the same person can appear under different ids in different
/// sources.
///
/// The JSON representation uses camelCase keys (`id`, `firstName`, `lastName`,
/// `birthDate`) to stay compatible with the document transport consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Calendar date in `DD.MM.YYYY` form, validated on ingestion.
    pub birth_date: String,
}

impl Record {
    /// Returns the identity key used for deduplication and storage ordering.
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            birth_date: self.birth_date.clone(),
        }
    }

    /// Encodes this record as a bus wire payload.
    ///
    /// The payload is the space-joined `id firstName lastName birthDate`
    /// sequence. Decoding assumes exactly four whitespace-separated tokens, so
    /// a record whose names contain internal whitespace cannot be framed this
    /// way; such records are rejected here instead of producing a payload the
    /// peer is guaranteed to drop.
    pub fn to_wire(&self) -> RosterResult<String> {
        if self.first_name.split_whitespace().count() != 1
            || self.last_name.split_whitespace().count() != 1
        {
            return Err(roster_error!(
                ErrorKind::SerializationError,
                "Record does not fit the four-token wire framing",
                format!("firstName: '{}', lastName: '{}'", self.first_name, self.last_name)
            ));
        }

        Ok(format!(
            "{} {} {} {}",
            self.id, self.first_name, self.last_name, self.birth_date
        ))
    }

    /// Decodes a bus wire payload back into a record.
    ///
    /// The payload must contain exactly four whitespace-separated tokens and
    /// the first token must parse as an integer id. Anything else is a decode
    /// failure for this one message.
    pub fn from_wire(payload: &str) -> RosterResult<Record> {
        let tokens = payload.split_whitespace().collect::<Vec<_>>();
        let [id, first_name, last_name, birth_date] = tokens.as_slice() else {
            return Err(roster_error!(
                ErrorKind::DeserializationError,
                "Wire payload does not contain exactly four tokens",
                payload
            ));
        };

        let id = id.parse::<i64>().map_err(|err| {
            roster_error!(
                ErrorKind::DeserializationError,
                "Wire payload id is not an integer",
                payload,
                source: err
            )
        })?;

        Ok(Record {
            id,
            first_name: (*first_name).to_owned(),
            last_name: (*last_name).to_owned(),
            birth_date: (*birth_date).to_owned(),
        })
    }
}

/// Identity key for a [`Record`].
///
/// Uniqueness and storage ordering are defined by the lexicographic
/// `(firstName, lastName, birthDate)` triple. Keeping the comparison in a
/// dedicated key type, outside the record itself, lets the unique collection
/// own the ordering policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordIdentity {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
}

/// Display-time ordering: ascending `(lastName, firstName)`.
///
/// Independent of the identity ordering and applied only when a batch is
/// rendered.
pub fn display_order(a: &Record, b: &Record) -> Ordering {
    a.last_name
        .cmp(&b.last_name)
        .then_with(|| a.first_name.cmp(&b.first_name))
}

/// Validates a birth date string.
///
/// The string must match the `DD.MM.YYYY` pattern exactly (two digits, two
/// digits, four digits, no trailing characters) and the numeric triple must
/// denote a real Gregorian calendar date, leap years included.
pub fn is_valid_birth_date(date: &str) -> bool {
    let mut parts = date.split('.');
    let (Some(day), Some(month), Some(year), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if day.len() != 2 || month.len() != 2 || year.len() != 4 {
        return false;
    }
    if !all_digits(day) || !all_digits(month) || !all_digits(year) {
        return false;
    }

    let (Ok(day), Ok(month), Ok(year)) =
        (day.parse::<u32>(), month.parse::<u32>(), year.parse::<i32>())
    else {
        return false;
    };

    NaiveDate::from_ymd_opt(year, month, day).is_some()
}
