//! Core data types shared across the roster system.

pub mod record;

pub use record::{Record, RecordIdentity, display_order, is_valid_birth_date};

/// One session's full set of received records, handed as a unit to the
/// processing stage. Ownership transfers wholesale from the receiving task to
/// the batch worker on every queue operation.
pub type Batch = Vec<Record>;
