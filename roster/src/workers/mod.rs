//! Background workers for the processing stage.

pub mod batch;
