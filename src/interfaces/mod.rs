//! Batch driver surfaces: CSV catalog input, JSON-lines commands and CSV
//! order output.

pub mod commands;
pub mod csv;
