//! Shared helpers for tabula tests: synthetic record generation and
//! scratch directories.

pub mod data_gen;
pub mod dirs;

pub use data_gen::{Record, column_values, generate_patients, patient_schema};
