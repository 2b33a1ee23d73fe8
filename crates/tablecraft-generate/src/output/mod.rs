//! Output writers for generated datasets.

pub mod csv;
