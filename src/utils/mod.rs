//! Utility functions

pub mod fs;

pub use fs::{read_json, read_yaml, write_atomic, write_json_atomic};
