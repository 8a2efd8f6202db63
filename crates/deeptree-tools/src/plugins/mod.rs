//! Plugin implementations.
//!
//! A plugin advertises several operations and picks one from
//! `parameters["type"]`. Register new plugins in register_default_plugins()
//! in ../lib.rs.

pub mod data_analysis;
pub mod text_processing;
