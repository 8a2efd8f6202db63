//! DeepTree Core - Types, typed parameters, and error handling

pub mod error;
pub mod params;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use params::{ParamValue, Parameters};
pub use types::*;
