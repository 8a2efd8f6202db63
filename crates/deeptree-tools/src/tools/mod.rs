//! Individual tool implementations.
//!
//! Each tool is a self-contained module. To add a new tool:
//! 1. Create a new file in this directory
//! 2. Implement the Tool trait
//! 3. Add `pub mod <name>;` here
//! 4. Register it in register_default_tools() in ../lib.rs

pub mod glob;
pub mod read;
pub mod text_stats;
pub mod text_transform;
pub mod workspace;
