//! Generic utility primitives with zero domain knowledge.
//!
//! - `io` - File I/O with consistent error handling
//! - `shell` - Shell escaping, quoting and command-line assembly

pub mod io;
pub mod shell;
