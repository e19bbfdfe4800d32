//! Parsing module for event logs
//!
//! This module contains the line grammar that turns one
//! log line into a typed event.

pub mod tokens;
pub mod grammar;

// Re-export commonly used types
pub use tokens::*;
pub use grammar::*;
