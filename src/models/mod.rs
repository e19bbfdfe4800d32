//! Data models for the event log
//!
//! This module contains the typed event records produced by the
//! line parser and consumed by the timeline builder.

pub mod event;

// Re-export commonly used types
pub use event::*;
