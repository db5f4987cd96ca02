//! MCP tool inputs for Keel.
//!
//! This module contains the input types and helper functions for
//! MCP tools that expose record operations.

mod inputs;

pub use inputs::*;
