//! Data models for the ServiceDesk Plus Cloud API.
//!
//! Records themselves are handled as JSON documents because their shape
//! depends on the portal's custom fields. This module holds the fixed
//! parts: the response envelope, list pagination, and `_metainfo`.

mod common;
mod metainfo;

pub use common::*;
pub use metainfo::*;
