//! Tool input parameter structs for MCP tools.
//!
//! This module defines the input types for each MCP tool, with
//! JSON Schema derivation for MCP tool discovery.
//!
//! # Input Sanitization
//!
//! All input structs implement `sanitize()` which trims whitespace
//! from identifier fields. Field values inside payloads are passed
//! through untouched; the payload constructor owns their validation.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catalog::{ChildModule, EntityType};
use crate::endpoint::Endpoint;
use crate::error::KeelError;
use crate::reconcile::{ReconcileOptions, RecordState};

/// Helper function to trim an optional string.
fn trim_option(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_entity(entity: &str) -> Result<EntityType, KeelError> {
    entity.trim().to_ascii_lowercase().parse()
}

/// Builds the endpoint addressed by optional hierarchy parts.
fn locate(
    entity: &str,
    parent_id: Option<&str>,
    child_module: Option<&str>,
    child_id: Option<&str>,
) -> Result<Endpoint, KeelError> {
    let entity = parse_entity(entity)?;
    let child = child_module
        .map(|c| c.to_ascii_lowercase().parse::<ChildModule>())
        .transpose()?;
    Endpoint::from_parts(entity, parent_id, child, child_id)
}

/// Input parameters for the describe_fields tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeFieldsInput {
    /// Entity type: "request", "problem", "change" or "release".
    pub entity: String,
}

impl DescribeFieldsInput {
    /// Parses the entity type.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for an unsupported entity type.
    pub fn entity_type(&self) -> Result<EntityType, KeelError> {
        parse_entity(&self.entity)
    }
}

/// Desired existence of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StateInput {
    /// The record should exist with the given fields.
    #[default]
    Present,
    /// The record should not exist.
    Absent,
}

impl From<StateInput> for RecordState {
    fn from(state: StateInput) -> Self {
        match state {
            StateInput::Present => RecordState::Present,
            StateInput::Absent => RecordState::Absent,
        }
    }
}

/// Input parameters for the manage_record tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ManageRecordInput {
    /// Entity type: "request", "problem", "change" or "release".
    pub entity: String,

    /// Numeric record ID. Omit to create a new record.
    #[serde(default)]
    pub id: Option<String>,

    /// "present" (default) to create or update, "absent" to delete.
    #[serde(default)]
    pub state: Option<StateInput>,

    /// Desired field values keyed by field name (e.g. {"subject": "VPN down", "udf_char1": "x"}).
    #[serde(default)]
    pub fields: Option<Map<String, Value>>,

    /// If true, report what would change without changing anything.
    #[serde(default)]
    pub check_mode: Option<bool>,

    /// If true, include a before/after view of the record.
    #[serde(default)]
    pub diff: Option<bool>,
}

impl ManageRecordInput {
    /// Sanitizes input by trimming whitespace from identifier fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            entity: self.entity.trim().to_string(),
            id: trim_option(&self.id),
            ..self
        }
    }

    /// Parses the entity type.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for an unsupported entity type.
    pub fn entity_type(&self) -> Result<EntityType, KeelError> {
        parse_entity(&self.entity)
    }

    /// Reconcile switches requested by the caller.
    pub fn options(&self) -> ReconcileOptions {
        ReconcileOptions {
            check_mode: self.check_mode.unwrap_or(false),
            diff: self.diff.unwrap_or(false),
        }
    }
}

/// Input parameters for the get_records tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetRecordsInput {
    /// Entity type: "request", "problem", "change" or "release".
    pub entity: String,

    /// Numeric ID of the entity record. Omit to list records.
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Child module under the record: "note", "worklog" or "task".
    #[serde(default)]
    pub child_module: Option<String>,

    /// Numeric ID of the child record.
    #[serde(default)]
    pub child_id: Option<String>,

    /// List options: row_count (1-100), sort_field, sort_order (asc/desc), get_total_count, start_index.
    #[serde(default)]
    pub list_options: Option<Map<String, Value>>,
}

impl GetRecordsInput {
    /// Sanitizes input by trimming whitespace from identifier fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            entity: self.entity.trim().to_string(),
            parent_id: trim_option(&self.parent_id),
            child_module: trim_option(&self.child_module),
            child_id: trim_option(&self.child_id),
            list_options: self.list_options,
        }
    }

    /// The endpoint to read from.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for an invalid hierarchy.
    pub fn endpoint(&self) -> Result<Endpoint, KeelError> {
        locate(
            &self.entity,
            self.parent_id.as_deref(),
            self.child_module.as_deref(),
            self.child_id.as_deref(),
        )
    }
}

/// Input parameters for the write_record tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WriteRecordInput {
    /// Entity type: "request", "problem", "change" or "release".
    pub entity: String,

    /// Numeric ID of the entity record. Required for updates and child records.
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Child module under the record: "note", "worklog" or "task".
    #[serde(default)]
    pub child_module: Option<String>,

    /// Numeric ID of the child record to update.
    #[serde(default)]
    pub child_id: Option<String>,

    /// Raw record fields, sent as is under the record's root key.
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

impl WriteRecordInput {
    /// Sanitizes input by trimming whitespace from identifier fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            entity: self.entity.trim().to_string(),
            parent_id: trim_option(&self.parent_id),
            child_module: trim_option(&self.child_module),
            child_id: trim_option(&self.child_id),
            payload: self.payload,
        }
    }

    /// The endpoint to write to.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for an invalid hierarchy.
    pub fn endpoint(&self) -> Result<Endpoint, KeelError> {
        locate(
            &self.entity,
            self.parent_id.as_deref(),
            self.child_module.as_deref(),
            self.child_id.as_deref(),
        )
    }
}

/// Input parameters for the delete_record tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteRecordInput {
    /// Entity type: "request", "problem", "change" or "release".
    pub entity: String,

    /// Numeric ID of the entity record.
    pub parent_id: String,

    /// Child module under the record: "note", "worklog" or "task".
    #[serde(default)]
    pub child_module: Option<String>,

    /// Numeric ID of the child record. Required with child_module.
    #[serde(default)]
    pub child_id: Option<String>,
}

impl DeleteRecordInput {
    /// Sanitizes input by trimming whitespace from identifier fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            entity: self.entity.trim().to_string(),
            parent_id: self.parent_id.trim().to_string(),
            child_module: trim_option(&self.child_module),
            child_id: trim_option(&self.child_id),
        }
    }

    /// The endpoint to delete.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for an invalid hierarchy.
    pub fn endpoint(&self) -> Result<Endpoint, KeelError> {
        let parent_id = Some(self.parent_id.as_str()).filter(|id| !id.is_empty());
        locate(
            &self.entity,
            parent_id,
            self.child_module.as_deref(),
            self.child_id.as_deref(),
        )
    }
}
