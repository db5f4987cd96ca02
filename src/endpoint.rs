//! Endpoint paths for entity records and their child records.
//!
//! Paths have the shape
//! `/<entity>[/<parent_id>[/<child>[/<child_id>]]]`, relative to the
//! API base URL. Every identifier interpolated into a path must be a
//! numeric string.

use std::fmt;

use crate::catalog::{ChildModule, EntityType};
use crate::error::KeelError;

/// A validated API path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    entity: EntityType,
    parent_id: Option<String>,
    child: Option<ChildModule>,
    child_id: Option<String>,
}

impl Endpoint {
    /// The collection of all records of `entity`.
    pub fn collection(entity: EntityType) -> Self {
        Self {
            entity,
            parent_id: None,
            child: None,
            child_id: None,
        }
    }

    /// A single record of `entity`.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` if `id` is not numeric.
    pub fn record(entity: EntityType, id: &str) -> Result<Self, KeelError> {
        validate_id(id, entity.descriptor().id_param)?;
        Ok(Self {
            parent_id: Some(id.to_string()),
            ..Self::collection(entity)
        })
    }

    /// Builds an endpoint from optional hierarchy parts.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` when `child_id` or `child` is
    /// given without `parent_id`, or when an identifier is not numeric.
    pub fn from_parts(
        entity: EntityType,
        parent_id: Option<&str>,
        child: Option<ChildModule>,
        child_id: Option<&str>,
    ) -> Result<Self, KeelError> {
        if child_id.is_some() && parent_id.is_none() {
            return Err(KeelError::validation(
                "parent_id is required when child_id is provided.",
            ));
        }
        if child.is_some() && parent_id.is_none() {
            return Err(KeelError::validation(
                "parent_id is required when child_module is provided.",
            ));
        }
        if child_id.is_some() && child.is_none() {
            return Err(KeelError::validation(
                "child_module is required when child_id is provided.",
            ));
        }

        let Some(parent_id) = parent_id else {
            return Ok(Self::collection(entity));
        };
        let mut endpoint = Self::record(entity, parent_id)?;
        endpoint.child = child;
        if let Some(child_id) = child_id {
            validate_id(child_id, "child_id")?;
            endpoint.child_id = Some(child_id.to_string());
        }
        Ok(endpoint)
    }

    /// Path of the entity's schema document.
    pub fn metainfo_path(entity: EntityType) -> String {
        format!("/{}/_metainfo", entity.descriptor().endpoint)
    }

    /// Entity type at the root of this path.
    pub fn entity(&self) -> EntityType {
        self.entity
    }

    /// Identifier of the entity record, if any.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Child module, if this path addresses child records.
    pub fn child(&self) -> Option<ChildModule> {
        self.child
    }

    /// Identifier of the child record, if any.
    pub fn child_id(&self) -> Option<&str> {
        self.child_id.as_deref()
    }

    /// Root key of payloads sent to or returned from this path.
    pub fn root_key(&self) -> &'static str {
        self.child
            .map_or_else(|| self.entity.root_key(), ChildModule::root_key)
    }

    /// Key of the record array in list responses.
    pub fn list_key(&self) -> &'static str {
        self.child
            .map_or_else(|| self.entity.descriptor().endpoint, ChildModule::endpoint)
    }

    /// Returns true if this path addresses one record rather than a collection.
    pub fn is_single_record(&self) -> bool {
        match self.child {
            Some(_) => self.child_id.is_some(),
            None => self.parent_id.is_some(),
        }
    }

    /// The path relative to the API base URL.
    pub fn path(&self) -> String {
        let mut path = format!("/{}", self.entity.descriptor().endpoint);
        if let Some(parent_id) = &self.parent_id {
            path.push('/');
            path.push_str(parent_id);
            if let Some(child) = self.child {
                path.push('/');
                path.push_str(child.endpoint());
                if let Some(child_id) = &self.child_id {
                    path.push('/');
                    path.push_str(child_id);
                }
            }
        }
        path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Validates that an ID is a numeric string, as expected by the SDP API.
///
/// SDP uses strictly numeric IDs for all entities. This prevents
/// path traversal or injection via malformed IDs interpolated into URLs.
///
/// # Errors
///
/// Returns `KeelError::Validation` if the ID is empty or contains non-digit characters.
pub fn validate_id(id: &str, field_name: &str) -> Result<(), KeelError> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KeelError::validation(format!(
            "{} must be a numeric string, got: {:?}",
            field_name,
            id.chars().take(50).collect::<String>()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path() {
        let endpoint = Endpoint::collection(EntityType::Request);
        assert_eq!(endpoint.path(), "/requests");
        assert_eq!(endpoint.root_key(), "request");
        assert_eq!(endpoint.list_key(), "requests");
        assert!(!endpoint.is_single_record());
    }

    #[test]
    fn test_record_path() {
        let endpoint = Endpoint::record(EntityType::Problem, "42").unwrap();
        assert_eq!(endpoint.path(), "/problems/42");
        assert!(endpoint.is_single_record());
    }

    #[test]
    fn test_child_paths() {
        let notes =
            Endpoint::from_parts(EntityType::Request, Some("1"), Some(ChildModule::Note), None)
                .unwrap();
        assert_eq!(notes.path(), "/requests/1/notes");
        assert_eq!(notes.root_key(), "note");
        assert_eq!(notes.list_key(), "notes");
        assert!(!notes.is_single_record());

        let task = Endpoint::from_parts(
            EntityType::Change,
            Some("7"),
            Some(ChildModule::Task),
            Some("9"),
        )
        .unwrap();
        assert_eq!(task.to_string(), "/changes/7/tasks/9");
        assert!(task.is_single_record());
    }

    #[test]
    fn test_hierarchy_validation() {
        let err = Endpoint::from_parts(EntityType::Request, None, Some(ChildModule::Note), Some("2"))
            .unwrap_err();
        assert!(err.to_string().contains("parent_id is required when child_id"));

        let err = Endpoint::from_parts(EntityType::Request, None, Some(ChildModule::Note), None)
            .unwrap_err();
        assert!(err.to_string().contains("parent_id is required when child_module"));

        let err = Endpoint::from_parts(EntityType::Request, Some("1"), None, Some("2")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_metainfo_path() {
        assert_eq!(Endpoint::metainfo_path(EntityType::Release), "/releases/_metainfo");
    }

    #[test]
    fn test_validate_id_valid() {
        assert!(validate_id("12345", "request_id").is_ok());
        assert!(validate_id("0", "request_id").is_ok());
    }

    #[test]
    fn test_validate_id_rejects_empty() {
        let err = validate_id("", "request_id").unwrap_err();
        assert!(err.to_string().contains("request_id must be a numeric string"));
    }

    #[test]
    fn test_validate_id_rejects_non_numeric() {
        for bad in ["abc", "12a", "../etc", "1 2", "-5"] {
            assert!(validate_id(bad, "request_id").is_err(), "{bad} should be rejected");
        }
        assert!(Endpoint::record(EntityType::Request, "../admin").is_err());
    }
}
