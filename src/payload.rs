//! Construction of the nested wire payload from a flat desired state.
//!
//! Each key is resolved against the field catalog, then against the
//! custom-field convention, transformed to its wire form and placed at
//! the top level, under its group, or under the `udf_fields` container.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::catalog::{self, EntityType, FieldKind};
use crate::error::KeelError;
use crate::udf::{self, MetadataSource, NoMetadata, UdfMetadataCache, UdfType, UDF_CONTAINER};

/// A fully resolved payload, ready to be sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructedPayload {
    /// Entity root key (`request`, `problem`, ...).
    pub root_key: &'static str,
    /// The entity sub-map: system fields, groups and `udf_fields`.
    pub fields: Map<String, Value>,
    /// Non-fatal notices raised while building.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ConstructedPayload {
    /// The wire document `{<root_key>: {...}}`.
    pub fn to_wire(&self) -> Value {
        let mut wire = Map::new();
        wire.insert(self.root_key.to_string(), Value::Object(self.fields.clone()));
        Value::Object(wire)
    }

    /// Returns true if no field was set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Where a resolved value ends up in the payload.
enum Placement {
    Top,
    Group(&'static str),
    Custom,
}

/// Builds a [`ConstructedPayload`] for one entity type.
///
/// Custom-field kinds are resolved through the borrowed cache, so one
/// cache can serve several builders in the same session.
pub struct PayloadBuilder<'a, S: MetadataSource = NoMetadata> {
    entity: EntityType,
    source: Option<&'a S>,
    cache: &'a mut UdfMetadataCache,
}

impl<'a> PayloadBuilder<'a, NoMetadata> {
    /// A builder with no metadata access: custom fields fall back to strings.
    pub fn offline(entity: EntityType, cache: &'a mut UdfMetadataCache) -> Self {
        Self {
            entity,
            source: None,
            cache,
        }
    }
}

impl<'a, S: MetadataSource> PayloadBuilder<'a, S> {
    /// A builder that resolves custom fields through `source`.
    pub fn new(entity: EntityType, source: &'a S, cache: &'a mut UdfMetadataCache) -> Self {
        Self {
            entity,
            source: Some(source),
            cache,
        }
    }

    /// Resolves and transforms `desired` into a payload.
    ///
    /// Returns `Ok(None)` when `desired` is absent or empty.
    ///
    /// # Errors
    ///
    /// - `KeelError::UnknownField` for a key that is neither a catalog
    ///   field nor a custom field
    /// - `KeelError::InvalidValue` when a value cannot be transformed
    /// - `KeelError::UnknownUdf` when metadata does not know a custom field
    /// - `KeelError::Validation` when a field name collides with a group
    pub async fn build(
        mut self,
        desired: Option<&Map<String, Value>>,
    ) -> Result<Option<ConstructedPayload>, KeelError> {
        let Some(desired) = desired.filter(|d| !d.is_empty()) else {
            return Ok(None);
        };

        let mut fields = Map::new();
        let mut custom = Map::new();
        let mut groups = HashSet::new();
        let mut warnings = Vec::new();

        for (key, raw) in desired {
            let (kind, placement) = self.classify(key, &mut warnings).await?;
            let value = kind.transform(key, raw)?;

            match placement {
                Placement::Top => {
                    if groups.contains(key.as_str()) {
                        return Err(group_collision(key));
                    }
                    fields.insert(key.clone(), value);
                }
                Placement::Group(group) => {
                    if groups.insert(group) && fields.contains_key(group) {
                        return Err(group_collision(group));
                    }
                    if let Value::Object(group_map) = fields
                        .entry(group.to_string())
                        .or_insert_with(|| Value::Object(Map::new()))
                    {
                        group_map.insert(key.clone(), value);
                    }
                }
                Placement::Custom => {
                    custom.insert(key.clone(), value);
                }
            }
        }

        if !custom.is_empty() {
            fields.insert(UDF_CONTAINER.to_string(), Value::Object(custom));
        }

        Ok(Some(ConstructedPayload {
            root_key: self.entity.root_key(),
            fields,
            warnings,
        }))
    }

    async fn classify(
        &mut self,
        key: &str,
        warnings: &mut Vec<String>,
    ) -> Result<(FieldKind, Placement), KeelError> {
        if let Some(descriptor) = catalog::lookup(self.entity, key) {
            let placement = descriptor.group.map_or(Placement::Top, Placement::Group);
            return Ok((descriptor.kind, placement));
        }

        if !udf::is_custom_field(key) {
            return Err(KeelError::UnknownField {
                field: key.to_string(),
                allowed: self.entity.descriptor().field_names(),
            });
        }

        match self.cache.resolve(self.entity, key, self.source).await? {
            UdfType::Known(kind) => Ok((kind, Placement::Custom)),
            UdfType::Unverified => {
                let message = format!(
                    "Custom field '{}' treated as string: no client available to fetch {} metadata",
                    key, self.entity
                );
                tracing::warn!(entity = %self.entity, field = %key, "{}", message);
                warnings.push(message);
                Ok((FieldKind::String, Placement::Custom))
            }
        }
    }
}

fn group_collision(group: &str) -> KeelError {
    KeelError::validation(format!(
        "Field '{}' cannot be combined with fields nested under '{}'",
        group, group
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UdfDefinitions;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct StaticSource(UdfDefinitions);

    impl MetadataSource for StaticSource {
        async fn fetch_udf_metadata(&self, _entity: EntityType) -> Result<UdfDefinitions, KeelError> {
            Ok(self.0.clone())
        }
    }

    fn desired(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("desired state must be an object"),
        }
    }

    async fn build_offline(entity: EntityType, value: Value) -> Result<Option<ConstructedPayload>, KeelError> {
        let mut cache = UdfMetadataCache::new();
        PayloadBuilder::offline(entity, &mut cache)
            .build(Some(&desired(value)))
            .await
    }

    #[tokio::test]
    async fn test_request_payload_shapes() {
        let payload = build_offline(
            EntityType::Request,
            json!({
                "subject": "Server down",
                "priority": "High",
                "requester": "admin@example.com"
            }),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(
            payload.to_wire(),
            json!({
                "request": {
                    "subject": "Server down",
                    "priority": {"name": "High"},
                    "requester": {"email_id": "admin@example.com"}
                }
            })
        );
        assert!(payload.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_grouped_fields_nest_under_group() {
        let payload = build_offline(
            EntityType::Problem,
            json!({"is_known_error": "true", "known_error_comments": "flapping NIC"}),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(
            payload.to_wire(),
            json!({
                "problem": {
                    "known_error_details": {
                        "is_known_error": true,
                        "known_error_comments": "flapping NIC"
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_empty_or_absent_desired_state() {
        let mut cache = UdfMetadataCache::new();
        let none = PayloadBuilder::offline(EntityType::Request, &mut cache)
            .build(None)
            .await
            .unwrap();
        assert!(none.is_none());

        let empty = build_offline(EntityType::Request, json!({})).await.unwrap();
        assert!(empty.is_none());
    }

    #[tokio::test]
    async fn test_unknown_field_lists_allowed_names() {
        let err = build_offline(EntityType::Request, json!({"subjct": "typo"}))
            .await
            .unwrap_err();
        match &err {
            KeelError::UnknownField { field, allowed } => {
                assert_eq!(field, "subjct");
                assert!(allowed.contains(&"subject".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("Invalid field 'subjct'."));
    }

    #[tokio::test]
    async fn test_unverified_custom_field_falls_back_to_string() {
        let payload = build_offline(EntityType::Request, json!({"udf_char1": "Rack 4"}))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            payload.to_wire(),
            json!({"request": {"udf_fields": {"udf_char1": "Rack 4"}}})
        );
        assert_eq!(payload.warnings.len(), 1);
        assert!(payload.warnings[0].contains("udf_char1"));
    }

    #[tokio::test]
    async fn test_custom_field_kind_from_metadata() {
        let source = StaticSource(
            serde_json::from_value(json!({
                "udf_long1": {"type": "integer"},
                "udf_pick1": {"type": "lookup", "lookup_entity": "user"}
            }))
            .unwrap(),
        );
        let mut cache = UdfMetadataCache::new();
        let payload = PayloadBuilder::new(EntityType::Change, &source, &mut cache)
            .build(Some(&desired(json!({
                "title": "Patch",
                "udf_long1": "12",
                "udf_pick1": "ops@example.com"
            }))))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            payload.to_wire(),
            json!({
                "change": {
                    "title": "Patch",
                    "udf_fields": {
                        "udf_long1": 12,
                        "udf_pick1": {"email_id": "ops@example.com"}
                    }
                }
            })
        );
        assert!(payload.warnings.is_empty());
        assert!(cache.contains(EntityType::Change));
    }

    #[tokio::test]
    async fn test_custom_field_missing_from_metadata() {
        let source = StaticSource(UdfDefinitions::new());
        let mut cache = UdfMetadataCache::new();
        let err = PayloadBuilder::new(EntityType::Request, &source, &mut cache)
            .build(Some(&desired(json!({"udf_char7": "x"}))))
            .await
            .unwrap_err();
        assert!(matches!(err, KeelError::UnknownUdf { .. }));
    }

    #[tokio::test]
    async fn test_invalid_value_fails_whole_payload() {
        let err = build_offline(
            EntityType::Request,
            json!({"subject": "ok", "requester": "Administrator"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, KeelError::InvalidValue { ref field, .. } if field == "requester"));
    }

    #[tokio::test]
    async fn test_group_name_collision_is_rejected() {
        let err = build_offline(
            EntityType::Problem,
            json!({"impact_details": "summary", "impact_details_description": "long form"}),
        )
        .await
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_no_udf_container_without_custom_fields() {
        let payload = build_offline(EntityType::Release, json!({"title": "R1"}))
            .await
            .unwrap()
            .unwrap();
        assert!(!payload.fields.contains_key(UDF_CONTAINER));
    }
}
