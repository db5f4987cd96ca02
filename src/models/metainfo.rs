//! Documents returned by the `_metainfo` endpoint.
//!
//! Only the custom-field (UDF) definitions are read:
//! `metainfo.fields.udf_fields.fields`. Some portals omit the outer
//! `metainfo` wrapper, so `fields` is also accepted at the top level.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Custom-field definitions keyed by field name.
pub type UdfDefinitions = HashMap<String, UdfDefinition>;

/// One custom-field definition from the remote schema.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct UdfDefinition {
    /// Remote-declared kind (`lookup`, `boolean`, `integer`, `date`, ...).
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,

    /// For lookups, the entity the field points at. Sent as a bare
    /// name or as an object carrying `name`.
    #[serde(default)]
    pub lookup_entity: Option<Value>,

    /// Label shown in the SDP UI.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UdfDefinition {
    /// Name of the lookup target entity, if any.
    pub fn lookup_entity_name(&self) -> Option<&str> {
        match self.lookup_entity.as_ref()? {
            Value::String(s) => Some(s),
            Value::Object(o) => o.get("name").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Response of `GET <endpoint>/_metainfo`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetainfoResponse {
    #[serde(default)]
    metainfo: Option<MetaDocument>,

    #[serde(default)]
    fields: Option<MetaFields>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct MetaDocument {
    #[serde(default)]
    fields: Option<MetaFields>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct MetaFields {
    #[serde(default)]
    udf_fields: Option<UdfContainer>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct UdfContainer {
    #[serde(default)]
    fields: UdfDefinitions,
}

impl MetainfoResponse {
    /// Extracts the custom-field definitions. Missing levels yield an empty set.
    pub fn into_udf_definitions(self) -> UdfDefinitions {
        self.metainfo
            .and_then(|m| m.fields)
            .or(self.fields)
            .and_then(|f| f.udf_fields)
            .map(|u| u.fields)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wrapped_metainfo() {
        let doc = json!({
            "metainfo": {
                "fields": {
                    "udf_fields": {
                        "fields": {
                            "udf_char1": {"type": "string", "display_name": "Asset tag"},
                            "udf_pick1": {"type": "lookup", "lookup_entity": "technician"}
                        }
                    }
                }
            },
            "response_status": {"status_code": 2000}
        });
        let parsed: MetainfoResponse = serde_json::from_value(doc).unwrap();
        let defs = parsed.into_udf_definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs["udf_char1"].display_name.as_deref(), Some("Asset tag"));
        assert_eq!(defs["udf_pick1"].lookup_entity_name(), Some("technician"));
    }

    #[test]
    fn test_parse_unwrapped_metainfo() {
        let doc = json!({"fields": {"udf_fields": {"fields": {"udf_long1": {"type": "integer"}}}}});
        let parsed: MetainfoResponse = serde_json::from_value(doc).unwrap();
        let defs = parsed.into_udf_definitions();
        assert_eq!(defs["udf_long1"].field_type.as_deref(), Some("integer"));
    }

    #[test]
    fn test_lookup_entity_as_object() {
        let def: UdfDefinition = serde_json::from_value(json!({
            "type": "lookup",
            "lookup_entity": {"name": "user", "id": "9"}
        }))
        .unwrap();
        assert_eq!(def.lookup_entity_name(), Some("user"));
    }

    #[test]
    fn test_missing_udf_section_is_empty() {
        let parsed: MetainfoResponse =
            serde_json::from_value(json!({"metainfo": {"fields": {}}})).unwrap();
        assert!(parsed.into_udf_definitions().is_empty());
    }
}
