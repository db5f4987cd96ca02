//! Custom-field (UDF) classification.
//!
//! A field name that is not in the catalog is accepted as a custom field
//! when it carries one of the portal's UDF prefixes. Its kind comes from
//! the entity's `_metainfo` document, fetched at most once per entity
//! type and held in a [`UdfMetadataCache`] owned by the caller.

use std::collections::HashMap;
use std::future::Future;

use crate::catalog::{EntityType, FieldKind};
use crate::error::KeelError;
use crate::models::{UdfDefinition, UdfDefinitions};

/// Name prefixes that mark a field as a custom field.
pub const UDF_PREFIXES: [&str; 10] = [
    "udf_char",
    "udf_bool",
    "udf_long",
    "udf_double",
    "txt_",
    "num_",
    "date_",
    "dt_",
    "bool_",
    "dbl_",
];

/// Wire key of the container that holds custom-field values.
pub const UDF_CONTAINER: &str = "udf_fields";

/// Returns true if `name` follows a custom-field naming convention.
pub fn is_custom_field(name: &str) -> bool {
    let lowered = name.to_lowercase();
    UDF_PREFIXES.iter().any(|p| lowered.starts_with(p))
}

/// Maps a remote custom-field definition onto a transform kind.
pub fn resolve_udf_kind(definition: &UdfDefinition) -> FieldKind {
    let declared = definition
        .field_type
        .as_deref()
        .unwrap_or("string")
        .to_lowercase();

    match declared.as_str() {
        "lookup" => match definition.lookup_entity_name() {
            Some(target) if is_person_entity(target) => FieldKind::User,
            _ => FieldKind::Lookup,
        },
        "boolean" => FieldKind::Boolean,
        "integer" | "decimal" | "double" => FieldKind::Number,
        "date" | "datetime" => FieldKind::DateTime,
        _ => FieldKind::String,
    }
}

fn is_person_entity(name: &str) -> bool {
    name.eq_ignore_ascii_case("user") || name.eq_ignore_ascii_case("technician")
}

/// Supplier of custom-field definitions for an entity type.
pub trait MetadataSource {
    /// Fetches all custom-field definitions of `entity`.
    fn fetch_udf_metadata(
        &self,
        entity: EntityType,
    ) -> impl Future<Output = Result<UdfDefinitions, KeelError>> + Send;
}

/// A metadata source that cannot exist, for builders running without a client.
#[derive(Debug, Clone, Copy)]
pub enum NoMetadata {}

impl MetadataSource for NoMetadata {
    async fn fetch_udf_metadata(&self, _entity: EntityType) -> Result<UdfDefinitions, KeelError> {
        match *self {}
    }
}

/// Resolution result for a custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdfType {
    /// Kind confirmed by the remote schema.
    Known(FieldKind),
    /// No metadata source was available; the caller decides the fallback.
    Unverified,
}

/// Per-session memo of custom-field definitions, keyed by entity type.
///
/// Keys inside each entity's map are lowercased so lookups ignore case.
/// There is no invalidation: a cache lives for one reconciliation.
#[derive(Debug, Default)]
pub struct UdfMetadataCache {
    entries: HashMap<EntityType, UdfDefinitions>,
}

impl UdfMetadataCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if definitions for `entity` are already loaded.
    pub fn contains(&self, entity: EntityType) -> bool {
        self.entries.contains_key(&entity)
    }

    /// Seeds the cache with definitions obtained elsewhere.
    pub fn insert(&mut self, entity: EntityType, definitions: UdfDefinitions) {
        let normalized = definitions
            .into_iter()
            .map(|(name, def)| (name.to_lowercase(), def))
            .collect();
        self.entries.insert(entity, normalized);
    }

    /// Resolves the kind of custom field `field` on `entity`.
    ///
    /// With no `source`, returns [`UdfType::Unverified`] without touching
    /// the cache. Otherwise the entity's definitions are fetched on first
    /// use and reused afterwards.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::UnknownUdf` if the loaded definitions do not
    /// contain `field`. A failed metadata fetch is returned as is.
    pub async fn resolve<S>(
        &mut self,
        entity: EntityType,
        field: &str,
        source: Option<&S>,
    ) -> Result<UdfType, KeelError>
    where
        S: MetadataSource + ?Sized,
    {
        let Some(source) = source else {
            return Ok(UdfType::Unverified);
        };

        if !self.contains(entity) {
            tracing::debug!(entity = %entity, "Fetching custom field metadata");
            let definitions = source.fetch_udf_metadata(entity).await?;
            tracing::debug!(
                entity = %entity,
                count = definitions.len(),
                "Cached custom field metadata"
            );
            self.insert(entity, definitions);
        }

        self.entries
            .get(&entity)
            .and_then(|defs| defs.get(&field.to_lowercase()))
            .map(|def| UdfType::Known(resolve_udf_kind(def)))
            .ok_or_else(|| KeelError::UnknownUdf {
                field: field.to_string(),
                entity: entity.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        definitions: UdfDefinitions,
    }

    impl CountingSource {
        fn new(definitions: serde_json::Value) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                definitions: serde_json::from_value(definitions).unwrap(),
            }
        }
    }

    impl MetadataSource for CountingSource {
        async fn fetch_udf_metadata(&self, _entity: EntityType) -> Result<UdfDefinitions, KeelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.definitions.clone())
        }
    }

    struct FailingSource;

    impl MetadataSource for FailingSource {
        async fn fetch_udf_metadata(&self, _entity: EntityType) -> Result<UdfDefinitions, KeelError> {
            Err(KeelError::Authentication)
        }
    }

    fn definition(value: serde_json::Value) -> UdfDefinition {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_is_custom_field_prefixes() {
        assert!(is_custom_field("udf_char1"));
        assert!(is_custom_field("UDF_LONG3"));
        assert!(is_custom_field("txt_location"));
        assert!(is_custom_field("dt_go_live"));
        assert!(!is_custom_field("subject"));
        assert!(!is_custom_field("udf"));
        assert!(!is_custom_field("my_udf_char1"));
    }

    #[test]
    fn test_resolve_udf_kind_mapping() {
        let kind = |v| resolve_udf_kind(&definition(v));
        assert_eq!(kind(json!({"type": "lookup", "lookup_entity": "user"})), FieldKind::User);
        assert_eq!(
            kind(json!({"type": "lookup", "lookup_entity": {"name": "technician"}})),
            FieldKind::User
        );
        assert_eq!(kind(json!({"type": "lookup", "lookup_entity": "site"})), FieldKind::Lookup);
        assert_eq!(kind(json!({"type": "lookup"})), FieldKind::Lookup);
        assert_eq!(kind(json!({"type": "boolean"})), FieldKind::Boolean);
        assert_eq!(kind(json!({"type": "integer"})), FieldKind::Number);
        assert_eq!(kind(json!({"type": "Decimal"})), FieldKind::Number);
        assert_eq!(kind(json!({"type": "double"})), FieldKind::Number);
        assert_eq!(kind(json!({"type": "date"})), FieldKind::DateTime);
        assert_eq!(kind(json!({"type": "datetime"})), FieldKind::DateTime);
        assert_eq!(kind(json!({"type": "picklist"})), FieldKind::String);
        assert_eq!(kind(json!({})), FieldKind::String);
    }

    #[tokio::test]
    async fn test_resolve_without_source_is_unverified() {
        let mut cache = UdfMetadataCache::new();
        let kind = cache
            .resolve::<NoMetadata>(EntityType::Request, "udf_char1", None)
            .await
            .unwrap();
        assert_eq!(kind, UdfType::Unverified);
        assert!(!cache.contains(EntityType::Request));
    }

    #[tokio::test]
    async fn test_resolve_fetches_once_per_entity() {
        let source = CountingSource::new(json!({
            "udf_char1": {"type": "string"},
            "udf_long1": {"type": "integer"}
        }));
        let mut cache = UdfMetadataCache::new();

        let first = cache
            .resolve(EntityType::Request, "udf_char1", Some(&source))
            .await
            .unwrap();
        let second = cache
            .resolve(EntityType::Request, "UDF_LONG1", Some(&source))
            .await
            .unwrap();

        assert_eq!(first, UdfType::Known(FieldKind::String));
        assert_eq!(second, UdfType::Known(FieldKind::Number));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        cache
            .resolve(EntityType::Problem, "udf_char1", Some(&source))
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_unknown_udf_is_fatal() {
        let source = CountingSource::new(json!({"udf_char1": {"type": "string"}}));
        let mut cache = UdfMetadataCache::new();
        let err = cache
            .resolve(EntityType::Change, "udf_char9", Some(&source))
            .await
            .unwrap_err();
        assert!(matches!(err, KeelError::UnknownUdf { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid UDF field 'udf_char9'. Field not found in change metadata."
        );
    }

    #[tokio::test]
    async fn test_resolve_fetch_error_propagates() {
        let mut cache = UdfMetadataCache::new();
        let err = cache
            .resolve(EntityType::Request, "udf_char1", Some(&FailingSource))
            .await
            .unwrap_err();
        assert!(matches!(err, KeelError::Authentication));
        assert!(!cache.contains(EntityType::Request));
    }

    #[tokio::test]
    async fn test_seeded_cache_skips_fetch() {
        let source = CountingSource::new(json!({}));
        let mut cache = UdfMetadataCache::new();
        cache.insert(
            EntityType::Release,
            serde_json::from_value(json!({"Bool_Ready": {"type": "boolean"}})).unwrap(),
        );
        let kind = cache
            .resolve(EntityType::Release, "bool_ready", Some(&source))
            .await
            .unwrap();
        assert_eq!(kind, UdfType::Known(FieldKind::Boolean));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
