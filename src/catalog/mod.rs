//! Field catalog for the manageable SDP entity types.
//!
//! Each entity type has an immutable descriptor: its endpoint, identifier
//! parameter, mandatory-on-create field, sortable fields, and the table of
//! system fields with their declared kind and optional group. Lookups are
//! exact, case-sensitive matches.

mod change;
mod problem;
mod release;
mod request;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::Serialize;

use crate::error::KeelError;

/// Declared kind of a field, selecting how a raw value is converted to wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text, passed through unchanged.
    String,
    /// Integer or decimal.
    Number,
    /// True/false flag.
    Boolean,
    /// Epoch timestamp, wrapped as `{value: ..}`.
    DateTime,
    /// Reference by display name, wrapped as `{name: ..}`.
    Lookup,
    /// Person reference by email, wrapped as `{email_id: ..}`.
    User,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Lookup => "lookup",
            FieldKind::User => "user",
        };
        f.write_str(name)
    }
}

/// A system field's declared kind and the sub-object it nests under, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    /// How values for this field are transformed.
    pub kind: FieldKind,
    /// Wire sub-object this field is placed in (e.g. `close_details`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<&'static str>,
}

impl FieldDescriptor {
    /// A top-level field.
    pub const fn plain(kind: FieldKind) -> Self {
        Self { kind, group: None }
    }

    /// A field nested one level under `group`.
    pub const fn grouped(kind: FieldKind, group: &'static str) -> Self {
        Self {
            kind,
            group: Some(group),
        }
    }
}

/// The resource kinds Keel can manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Service requests / incidents.
    Request,
    /// Problems.
    Problem,
    /// Changes.
    Change,
    /// Releases.
    Release,
}

impl EntityType {
    /// All entity types, in declaration order.
    pub const ALL: [EntityType; 4] = [
        EntityType::Request,
        EntityType::Problem,
        EntityType::Change,
        EntityType::Release,
    ];

    /// Singular name, also the root key of the wire payload.
    pub fn root_key(self) -> &'static str {
        match self {
            EntityType::Request => "request",
            EntityType::Problem => "problem",
            EntityType::Change => "change",
            EntityType::Release => "release",
        }
    }

    /// Static descriptor for this entity type.
    pub fn descriptor(self) -> &'static EntityDescriptor {
        match self {
            EntityType::Request => &request::DESCRIPTOR,
            EntityType::Problem => &problem::DESCRIPTOR,
            EntityType::Change => &change::DESCRIPTOR,
            EntityType::Release => &release::DESCRIPTOR,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_key())
    }
}

impl FromStr for EntityType {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|e| e.root_key() == s)
            .ok_or_else(|| {
                KeelError::validation(format!(
                    "Invalid entity type '{}'. Supported: request, problem, change, release",
                    s
                ))
            })
    }
}

/// Immutable description of one entity type.
#[derive(Debug)]
pub struct EntityDescriptor {
    /// The entity type described.
    pub entity: EntityType,
    /// Plural endpoint name (e.g. `requests`).
    pub endpoint: &'static str,
    /// Name of the identifier parameter (e.g. `request_id`).
    pub id_param: &'static str,
    /// Field that must be set when creating a record.
    pub mandatory_field: &'static str,
    /// Fields the server accepts as `sort_field`, in order.
    pub sortable_fields: &'static [&'static str],
    /// System fields, in catalog order.
    pub fields: &'static [(&'static str, FieldDescriptor)],
}

impl EntityDescriptor {
    /// Names of all system fields, in catalog order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.to_string()).collect()
    }
}

static FIELD_INDEX: LazyLock<HashMap<EntityType, HashMap<&'static str, FieldDescriptor>>> =
    LazyLock::new(|| {
        EntityType::ALL
            .into_iter()
            .map(|entity| {
                let fields = entity.descriptor().fields.iter().copied().collect();
                (entity, fields)
            })
            .collect()
    });

/// Looks up a system field by exact name.
pub fn lookup(entity: EntityType, field_name: &str) -> Option<FieldDescriptor> {
    FIELD_INDEX
        .get(&entity)
        .and_then(|fields| fields.get(field_name))
        .copied()
}

/// Sub-resources that hang off every entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildModule {
    /// Notes.
    Note,
    /// Worklogs.
    Worklog,
    /// Tasks.
    Task,
}

impl ChildModule {
    /// All child modules, in declaration order.
    pub const ALL: [ChildModule; 3] = [ChildModule::Note, ChildModule::Worklog, ChildModule::Task];

    /// Singular name, also the root key of a child payload.
    pub fn root_key(self) -> &'static str {
        match self {
            ChildModule::Note => "note",
            ChildModule::Worklog => "worklog",
            ChildModule::Task => "task",
        }
    }

    /// Plural endpoint segment.
    pub fn endpoint(self) -> &'static str {
        match self {
            ChildModule::Note => "notes",
            ChildModule::Worklog => "worklogs",
            ChildModule::Task => "tasks",
        }
    }
}

impl fmt::Display for ChildModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_key())
    }
}

impl FromStr for ChildModule {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChildModule::ALL
            .into_iter()
            .find(|c| c.root_key() == s)
            .ok_or_else(|| {
                KeelError::validation(format!(
                    "Unsupported child module '{}'. Supported children: note, worklog, task",
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_system_fields() {
        let subject = lookup(EntityType::Request, "subject").unwrap();
        assert_eq!(subject.kind, FieldKind::String);
        assert_eq!(subject.group, None);

        assert_eq!(
            lookup(EntityType::Request, "priority").unwrap().kind,
            FieldKind::Lookup
        );
        assert_eq!(
            lookup(EntityType::Request, "requester").unwrap().kind,
            FieldKind::User
        );
        assert_eq!(
            lookup(EntityType::Request, "due_by_time").unwrap().kind,
            FieldKind::DateTime
        );
    }

    #[test]
    fn test_lookup_grouped_field() {
        let field = lookup(EntityType::Problem, "is_known_error").unwrap();
        assert_eq!(field.kind, FieldKind::Boolean);
        assert_eq!(field.group, Some("known_error_details"));

        let field = lookup(EntityType::Change, "back_out_plan_description").unwrap();
        assert_eq!(field.group, Some("back_out_plan"));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(lookup(EntityType::Request, "Subject").is_none());
        assert!(lookup(EntityType::Request, "subject ").is_none());
    }

    #[test]
    fn test_lookup_is_per_entity() {
        assert!(lookup(EntityType::Request, "title").is_none());
        assert!(lookup(EntityType::Problem, "title").is_some());
        assert!(lookup(EntityType::Release, "release_engineer").is_some());
        assert!(lookup(EntityType::Change, "release_engineer").is_none());
    }

    #[test]
    fn test_mandatory_field_is_in_catalog() {
        for entity in EntityType::ALL {
            let descriptor = entity.descriptor();
            assert_eq!(descriptor.entity, entity);
            assert!(lookup(entity, descriptor.mandatory_field).is_some());
        }
    }

    #[test]
    fn test_catalog_names_are_unique() {
        for entity in EntityType::ALL {
            let descriptor = entity.descriptor();
            assert_eq!(
                FIELD_INDEX[&entity].len(),
                descriptor.fields.len(),
                "duplicate field in {} catalog",
                entity
            );
        }
    }

    #[test]
    fn test_entity_type_round_trip() {
        for entity in EntityType::ALL {
            assert_eq!(entity.root_key().parse::<EntityType>().unwrap(), entity);
        }
        assert!("incident".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_child_module_parse() {
        assert_eq!("note".parse::<ChildModule>().unwrap(), ChildModule::Note);
        assert_eq!(ChildModule::Worklog.endpoint(), "worklogs");
        let err = "attachment".parse::<ChildModule>().unwrap_err();
        assert!(err.to_string().contains("attachment"));
    }

    #[test]
    fn test_field_names_preserve_catalog_order() {
        let names = EntityType::Request.descriptor().field_names();
        assert_eq!(names[0], "subject");
        assert_eq!(names[1], "description");
    }
}
