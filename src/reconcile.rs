//! Convergence of a remote record towards a desired state.
//!
//! A [`Reconciler`] runs one linear sequence per call: build the payload
//! (fetching custom-field metadata if needed), fetch the current record
//! when updating or deleting, compare, and send the mutating call only
//! when the record does not already match.
//!
//! The raw record operations at the bottom of this module ([`read_records`],
//! [`write_record`], [`delete_record`]) skip catalog validation and work on
//! child records as well.

use std::future::Future;

use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::catalog::EntityType;
use crate::diff::has_differences;
use crate::endpoint::Endpoint;
use crate::error::KeelError;
use crate::models::ListInfo;
use crate::payload::{ConstructedPayload, PayloadBuilder};
use crate::transform::is_truthy;
use crate::udf::{MetadataSource, UdfMetadataCache};

/// Remote storage of entity records.
pub trait RecordStore: MetadataSource + Sync {
    /// Fetches one record, or `None` if it does not exist.
    fn fetch_record(
        &self,
        entity: EntityType,
        id: &str,
    ) -> impl Future<Output = Result<Option<Value>, KeelError>> + Send;

    /// Sends `payload` to `endpoint` and returns the response document.
    fn send(
        &self,
        method: Method,
        endpoint: &Endpoint,
        payload: Option<&Value>,
    ) -> impl Future<Output = Result<Value, KeelError>> + Send;
}

/// Whether the record should exist after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordState {
    /// Create or update the record.
    #[default]
    Present,
    /// Delete the record.
    Absent,
}

/// Behaviour switches for a reconciliation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Stop before the mutating call and report what would change.
    pub check_mode: bool,
    /// Attach a before/after view of the record.
    pub diff: bool,
}

/// Before and after views of a reconciled record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDiff {
    /// The record as fetched, or `{}` when none existed.
    pub before: Value,
    /// The record as sent or returned, or `{}` after a delete.
    pub after: Value,
}

/// Result of one reconciliation or raw record operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcome {
    /// Whether a mutating call was (or, in check mode, would be) made.
    pub changed: bool,
    /// Identifier of the affected record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The record under the entity root key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,
    /// Raw response document of the mutating call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// Human-readable summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Before/after view, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<RecordDiff>,
    /// Non-fatal notices.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Drives records of any entity type towards a desired state.
///
/// Owns the custom-field metadata cache for its session, so metadata is
/// fetched at most once per entity type for the reconciler's lifetime.
pub struct Reconciler<'a, S: RecordStore> {
    store: &'a S,
    cache: UdfMetadataCache,
    options: ReconcileOptions,
}

impl<'a, S: RecordStore> Reconciler<'a, S> {
    /// Creates a reconciler with an empty metadata cache.
    pub fn new(store: &'a S, options: ReconcileOptions) -> Self {
        Self {
            store,
            cache: UdfMetadataCache::new(),
            options,
        }
    }

    /// Converges record `id` of `entity` (or a new record when `id` is
    /// `None`) to `desired` and `state`.
    ///
    /// # Errors
    ///
    /// Validation errors are returned before any network call. Transport
    /// and API errors from the store are returned as is.
    pub async fn reconcile(
        &mut self,
        entity: EntityType,
        id: Option<&str>,
        desired: Option<&Map<String, Value>>,
        state: RecordState,
    ) -> Result<Outcome, KeelError> {
        tracing::debug!(entity = %entity, id = ?id, state = ?state, "Reconciling record");
        match state {
            RecordState::Present => self.ensure_present(entity, id, desired).await,
            RecordState::Absent => self.ensure_absent(entity, id).await,
        }
    }

    async fn ensure_present(
        &mut self,
        entity: EntityType,
        id: Option<&str>,
        desired: Option<&Map<String, Value>>,
    ) -> Result<Outcome, KeelError> {
        let descriptor = entity.descriptor();
        let root = entity.root_key();

        let endpoint = match id {
            Some(id) => Endpoint::record(entity, id)?,
            None => {
                let mandatory = descriptor.mandatory_field;
                if !desired
                    .and_then(|d| d.get(mandatory))
                    .is_some_and(is_truthy)
                {
                    return Err(KeelError::validation(format!(
                        "'{}' is required when creating a new {}.",
                        mandatory, entity
                    )));
                }
                Endpoint::collection(entity)
            }
        };

        let payload = PayloadBuilder::new(entity, self.store, &mut self.cache)
            .build(desired)
            .await?;
        let warnings = payload
            .as_ref()
            .map(|p| p.warnings.clone())
            .unwrap_or_default();

        let current = match id {
            Some(id) => self.store.fetch_record(entity, id).await?,
            None => None,
        };

        let Some(payload) = payload else {
            // Only reachable for updates: creates require the mandatory field.
            let id = id.unwrap_or_default();
            let record = current.ok_or_else(|| KeelError::not_found(id))?;
            return Ok(Outcome {
                changed: false,
                id: Some(id.to_string()),
                response: Some(json!({ root: record })),
                record: Some(record),
                message: Some("No fields to update.".to_string()),
                warnings,
                ..Outcome::default()
            });
        };
        let wire = payload.to_wire();

        if let (Some(id), Some(record)) = (id, current.as_ref()) {
            if !has_differences(Some(&wire), Some(record), root) {
                tracing::info!(entity = %entity, id = %id, "Record already matches desired state");
                return Ok(Outcome {
                    changed: false,
                    id: Some(id.to_string()),
                    record: Some(record.clone()),
                    response: Some(json!({ root: record })),
                    warnings,
                    ..Outcome::default()
                });
            }
        }

        let (method, verb) = if id.is_some() {
            (Method::PUT, "update")
        } else {
            (Method::POST, "create")
        };

        if self.options.check_mode {
            return Ok(Outcome {
                changed: true,
                id: id.map(str::to_string),
                message: Some(format!("Would {} a {} record.", verb, entity)),
                diff: self.diff(current.as_ref(), || Value::Object(payload.fields.clone())),
                warnings,
                ..Outcome::default()
            });
        }

        let response = self.store.send(method, &endpoint, Some(&wire)).await?;
        let record = response.get(root).cloned().unwrap_or_else(|| json!({}));
        let record_id = record_id(&record).or_else(|| id.map(str::to_string));
        tracing::info!(entity = %entity, id = ?record_id, "Record {}d", verb);

        Ok(Outcome {
            changed: true,
            id: record_id,
            diff: self.diff(current.as_ref(), || record.clone()),
            record: Some(record),
            response: Some(response),
            warnings,
            ..Outcome::default()
        })
    }

    async fn ensure_absent(
        &mut self,
        entity: EntityType,
        id: Option<&str>,
    ) -> Result<Outcome, KeelError> {
        let id_param = entity.descriptor().id_param;
        let id = id.ok_or_else(|| {
            KeelError::validation(format!("'{}' is required to delete a {}.", id_param, entity))
        })?;
        let endpoint = Endpoint::record(entity, id)?;

        let Some(current) = self.store.fetch_record(entity, id).await? else {
            return Ok(Outcome {
                changed: false,
                message: Some("Record does not exist, nothing to delete.".to_string()),
                ..Outcome::default()
            });
        };

        if self.options.check_mode {
            return Ok(Outcome {
                changed: true,
                id: Some(id.to_string()),
                message: Some(format!("Would delete {} record with id {}.", entity, id)),
                diff: self.diff(Some(&current), || json!({})),
                ..Outcome::default()
            });
        }

        let response = self.store.send(Method::DELETE, &endpoint, None).await?;
        tracing::info!(entity = %entity, id = %id, "Record deleted");

        Ok(Outcome {
            changed: true,
            id: Some(id.to_string()),
            response: Some(response),
            diff: self.diff(Some(&current), || json!({})),
            ..Outcome::default()
        })
    }

    fn diff(&self, before: Option<&Value>, after: impl FnOnce() -> Value) -> Option<RecordDiff> {
        self.options.diff.then(|| RecordDiff {
            before: before.cloned().unwrap_or_else(|| json!({})),
            after: after(),
        })
    }
}

/// Builds the wire payload for `desired` without metadata access.
///
/// Custom fields resolve as strings with a warning.
///
/// # Errors
///
/// Same as [`PayloadBuilder::build`].
pub async fn preview_payload(
    entity: EntityType,
    desired: &Map<String, Value>,
) -> Result<Option<ConstructedPayload>, KeelError> {
    let mut cache = UdfMetadataCache::new();
    PayloadBuilder::offline(entity, &mut cache)
        .build(Some(desired))
        .await
}

/// Records returned by a read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadOutcome {
    /// One record (object) or a page of records (array).
    pub records: Value,
    /// Pagination details from list responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_info: Option<Value>,
}

/// Reads one record or a page of records at `endpoint`.
///
/// `options` are validated as list options and only apply to entity
/// collections; they are ignored once a record id is part of the path.
///
/// # Errors
///
/// Returns a validation error for bad list options, or the store's error.
pub async fn read_records<S: RecordStore>(
    store: &S,
    endpoint: &Endpoint,
    options: Option<&Map<String, Value>>,
) -> Result<ReadOutcome, KeelError> {
    let input = match (endpoint.parent_id(), options) {
        (None, Some(options)) if !options.is_empty() => {
            Some(ListInfo::from_options(endpoint.entity(), options)?.to_input_data())
        }
        _ => None,
    };

    let response = store.send(Method::GET, endpoint, input.as_ref()).await?;

    if endpoint.is_single_record() {
        return Ok(ReadOutcome {
            records: response.get(endpoint.root_key()).cloned().unwrap_or(Value::Null),
            list_info: None,
        });
    }

    Ok(ReadOutcome {
        records: response
            .get(endpoint.list_key())
            .cloned()
            .unwrap_or_else(|| json!([])),
        list_info: response.get("list_info").cloned(),
    })
}

/// Sends a raw payload to `endpoint`, creating or updating a record.
///
/// Updates (PUT) target a single record; anything else is a create (POST).
/// The payload is wrapped under the endpoint's root key unchanged.
///
/// # Errors
///
/// Returns the store's error.
pub async fn write_record<S: RecordStore>(
    store: &S,
    endpoint: &Endpoint,
    payload: Option<&Map<String, Value>>,
) -> Result<Outcome, KeelError> {
    let method = if endpoint.is_single_record() {
        Method::PUT
    } else {
        Method::POST
    };
    let wire = payload
        .filter(|p| !p.is_empty())
        .map(|p| json!({ endpoint.root_key(): p }));

    let response = store.send(method, endpoint, wire.as_ref()).await?;
    let record = response.get(endpoint.root_key()).cloned();

    Ok(Outcome {
        changed: true,
        id: record.as_ref().and_then(record_id),
        record,
        response: Some(response),
        ..Outcome::default()
    })
}

/// Deletes the record at `endpoint`.
///
/// # Errors
///
/// Returns `KeelError::Validation` unless `endpoint` addresses a single
/// record, or the store's error.
pub async fn delete_record<S: RecordStore>(
    store: &S,
    endpoint: &Endpoint,
) -> Result<Outcome, KeelError> {
    if !endpoint.is_single_record() {
        let missing = if endpoint.child().is_some() {
            "child_id is required when deleting a child record."
        } else {
            "parent_id is required to delete a record."
        };
        return Err(KeelError::validation(missing));
    }

    let response = store.send(Method::DELETE, endpoint, None).await?;
    tracing::info!(endpoint = %endpoint, "Record deleted");

    Ok(Outcome {
        changed: true,
        id: endpoint.child_id().or(endpoint.parent_id()).map(str::to_string),
        response: Some(response),
        ..Outcome::default()
    })
}

/// SDP returns ids as strings, occasionally as numbers.
fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
