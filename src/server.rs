//! MCP server implementation for Keel.
//!
//! This module defines the `KeelServer` struct that implements the MCP
//! `ServerHandler` trait, exposing record reconciliation and raw record
//! operations as tools.

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::catalog::{ChildModule, EntityType};
use crate::error::KeelError;
use crate::reconcile::{self, Reconciler};
use crate::sdp_client::SdpClient;
use crate::tools::{
    DeleteRecordInput, DescribeFieldsInput, GetRecordsInput, ManageRecordInput, WriteRecordInput,
};
use crate::udf::{UDF_CONTAINER, UDF_PREFIXES};

/// The Keel MCP server.
///
/// Every tool call that reconciles a record gets its own custom-field
/// metadata cache, so metadata is fetched at most once per call.
#[derive(Clone)]
pub struct KeelServer {
    /// SDP client for API operations.
    sdp_client: SdpClient,
    /// Tool router for MCP tool dispatch.
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl KeelServer {
    /// Creates a new Keel server instance.
    pub fn new(sdp_client: SdpClient) -> Self {
        Self {
            sdp_client,
            tool_router: Self::tool_router(),
        }
    }

    /// Returns "pong" so clients can check the server is up.
    #[tool(description = "Test connectivity to the Keel MCP server. Returns 'pong' if the server is running correctly.")]
    fn ping(&self) -> String {
        tracing::debug!("ping tool called");
        "pong".to_string()
    }

    #[tool(description = "Describe the system fields of an entity type (request, problem, change, release): field kinds, nesting groups, the mandatory field on create, sortable fields and child modules.")]
    fn describe_fields(
        &self,
        Parameters(input): Parameters<DescribeFieldsInput>,
    ) -> Result<String, String> {
        let entity = input.entity_type().map_err(|e| e.to_string())?;
        tracing::debug!(entity = %entity, "describe_fields tool called");
        to_text(&describe_entity(entity))
    }

    /// Converges one record towards the desired state.
    ///
    /// Idempotent: when the record already matches, nothing is sent.
    #[tool(description = "Ensure a request, problem, change or release record is present with the given field values, or absent. Only sends a change when the record differs. Omit id to create. Custom fields (udf_*) are typed from the server's field metadata. Supports check_mode (dry run) and diff.")]
    async fn manage_record(
        &self,
        Parameters(input): Parameters<ManageRecordInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(entity = %input.entity, id = ?input.id, "manage_record tool called");

        let entity = input.entity_type().map_err(|e| e.to_string())?;
        let state = input.state.unwrap_or_default().into();
        let mut reconciler = Reconciler::new(&self.sdp_client, input.options());

        let outcome = reconciler
            .reconcile(entity, input.id.as_deref(), input.fields.as_ref(), state)
            .await
            .map_err(|e| self.report(&e, &format!("Failed to reconcile {}", entity)))?;

        for warning in &outcome.warnings {
            tracing::warn!(entity = %entity, "{}", warning);
        }
        to_text(&outcome)
    }

    #[tool(description = "Show the exact payload manage_record would send for the given fields, without contacting ServiceDesk Plus. Custom fields are shown as text.")]
    async fn preview_payload(
        &self,
        Parameters(input): Parameters<ManageRecordInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        let entity = input.entity_type().map_err(|e| e.to_string())?;
        let fields = input.fields.unwrap_or_default();

        let payload = reconcile::preview_payload(entity, &fields)
            .await
            .map_err(|e| self.report(&e, "Failed to build payload"))?;

        match payload {
            Some(payload) => to_text(&json!({
                "payload": payload.to_wire(),
                "warnings": payload.warnings,
            })),
            None => Ok("No fields to send.".to_string()),
        }
    }

    /// Reads one record, one child record, or a page of records.
    #[tool(description = "Get a single record by parent_id, a record's notes/worklogs/tasks via child_module, or list records with list_options (row_count, sort_field, sort_order, get_total_count, start_index).")]
    async fn get_records(
        &self,
        Parameters(input): Parameters<GetRecordsInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(?input, "get_records tool called");

        let endpoint = input.endpoint().map_err(|e| e.to_string())?;
        let result = reconcile::read_records(&self.sdp_client, &endpoint, input.list_options.as_ref())
            .await
            .map_err(|e| self.report(&e, &format!("Failed to read {}", endpoint)))?;

        to_text(&result)
    }

    #[tool(description = "Send a raw payload without field validation. Updates the record (or child record) when its ID is given, otherwise creates one. Use child_module to add notes, worklogs or tasks to a record.")]
    async fn write_record(
        &self,
        Parameters(input): Parameters<WriteRecordInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(entity = %input.entity, parent_id = ?input.parent_id, "write_record tool called");

        let endpoint = input.endpoint().map_err(|e| e.to_string())?;
        let outcome = reconcile::write_record(&self.sdp_client, &endpoint, input.payload.as_ref())
            .await
            .map_err(|e| self.report(&e, &format!("Failed to write {}", endpoint)))?;

        to_text(&outcome)
    }

    #[tool(description = "Delete a record, or one of its notes/worklogs/tasks when child_module and child_id are given.")]
    async fn delete_record(
        &self,
        Parameters(input): Parameters<DeleteRecordInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(entity = %input.entity, parent_id = %input.parent_id, "delete_record tool called");

        let endpoint = input.endpoint().map_err(|e| e.to_string())?;
        let outcome = reconcile::delete_record(&self.sdp_client, &endpoint)
            .await
            .map_err(|e| self.report(&e, &format!("Failed to delete {}", endpoint)))?;

        to_text(&outcome)
    }

    /// Logs a failure and formats it for the caller with secrets removed.
    fn report(&self, error: &KeelError, context: &str) -> String {
        let sanitized = error.sanitized_display(&self.sdp_client.secrets());
        tracing::error!(error = %sanitized, "{}", context);
        format!("{}: {}", context, sanitized)
    }
}

#[tool_handler]
impl ServerHandler for KeelServer {
    /// Returns server information for the MCP initialize handshake.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Keel keeps ServiceDesk Plus Cloud requests, problems, changes and releases \
                 in a desired state. Use describe_fields to see what an entity accepts, \
                 manage_record to create, update or delete idempotently (check_mode for a dry run), \
                 get_records to read, and write_record/delete_record for notes, worklogs and tasks. \
                 Start with 'ping' to verify connectivity."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Catalog summary of one entity type.
fn describe_entity(entity: EntityType) -> Value {
    let descriptor = entity.descriptor();
    let fields: Map<String, Value> = descriptor
        .fields
        .iter()
        .map(|(name, field)| {
            let mut entry = json!({ "kind": field.kind });
            if let Some(group) = field.group {
                entry["group"] = json!(group);
            }
            (name.to_string(), entry)
        })
        .collect();

    json!({
        "entity": entity,
        "endpoint": descriptor.endpoint,
        "id_param": descriptor.id_param,
        "mandatory_field": descriptor.mandatory_field,
        "sortable_fields": descriptor.sortable_fields,
        "fields": fields,
        "custom_fields": {
            "container": UDF_CONTAINER,
            "prefixes": UDF_PREFIXES,
        },
        "child_modules": ChildModule::ALL,
    })
}

fn to_text<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| KeelError::from(e).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Credentials, DataCenter};

    fn test_client() -> SdpClient {
        let config = Config::new(
            "https://sdp.example.com/app/itdesk/api/v3",
            DataCenter::Us,
            Credentials::Token("test_token_12345".to_string()),
        )
        .expect("valid config");
        SdpClient::new(&config).expect("Failed to create test client")
    }

    #[test]
    fn test_server_info_has_tools_capability() {
        let server = KeelServer::new(test_client());
        let info = server.get_info();
        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_ping_tool_returns_pong() {
        let server = KeelServer::new(test_client());
        assert_eq!(server.ping(), "pong");
    }

    #[test]
    fn test_describe_problem_fields() {
        let described = describe_entity(EntityType::Problem);
        assert_eq!(described["entity"], "problem");
        assert_eq!(described["mandatory_field"], "title");
        assert_eq!(
            described["fields"]["impact_details_description"]["group"],
            "impact_details"
        );
        assert_eq!(described["custom_fields"]["container"], "udf_fields");
        assert_eq!(described["child_modules"], json!(["note", "worklog", "task"]));
    }

    #[test]
    fn test_describe_fields_rejects_unknown_entity() {
        let server = KeelServer::new(test_client());
        let result = server.describe_fields(Parameters(DescribeFieldsInput {
            entity: "incident".to_string(),
        }));
        assert!(result.unwrap_err().contains("Invalid entity type 'incident'"));
    }

    #[test]
    fn test_report_scrubs_token() {
        let server = KeelServer::new(test_client());
        let error = KeelError::validation("token test_token_12345 rejected");
        let message = server.report(&error, "Failed");
        assert!(!message.contains("test_token_12345"));
        assert!(message.starts_with("Failed: "));
    }

    #[tokio::test]
    async fn test_preview_payload_tool() {
        let server = KeelServer::new(test_client());
        let input: ManageRecordInput = serde_json::from_value(json!({
            "entity": "request",
            "fields": {"subject": "VPN down", "udf_char1": "x"}
        }))
        .unwrap();

        let text = server.preview_payload(Parameters(input)).await.unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["payload"]["request"]["subject"], "VPN down");
        assert_eq!(value["payload"]["request"]["udf_fields"]["udf_char1"], "x");
        assert_eq!(value["warnings"].as_array().map(Vec::len), Some(1));
    }
}
