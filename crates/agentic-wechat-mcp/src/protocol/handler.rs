//! Request dispatcher: receives JSON-RPC messages and routes them.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use crate::service::ServiceContext;
use crate::tools::ToolRegistry;
use crate::types::*;

use super::negotiation::NegotiatedCapabilities;
use super::validator::validate_request;

/// Dispatches incoming messages. Cheap to share across tasks behind an `Arc`.
pub struct ProtocolHandler {
    services: Arc<ServiceContext>,
    capabilities: Mutex<NegotiatedCapabilities>,
}

impl ProtocolHandler {
    pub fn new(services: Arc<ServiceContext>) -> Self {
        Self {
            services,
            capabilities: Mutex::new(NegotiatedCapabilities::default()),
        }
    }

    pub fn services(&self) -> &Arc<ServiceContext> {
        &self.services
    }

    /// Handle one message; requests get a response, notifications do not.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!("Ignoring response message sent by the client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return e.to_json_rpc_error(request.id).into_value();
        }

        let id = request.id.clone();
        match self.dispatch_request(request).await {
            Ok(value) => JsonRpcResponse::new(id, value).into_value(),
            Err(e) => {
                tracing::debug!("Request {id} failed: {e}");
                e.to_json_rpc_error(id).into_value()
            }
        }
    }

    async fn dispatch_request(&self, request: JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.decode_params()?).await,
            "shutdown" => self.handle_shutdown().await,
            "ping" => Ok(Value::Object(serde_json::Map::new())),

            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.decode_params()?).await,

            _ => Err(McpError::MethodNotFound(request.method)),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                self.capabilities.lock().await.mark_initialized();
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                let target = notification
                    .params
                    .and_then(|p| serde_json::from_value::<CancelRequestParams>(p).ok());
                match target {
                    Some(cancel) => tracing::info!(
                        "Client cancelled request {} ({}); it will run to completion",
                        cancel.request_id,
                        cancel.reason.as_deref().unwrap_or("no reason given")
                    ),
                    None => tracing::info!("Received cancellation notification"),
                }
            }
            other => tracing::debug!("Unknown notification: {other}"),
        }
    }

    async fn handle_initialize(&self, init_params: InitializeParams) -> McpResult<Value> {
        let result = self.capabilities.lock().await.negotiate(init_params);
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_shutdown(&self) -> McpResult<Value> {
        tracing::info!("Shutdown requested");
        let swept = self.services.sweep_cache().await;
        tracing::debug!("Swept {swept} expired cache entries before shutdown");
        Ok(Value::Object(serde_json::Map::new()))
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: ToolRegistry::list_tools(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(&self, call_params: ToolCallParams) -> McpResult<Value> {
        tracing::debug!("tools/call {}", call_params.name);
        let result =
            ToolRegistry::call(&call_params.name, call_params.arguments, &self.services).await?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }
}
