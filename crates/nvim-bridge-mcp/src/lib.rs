//! MCP server exposing running Neovim instances.
//!
//! Provides tools to list instances, read an instance's state, open files at
//! a position or selection, and run commands or keystrokes, enabling agents
//! like Claude Code, Gemini CLI, and opencode to work alongside an editor the
//! user already has open.
//!
//! ## Module Structure
//!
//! - `models`: Request types for MCP tools
//! - `format`: Text rendering of bridge results

mod format;
mod models;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        AnnotateAble, ListResourcesResult, PaginatedRequestParams, RawResource,
        ReadResourceRequestParams, ReadResourceResult, ResourceContents, ServerCapabilities,
        ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};

use nvim_bridge_client::{Bridge, BridgeConfig};

pub use format::{format_instances, format_result, format_snapshot};
pub use models::*;

const INSTANCES_URI: &str = "nvim://instances";

/// MCP server exposing Neovim instances.
#[derive(Clone)]
pub struct NvimBridgeMcp {
    bridge: Bridge,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for NvimBridgeMcp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvimBridgeMcp")
            .field("socket_dir", &self.bridge.config().socket_dir)
            .field("tool_router", &self.tool_router)
            .finish()
    }
}

impl NvimBridgeMcp {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            bridge: Bridge::new(config),
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for NvimBridgeMcp {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

#[tool_router]
impl NvimBridgeMcp {
    #[tool(description = "List running Neovim instances that expose a control socket. Returns each instance's PID and socket path; use the PID with the other tools.")]
    fn list_instances(&self) -> String {
        format_instances(&self.bridge.discover())
    }

    #[tool(description = "Get the state of a Neovim instance: working directory, current file, cursor position, and open buffers.")]
    #[tracing::instrument(skip(self, req), fields(pid = req.pid), name = "mcp.get_instance_state")]
    async fn get_instance_state(&self, Parameters(req): Parameters<InstanceStateRequest>) -> String {
        format_snapshot(&self.bridge.snapshot(req.pid).await)
    }

    #[tool(description = "Open a file in a Neovim instance, reloading it from disk so external edits are visible. Optionally move the cursor to line/column and select up to end_line/end_column.")]
    #[tracing::instrument(skip(self, req), fields(pid = req.pid), name = "mcp.navigate")]
    async fn navigate(&self, Parameters(req): Parameters<NavigateRequest>) -> String {
        format_result(&self.bridge.navigate(req.pid, &req.to_bridge()).await)
    }

    #[tool(description = "Run an Ex command (e.g. ':w', ':%s/foo/bar/g') in a Neovim instance and return its output, or send raw keystrokes (e.g. 'ihello<Esc>') with is_key_sequence=true. A command the editor rejects is reported as output, not as a failure.")]
    #[tracing::instrument(skip(self, req), fields(pid = req.pid), name = "mcp.execute")]
    async fn execute(&self, Parameters(req): Parameters<ExecuteRequest>) -> String {
        format_result(
            &self
                .bridge
                .execute(req.pid, &req.command, req.is_key_sequence)
                .await,
        )
    }
}

#[tool_handler]
impl ServerHandler for NvimBridgeMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(
            ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
        )
        .with_instructions(
            "Neovim bridge MCP server. Lists running Neovim instances and lets you inspect their state, open files at a position, and run commands or keystrokes in them.",
        )
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// List available resources.
    ///
    /// Resources exposed:
    /// - `nvim://instances` - All running instances
    /// - `nvim://instances/{pid}` - State snapshot of one instance
    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            let mut resources = vec![RawResource {
                uri: INSTANCES_URI.to_string(),
                name: "instances".to_string(),
                title: Some("Neovim Instances".to_string()),
                description: Some("Running Neovim instances with a control socket".to_string()),
                mime_type: Some("application/json".to_string()),
                size: None,
                icons: None,
                meta: None,
            }
            .no_annotation()];

            for instance in self.bridge.discover() {
                resources.push(RawResource {
                    uri: format!("{INSTANCES_URI}/{}", instance.id),
                    name: instance.id.to_string(),
                    title: Some(format!("Neovim {}", instance.id)),
                    description: Some(format!(
                        "State of the Neovim instance listening on {}",
                        instance.socket_path.display()
                    )),
                    mime_type: Some("application/json".to_string()),
                    size: None,
                    icons: None,
                    meta: None,
                }
                .no_annotation());
            }

            Ok(ListResourcesResult {
                meta: None,
                next_cursor: None,
                resources,
            })
        }
    }

    /// Read a specific resource.
    fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let content = self.read_resource_json(&request.uri).await?;
            Ok(ReadResourceResult::new(vec![ResourceContents::text(
                content,
                request.uri.clone(),
            )]))
        }
    }
}

impl NvimBridgeMcp {
    /// JSON body of `nvim://instances` or `nvim://instances/{pid}`.
    async fn read_resource_json(&self, uri: &str) -> Result<String, McpError> {
        if uri == INSTANCES_URI {
            return serde_json::to_string_pretty(&self.bridge.discover())
                .map_err(|e| McpError::internal_error(e.to_string(), None));
        }

        let pid = uri
            .strip_prefix(INSTANCES_URI)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|pid| pid.parse::<u32>().ok())
            .ok_or_else(|| McpError::invalid_params(format!("Unknown resource URI: {uri}"), None))?;

        let snapshot = self.bridge.snapshot(pid).await;
        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}
