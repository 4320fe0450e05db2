//! MCP request types.
//!
//! These types define the parameters of the nvim-bridge MCP tools.

use rmcp::schemars;
use serde::Deserialize;

use nvim_bridge_client::NavigateRequest as BridgeNavigateRequest;

/// Read the state of one Neovim instance.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct InstanceStateRequest {
    /// Process id of the Neovim instance
    #[schemars(description = "Process ID of the Neovim instance (from list_instances)")]
    pub pid: u32,
}

/// Open a file in a Neovim instance.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NavigateRequest {
    #[schemars(description = "Process ID of the Neovim instance (from list_instances)")]
    pub pid: u32,
    /// File to open
    #[schemars(description = "Path of the file to open (absolute, or relative to the instance's working directory)")]
    pub file_path: String,
    #[schemars(description = "Line to move the cursor to (1-based)")]
    pub line: Option<u32>,
    #[schemars(description = "Column to move the cursor to (1-based, default: 1)")]
    pub column: Option<u32>,
    /// Selection end, only used together with `line`
    #[schemars(description = "Extend a selection from line/column to this line (requires line)")]
    pub end_line: Option<u32>,
    #[schemars(description = "Selection end column (1-based, default: end of line)")]
    pub end_column: Option<u32>,
}

impl NavigateRequest {
    pub fn to_bridge(&self) -> BridgeNavigateRequest {
        BridgeNavigateRequest {
            file_path: self.file_path.clone(),
            line: self.line,
            column: self.column,
            end_line: self.end_line,
            end_column: self.end_column,
        }
    }
}

/// Execute a command or key sequence in a Neovim instance.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExecuteRequest {
    #[schemars(description = "Process ID of the Neovim instance (from list_instances)")]
    pub pid: u32,
    /// Ex command (leading ':' optional) or raw keys
    #[schemars(description = "Ex command such as ':w' or 'set number', or raw keys like 'ihello<Esc>' when is_key_sequence is true")]
    pub command: String,
    #[schemars(description = "Send the string as typed keys instead of an Ex command (default: false)")]
    #[serde(default)]
    pub is_key_sequence: bool,
}
