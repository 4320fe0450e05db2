//! nvim-bridge client library
//!
//! Discovers running Neovim instances listening on Unix sockets and drives
//! them over msgpack-rpc: state snapshots, file navigation, and command or
//! keystroke execution.
//!
//! Every [`Bridge`] operation re-resolves the instance, opens its own
//! connection, runs its calls in sequence and closes the connection before
//! returning. Operations never return `Err`; failures are reported inside the
//! result value.

pub mod codec;
pub mod config;
pub mod constants;
pub mod discovery;
mod execute;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
mod navigate;
pub mod rpc;
pub mod session;
mod snapshot;
pub mod types;

use std::time::Duration;

pub use config::BridgeConfig;
pub use navigate::{NavigatePlan, NavigateRequest};
pub use rpc::{RpcClient, RpcError};
pub use session::{SessionError, with_session};
pub use types::{
    BufferInfo, CursorPosition, ErrorKind, ExecuteDetails, ExecuteResult, Instance,
    InstanceSnapshot, InstanceState, NavigateDetails, NavigateResult, OperationError,
    OperationResult,
};

/// Entry point for bridge operations.
#[derive(Debug, Clone, Default)]
pub struct Bridge {
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Enumerate instances with a live socket.
    pub fn discover(&self) -> Vec<Instance> {
        discovery::discover(&self.config.socket_dir, &self.config.socket_prefix)
    }

    /// Resolve a pid to its current socket.
    pub fn locate(&self, id: u32) -> Option<Instance> {
        discovery::locate(&self.config.socket_dir, &self.config.socket_prefix, id)
    }
}

/// Connect to a Neovim socket directly, outside of a session.
pub async fn connect_unix(
    path: impl AsRef<std::path::Path>,
    config: &BridgeConfig,
) -> Result<RpcClient, ConnectError> {
    RpcClient::connect(path.as_ref(), config.connect_timeout, config.call_timeout).await
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
