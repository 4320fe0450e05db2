//! Bridge configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{CALL_TIMEOUT, CONNECT_TIMEOUT, DEFAULT_SOCKET_PREFIX, SOCKET_DIR_ENV};

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Directory scanned for `<prefix>-<pid>.sock` files.
    pub socket_dir: PathBuf,
    /// File name prefix of instance sockets.
    pub socket_prefix: String,
    pub connect_timeout: Duration,
    /// Deadline for each individual remote call.
    pub call_timeout: Duration,
}

impl BridgeConfig {
    pub fn with_socket_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            socket_dir: dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            socket_dir: default_socket_dir(),
            socket_prefix: DEFAULT_SOCKET_PREFIX.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            call_timeout: CALL_TIMEOUT,
        }
    }
}

/// `$NVIM_BRIDGE_SOCKET_DIR`, falling back to the system temp directory.
pub fn default_socket_dir() -> PathBuf {
    std::env::var_os(SOCKET_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}
