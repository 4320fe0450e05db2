//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Default socket file prefix: Neovim started with `--listen /tmp/nvim-$$.sock`.
pub const DEFAULT_SOCKET_PREFIX: &str = "nvim";

/// Socket file suffix (the part after the pid).
pub const SOCKET_SUFFIX: &str = "sock";

/// Environment variable overriding the socket directory.
pub const SOCKET_DIR_ENV: &str = "NVIM_BRIDGE_SOCKET_DIR";

/// Timeout for establishing a Unix socket connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a single remote call. A hung editor would otherwise block the
/// caller forever.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Column used for a selection end when none is given. `cursor()` clamps it
/// to the end of the line.
pub const END_OF_LINE_COLUMN: u32 = 999;

/// Column used for a cursor position when none is given.
pub const DEFAULT_COLUMN: u32 = 1;

/// Leading marker stripped from commands in command mode.
pub const COMMAND_MARKER: char = ':';
