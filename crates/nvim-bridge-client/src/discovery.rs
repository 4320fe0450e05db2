//! Socket discovery.
//!
//! Running instances are found by scanning a directory for sockets named
//! `<prefix>-<pid>.sock`. There is no registry: every lookup rescans, so a
//! socket path is never reused after its editor exits.

use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use regex::Regex;

use crate::constants::SOCKET_SUFFIX;
use crate::types::Instance;

fn socket_name_pattern(prefix: &str) -> Option<Regex> {
    let pattern = format!(
        r"^{}-(\d+)\.{}$",
        regex::escape(prefix),
        regex::escape(SOCKET_SUFFIX)
    );
    Regex::new(&pattern)
        .inspect_err(|e| tracing::warn!(%prefix, "Invalid socket prefix: {e}"))
        .ok()
}

/// Enumerate instances with a live socket in `dir`.
///
/// Never fails: a missing or unreadable directory yields an empty list, and
/// entries that vanish or cannot be stat'ed mid-scan are skipped. Order
/// follows the directory listing.
pub fn discover(dir: &Path, prefix: &str) -> Vec<Instance> {
    let Some(pattern) = socket_name_pattern(prefix) else {
        return Vec::new();
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), "Socket directory not readable: {e}");
            return Vec::new();
        }
    };

    entries
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let id = pattern
                .captures(name.to_str()?)?
                .get(1)?
                .as_str()
                .parse::<u32>()
                .ok()?;

            let path = entry.path();
            let is_socket = std::fs::metadata(&path)
                .map(|m| m.file_type().is_socket())
                .unwrap_or(false);
            is_socket.then_some(Instance { socket_path: path, id })
        })
        .collect()
}

/// Resolve `id` to a live socket by rescanning `dir`.
pub fn locate(dir: &Path, prefix: &str, id: u32) -> Option<Instance> {
    discover(dir, prefix).into_iter().find(|i| i.id == id)
}
