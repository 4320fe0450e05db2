//! Text rendering of bridge results.
//!
//! Pure functions turning instances, snapshots and operation results into the
//! text returned by the MCP tools.

use std::path::Path;

use nvim_bridge_client::{Instance, InstanceSnapshot, OperationResult};

/// Format the instance list.
pub fn format_instances(instances: &[Instance]) -> String {
    if instances.is_empty() {
        return "No Neovim instances found".to_string();
    }

    let mut lines = vec![format!("Found {} Neovim instance(s):", instances.len())];
    for instance in instances {
        lines.push(format!(
            "- PID {}: {}",
            instance.id,
            instance.socket_path.display()
        ));
    }
    lines.join("\n")
}

/// Format a snapshot, or its error.
pub fn format_snapshot(snapshot: &InstanceSnapshot) -> String {
    let pid = snapshot.instance.id;

    let Some(state) = snapshot.state() else {
        let message = snapshot
            .error()
            .map(|e| e.message.as_str())
            .unwrap_or("unknown error");
        return format!("Error: {message}");
    };

    let cwd = state.working_directory.as_str();
    let mut lines = vec![
        format!("Neovim instance {pid}"),
        format!("Working directory: {cwd}"),
        format!("Current file: {}", display_path(&state.current_file, cwd)),
        format!(
            "Cursor: line {}, column {}",
            state.cursor_position.line, state.cursor_position.column
        ),
        String::new(),
        format!("Buffers ({}):", state.buffers.len()),
    ];

    for (idx, buffer) in state.buffers.iter().enumerate() {
        let marker = if buffer.current { "*" } else { " " };
        let load_state = if buffer.loaded { "" } else { " [unloaded]" };
        lines.push(format!(
            "{marker} {:>2}. {}{load_state} (buf {})",
            idx + 1,
            display_path(&buffer.name, cwd),
            buffer.id
        ));
    }

    lines.join("\n")
}

/// Format a navigate or execute result.
pub fn format_result<D>(result: &OperationResult<D>) -> String {
    if result.success() {
        result.message().to_string()
    } else {
        format!("Error: {}", result.message())
    }
}

/// Show `path` relative to `base` when it lives underneath it.
fn display_path(path: &str, base: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    match Path::new(path).strip_prefix(base) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
        _ => path.to_string(),
    }
}
