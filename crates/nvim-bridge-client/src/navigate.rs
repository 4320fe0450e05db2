//! Open a file in an instance, optionally placing the cursor or a selection.

use serde::Deserialize;

use crate::Bridge;
use crate::constants::{DEFAULT_COLUMN, END_OF_LINE_COLUMN};
use crate::rpc::{RpcClient, RpcError};
use crate::session::with_session;
use crate::types::{CursorPosition, NavigateDetails, NavigateResult, OperationError, OperationResult};

/// Where to navigate. Columns are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NavigateRequest {
    pub file_path: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub end_line: Option<u32>,
    pub end_column: Option<u32>,
}

impl NavigateRequest {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, line: u32, column: Option<u32>) -> Self {
        self.line = Some(line);
        self.column = column;
        self
    }

    pub fn select_to(mut self, end_line: u32, end_column: Option<u32>) -> Self {
        self.end_line = Some(end_line);
        self.end_column = end_column;
        self
    }

    /// Resolve column defaults and decide which steps run.
    ///
    /// A selection needs an anchor, so `end_line` without `line` is ignored.
    pub fn plan(&self) -> NavigatePlan {
        let cursor = self.line.map(|line| CursorPosition {
            line,
            column: self.column.unwrap_or(DEFAULT_COLUMN),
        });
        let selection_end = cursor.and(self.end_line).map(|line| CursorPosition {
            line,
            column: self.end_column.unwrap_or(END_OF_LINE_COLUMN),
        });
        NavigatePlan { cursor, selection_end }
    }
}

/// Resolved cursor and selection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatePlan {
    pub cursor: Option<CursorPosition>,
    pub selection_end: Option<CursorPosition>,
}

impl NavigatePlan {
    fn describe(&self, file_path: &str) -> String {
        match (self.cursor, self.selection_end) {
            (Some(start), Some(end)) => format!(
                "Opened {file_path} and selected from line {}, column {} to line {}, column {}",
                start.line, start.column, end.line, end.column
            ),
            (Some(start), None) => format!(
                "Opened {file_path} at line {}, column {}",
                start.line, start.column
            ),
            _ => format!("Opened {file_path}"),
        }
    }

    fn details(&self, file_path: &str) -> NavigateDetails {
        NavigateDetails {
            file_path: file_path.to_string(),
            line: self.cursor.map(|p| p.line),
            column: self.cursor.map(|p| p.column),
            end_line: self.selection_end.map(|p| p.line),
            end_column: self.selection_end.map(|p| p.column),
        }
    }
}

impl Bridge {
    /// Open `request.file_path`, reload it from disk, then position the cursor
    /// and selection.
    ///
    /// A failure part-way through is reported as a failure even though earlier
    /// steps have already taken effect in the editor.
    #[tracing::instrument(skip(self, request), fields(file = %request.file_path), name = "bridge.navigate")]
    pub async fn navigate(&self, id: u32, request: &NavigateRequest) -> NavigateResult {
        let plan = request.plan();
        let details = plan.details(&request.file_path);

        if request.file_path.trim().is_empty() {
            return OperationResult::failed(
                OperationError::invalid_request("file_path must not be empty"),
                details,
            );
        }

        let Some(instance) = self.locate(id) else {
            return OperationResult::failed(OperationError::not_found(id), details);
        };

        let file_path = request.file_path.as_str();
        match with_session(&instance, &self.config, async |client: &mut RpcClient| {
            perform(client, file_path, &plan).await
        })
        .await
        {
            Ok(()) => OperationResult::ok(plan.describe(file_path), details),
            Err(e) => {
                tracing::warn!(pid = id, "Navigate failed: {e}");
                OperationResult::failed(OperationError::from_session(id, &e), details)
            }
        }
    }
}

async fn perform(client: &mut RpcClient, file_path: &str, plan: &NavigatePlan) -> Result<(), RpcError> {
    let escaped = client.fnameescape(file_path).await?;
    client.command(&format!("edit {escaped}")).await?;

    // Pick up edits made outside the editor.
    client.command("edit!").await?;

    if let Some(cursor) = plan.cursor {
        client.set_cursor(cursor.line, cursor.column).await?;
    }

    if let Some(end) = plan.selection_end {
        client.command("normal! v").await?;
        client.set_cursor(end.line, end.column).await?;
    }

    Ok(())
}
