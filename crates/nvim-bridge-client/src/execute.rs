//! Run an Ex command or inject raw keystrokes.

use crate::Bridge;
use crate::constants::COMMAND_MARKER;
use crate::rpc::{RpcClient, RpcError};
use crate::session::with_session;
use crate::types::{ExecuteDetails, ExecuteResult, OperationError, OperationResult};

/// What a command-mode call produced.
struct CommandOutcome {
    output: String,
    rejected: bool,
}

impl Bridge {
    /// Execute `command` against instance `id`.
    ///
    /// With `is_key_sequence` the string is fed to `nvim_input` verbatim.
    /// Otherwise one leading `:` is stripped and the rest runs as an Ex
    /// command; if the editor rejects it (unknown command, failed search)
    /// the rejection becomes the output and the call still succeeds. Only
    /// connection problems produce a failed result.
    #[tracing::instrument(skip(self, command), name = "bridge.execute")]
    pub async fn execute(&self, id: u32, command: &str, is_key_sequence: bool) -> ExecuteResult {
        let mut details = ExecuteDetails {
            command: command.to_string(),
            is_key_sequence,
            output: None,
            rejected: false,
        };

        if command.is_empty() {
            return OperationResult::failed(
                OperationError::invalid_request("command must not be empty"),
                details,
            );
        }

        let Some(instance) = self.locate(id) else {
            return OperationResult::failed(OperationError::not_found(id), details);
        };

        if is_key_sequence {
            return match with_session(&instance, &self.config, async |client: &mut RpcClient| {
                client.input(command).await
            })
            .await
            {
                Ok(()) => OperationResult::ok(format!("Sent key sequence: {command}"), details),
                Err(e) => {
                    tracing::warn!(pid = id, "Key sequence failed: {e}");
                    OperationResult::failed(OperationError::from_session(id, &e), details)
                }
            };
        }

        let ex_command = command.strip_prefix(COMMAND_MARKER).unwrap_or(command);
        let outcome = with_session(&instance, &self.config, async |client: &mut RpcClient| {
            run_command(client, ex_command).await
        })
        .await;

        match outcome {
            Ok(CommandOutcome { output, rejected }) => {
                let output = output.trim();
                let mut message = format!("Executed command: {command}");
                if !output.is_empty() {
                    message.push_str("\nOutput:\n");
                    message.push_str(output);
                    details.output = Some(output.to_string());
                }
                details.rejected = rejected;
                OperationResult::ok(message, details)
            }
            Err(e) => {
                tracing::warn!(pid = id, "Command failed: {e}");
                OperationResult::failed(OperationError::from_session(id, &e), details)
            }
        }
    }
}

async fn run_command(client: &mut RpcClient, command: &str) -> Result<CommandOutcome, RpcError> {
    match client.exec_output(command).await {
        Ok(output) => Ok(CommandOutcome { output, rejected: false }),
        Err(RpcError::Remote(message)) => {
            tracing::info!(%command, "Command rejected by editor: {message}");
            Ok(CommandOutcome { output: message, rejected: true })
        }
        Err(e) => Err(e),
    }
}
