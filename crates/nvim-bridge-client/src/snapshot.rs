//! Instance snapshots.

use crate::Bridge;
use crate::rpc::{RpcClient, RpcError};
use crate::session::with_session;
use crate::types::{
    BufferInfo, Instance, InstanceSnapshot, InstanceState, OperationError, unnamed_buffer_label,
};

impl Bridge {
    /// Read working directory, current file, cursor and buffer list in one session.
    ///
    /// Either every field is filled or the snapshot carries only an error.
    #[tracing::instrument(skip(self), name = "bridge.snapshot")]
    pub async fn snapshot(&self, id: u32) -> InstanceSnapshot {
        let Some(instance) = self.locate(id) else {
            return InstanceSnapshot::failed(Instance::unresolved(id), OperationError::not_found(id));
        };

        match with_session(&instance, &self.config, async |client: &mut RpcClient| {
            assemble(client).await
        })
        .await
        {
            Ok(state) => {
                tracing::debug!(pid = id, buffers = state.buffers.len(), "Snapshot assembled");
                InstanceSnapshot::ready(instance, state)
            }
            Err(e) => {
                tracing::warn!(pid = id, "Snapshot failed: {e}");
                InstanceSnapshot::failed(instance, OperationError::from_session(id, &e))
            }
        }
    }
}

async fn assemble(client: &mut RpcClient) -> Result<InstanceState, RpcError> {
    let working_directory = client.current_dir().await?;

    let current = client.current_buffer().await?;
    let current_name = client.buffer_name(current).await?;

    let cursor_position = client.window_cursor().await?;

    let handles = client.list_buffers().await?;
    let mut buffers = Vec::with_capacity(handles.len());
    for handle in handles {
        let name = client.buffer_name(handle).await?;
        let loaded = client.buffer_is_loaded(handle).await?;
        buffers.push(BufferInfo {
            id: handle,
            name: label(handle, name),
            loaded,
            current: handle == current,
        });
    }

    Ok(InstanceState {
        working_directory,
        current_file: label(current, current_name),
        buffers,
        cursor_position,
    })
}

fn label(id: i64, name: String) -> String {
    if name.is_empty() {
        unnamed_buffer_label(id)
    } else {
        name
    }
}
