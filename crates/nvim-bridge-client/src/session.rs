//! Connect / use / close unit of work around one socket.
//!
//! ```text
//!   connect ──fail──▶ SessionError::Connect        (body never runs)
//!      │
//!      ▼
//!   body(&mut client) ──▶ Ok(R) | Err(RpcError)
//!      │
//!      ▼
//!   close  (failure logged and dropped)
//!      │
//!      ▼
//!   Ok(R) | SessionError::Rpc
//! ```
//!
//! If the session future is dropped mid-body the client is dropped with it,
//! which closes the socket.

use crate::config::BridgeConfig;
use crate::rpc::{RpcClient, RpcError};
use crate::types::{ErrorKind, Instance};
use crate::ConnectError;

/// Failure of a session, split by whether a connection was ever established.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to connect: {0}")]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Connect(_) => ErrorKind::ConnectFailure,
            SessionError::Rpc(_) => ErrorKind::TransportFailure,
        }
    }
}

/// Run `body` against a fresh connection to `instance`, closing it afterwards.
pub async fn with_session<R, F>(
    instance: &Instance,
    config: &BridgeConfig,
    body: F,
) -> Result<R, SessionError>
where
    F: AsyncFnOnce(&mut RpcClient) -> Result<R, RpcError>,
{
    let mut client = RpcClient::connect(
        &instance.socket_path,
        config.connect_timeout,
        config.call_timeout,
    )
    .await
    .inspect_err(|e| {
        tracing::debug!(pid = instance.id, path = %instance.socket_path.display(), "Connect failed: {e}");
    })?;

    let outcome = body(&mut client).await;

    if let Err(e) = client.close().await {
        tracing::debug!(pid = instance.id, "Ignoring error while closing session: {e}");
    }

    Ok(outcome?)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fake::{FakeNvim, Reply, default_reply};

    fn config_for(dir: &std::path::Path) -> BridgeConfig {
        BridgeConfig {
            call_timeout: Duration::from_secs(2),
            ..BridgeConfig::with_socket_dir(dir)
        }
    }

    #[tokio::test]
    async fn test_body_result_is_returned_and_connection_closed() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeNvim::start(dir.path(), 100, default_reply);
        let instance = fake.instance();

        let cwd = with_session(&instance, &config_for(dir.path()), async |client: &mut RpcClient| {
            client.current_dir().await
        })
        .await
        .unwrap();

        assert_eq!(cwd, "/work");
        fake.wait_for_closed(1).await;
    }

    #[tokio::test]
    async fn test_body_error_still_closes_connection() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeNvim::start(dir.path(), 101, |method, params| match method {
            "nvim_command" => Reply::Err("Vim:E492: Not an editor command".to_string()),
            _ => default_reply(method, params),
        });
        let instance = fake.instance();

        let err = with_session(&instance, &config_for(dir.path()), async |client: &mut RpcClient| {
            client.command("bogus").await
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert!(matches!(err, SessionError::Rpc(ref e) if e.is_remote()));
        fake.wait_for_closed(1).await;
    }

    #[tokio::test]
    async fn test_transport_failure_mid_body() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeNvim::start(dir.path(), 102, |method, params| match method {
            "nvim_list_bufs" => Reply::Hangup,
            _ => default_reply(method, params),
        });
        let instance = fake.instance();

        let err = with_session(&instance, &config_for(dir.path()), async |client: &mut RpcClient| {
            client.current_dir().await?;
            client.list_buffers().await
        })
        .await
        .unwrap_err();

        assert!(matches!(err, SessionError::Rpc(ref e) if !e.is_remote()));
        fake.wait_for_closed(1).await;
    }

    #[tokio::test]
    async fn test_connect_failure_skips_body() {
        let dir = tempfile::tempdir().unwrap();
        let instance = Instance {
            socket_path: dir.path().join("nvim-9.sock"),
            id: 9,
        };

        let mut ran = false;
        let err = with_session(&instance, &config_for(dir.path()), async |_client: &mut RpcClient| {
            ran = true;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(!ran);
        assert!(matches!(err, SessionError::Connect(_)));
        assert_eq!(err.kind(), ErrorKind::ConnectFailure);
    }

    #[tokio::test]
    async fn test_dropped_session_closes_connection() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeNvim::start(dir.path(), 103, |method, params| match method {
            "nvim_command" => Reply::Silent,
            _ => default_reply(method, params),
        });
        let instance = fake.instance();
        let config = config_for(dir.path());

        let session = with_session(&instance, &config, async |client: &mut RpcClient| {
            client.command("sleep 1000").await
        });
        let cancelled = tokio::time::timeout(Duration::from_millis(100), session).await;

        assert!(cancelled.is_err());
        fake.wait_for_closed(1).await;
    }
}
