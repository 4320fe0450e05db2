//! msgpack-rpc client for a single Neovim instance.
//!
//! Provides the two transport primitives the bridge is built on (a request
//! that awaits a reply, and raw input delivery) plus typed wrappers for the
//! handful of Neovim API calls the bridge issues.

use std::path::Path;
use std::time::Duration;

use rmpv::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::ConnectError;
use crate::codec::{self, Message};
use crate::types::CursorPosition;

/// RPC client wrapper around one Unix socket connection.
///
/// Calls are strictly sequential: each call writes a request and reads frames
/// until the matching response arrives.
pub struct RpcClient {
    stream: UnixStream,
    buf: Vec<u8>,
    next_msgid: u32,
    call_timeout: Duration,
}

impl RpcClient {
    /// Connect to a Neovim `--listen` socket.
    pub async fn connect(
        path: &Path,
        connect_timeout: Duration,
        call_timeout: Duration,
    ) -> Result<Self, ConnectError> {
        let stream = tokio::time::timeout(connect_timeout, UnixStream::connect(path))
            .await
            .map_err(|_| ConnectError::Timeout(connect_timeout))??;
        Ok(Self::from_stream(stream, call_timeout))
    }

    /// Wrap an already connected stream.
    ///
    /// Useful for testing with `UnixStream::pair()`.
    pub fn from_stream(stream: UnixStream, call_timeout: Duration) -> Self {
        Self {
            stream,
            buf: Vec::with_capacity(4096),
            next_msgid: 0,
            call_timeout,
        }
    }

    /// Invoke a named remote procedure and await its reply.
    ///
    /// A reply carrying an error object becomes [`RpcError::Remote`]; anything
    /// that goes wrong with the connection itself is a transport error.
    pub async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let limit = self.call_timeout;
        tokio::time::timeout(limit, self.call_inner(method, params))
            .await
            .map_err(|_| RpcError::Timeout {
                method: method.to_string(),
                after: limit,
            })?
    }

    async fn call_inner(&mut self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let msgid = self.next_msgid;
        self.next_msgid = self.next_msgid.wrapping_add(1);

        let frame = codec::encode(Message::Request {
            msgid,
            method: method.to_string(),
            params,
        })?;
        self.stream.write_all(&frame).await?;

        loop {
            match self.read_message().await? {
                Message::Response { msgid: id, error, result } if id == msgid => {
                    return if error.is_nil() {
                        Ok(result)
                    } else {
                        Err(RpcError::Remote(remote_error_message(&error)))
                    };
                }
                Message::Response { msgid: id, .. } => {
                    tracing::debug!(msgid = id, "Discarding response to an abandoned request");
                }
                Message::Notification { method, .. } => {
                    tracing::trace!(%method, "Ignoring notification");
                }
                Message::Request { msgid: id, method, .. } => {
                    // Answer so the editor does not block waiting on us.
                    tracing::debug!(%method, "Rejecting request from remote");
                    let reply = codec::encode(Message::Response {
                        msgid: id,
                        error: Value::from(format!("nvim-bridge does not handle '{method}'")),
                        result: Value::Nil,
                    })?;
                    self.stream.write_all(&reply).await?;
                }
            }
        }
    }

    async fn read_message(&mut self) -> Result<Message, RpcError> {
        loop {
            if let Some((message, used)) = codec::decode(&self.buf)? {
                self.buf.drain(..used);
                return Ok(message);
            }
            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Err(RpcError::Closed);
            }
        }
    }

    /// Deliver literal input as if typed (`nvim_input`).
    ///
    /// Neovim replies with the number of bytes queued, which carries no
    /// information about what the keys did; it is discarded.
    pub async fn input(&mut self, keys: &str) -> Result<(), RpcError> {
        self.call("nvim_input", vec![Value::from(keys)]).await?;
        Ok(())
    }

    /// Close the connection.
    pub async fn close(mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }

    // ========================================================================
    // Typed API wrappers
    // ========================================================================

    /// Run an Ex command without capturing output (`nvim_command`).
    pub async fn command(&mut self, command: &str) -> Result<(), RpcError> {
        self.call("nvim_command", vec![Value::from(command)]).await?;
        Ok(())
    }

    /// Run Ex commands and capture their output (`nvim_exec2`).
    pub async fn exec_output(&mut self, source: &str) -> Result<String, RpcError> {
        let opts = Value::Map(vec![(Value::from("output"), Value::from(true))]);
        let result = self
            .call("nvim_exec2", vec![Value::from(source), opts])
            .await?;

        let output = result.as_map().and_then(|entries| {
            entries
                .iter()
                .find(|(k, _)| k.as_str() == Some("output"))
                .and_then(|(_, v)| v.as_str())
        });
        Ok(output.unwrap_or_default().to_string())
    }

    /// Call a Vimscript function (`nvim_call_function`).
    pub async fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        self.call("nvim_call_function", vec![Value::from(name), Value::Array(args)])
            .await
    }

    /// Current working directory of the editor.
    pub async fn current_dir(&mut self) -> Result<String, RpcError> {
        let cwd = self.call_function("getcwd", vec![]).await?;
        expect_string(cwd, "getcwd")
    }

    /// Escape a path for use in an Ex command (`fnameescape()`).
    pub async fn fnameescape(&mut self, path: &str) -> Result<String, RpcError> {
        let escaped = self.call_function("fnameescape", vec![Value::from(path)]).await?;
        expect_string(escaped, "fnameescape")
    }

    /// Handle of the current buffer.
    pub async fn current_buffer(&mut self) -> Result<i64, RpcError> {
        let buf = self.call("nvim_get_current_buf", vec![]).await?;
        codec::decode_handle(&buf)
    }

    /// Handles of all buffers, listed or not.
    pub async fn list_buffers(&mut self) -> Result<Vec<i64>, RpcError> {
        let bufs = self.call("nvim_list_bufs", vec![]).await?;
        match bufs {
            Value::Array(items) => items.iter().map(codec::decode_handle).collect(),
            other => Err(RpcError::Protocol(format!(
                "nvim_list_bufs returned {other}"
            ))),
        }
    }

    /// Full path of a buffer, empty for unnamed buffers.
    pub async fn buffer_name(&mut self, buffer: i64) -> Result<String, RpcError> {
        let name = self.call("nvim_buf_get_name", vec![Value::from(buffer)]).await?;
        expect_string(name, "nvim_buf_get_name")
    }

    /// Whether a buffer is loaded in memory.
    pub async fn buffer_is_loaded(&mut self, buffer: i64) -> Result<bool, RpcError> {
        let loaded = self.call("nvim_buf_is_loaded", vec![Value::from(buffer)]).await?;
        loaded.as_bool().ok_or_else(|| {
            RpcError::Protocol(format!("nvim_buf_is_loaded returned {loaded}"))
        })
    }

    /// Cursor of the current window as 1-based line and column.
    ///
    /// `nvim_win_get_cursor` reports a 0-based byte column; it is shifted so
    /// both coordinates match what `cursor()` accepts.
    pub async fn window_cursor(&mut self) -> Result<CursorPosition, RpcError> {
        let pos = self.call("nvim_win_get_cursor", vec![Value::from(0)]).await?;
        let pair = pos.as_array().filter(|items| items.len() == 2).ok_or_else(|| {
            RpcError::Protocol(format!("nvim_win_get_cursor returned {pos}"))
        })?;

        let coord = |v: &Value| {
            v.as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| RpcError::Protocol(format!("invalid cursor coordinate {v}")))
        };
        Ok(CursorPosition {
            line: coord(&pair[0])?,
            column: coord(&pair[1])?.saturating_add(1),
        })
    }

    /// Move the cursor with `cursor()`, which clamps out-of-range columns.
    pub async fn set_cursor(&mut self, line: u32, column: u32) -> Result<(), RpcError> {
        self.call_function("cursor", vec![Value::from(line), Value::from(column)])
            .await?;
        Ok(())
    }
}

fn expect_string(value: Value, method: &str) -> Result<String, RpcError> {
    match value {
        Value::String(s) => s
            .into_str()
            .ok_or_else(|| RpcError::Protocol(format!("{method} returned invalid UTF-8"))),
        other => Err(RpcError::Protocol(format!("{method} returned {other}"))),
    }
}

/// Extract the human-readable part of a Neovim error object.
///
/// Neovim sends `[error_type, message]`; other servers may send a bare string.
fn remote_error_message(error: &Value) -> String {
    match error {
        Value::Array(items) => items
            .iter()
            .rev()
            .find_map(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        Value::String(s) => s.as_str().unwrap_or_default().to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(#[from] rmpv::decode::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("{method} timed out after {after:?}")]
    Timeout { method: String, after: Duration },
    #[error("connection closed by remote")]
    Closed,
    #[error("{0}")]
    Remote(String),
}

impl RpcError {
    /// The remote accepted the call but reported a failure.
    pub fn is_remote(&self) -> bool {
        matches!(self, RpcError::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_frame(stream: &mut UnixStream, buf: &mut Vec<u8>) -> Message {
        loop {
            if let Some((message, used)) = codec::decode(buf).unwrap() {
                buf.drain(..used);
                return message;
            }
            let n = stream.read_buf(buf).await.unwrap();
            assert!(n > 0, "peer closed");
        }
    }

    async fn write_frame(stream: &mut UnixStream, message: Message) {
        stream.write_all(&codec::encode(message).unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_call_returns_result() {
        let (client_end, mut server_end) = UnixStream::pair().unwrap();
        let mut client = RpcClient::from_stream(client_end, Duration::from_secs(5));

        let server = tokio::spawn(async move {
            let mut buf = Vec::new();
            let Message::Request { msgid, method, .. } = read_frame(&mut server_end, &mut buf).await else {
                panic!("expected request");
            };
            assert_eq!(method, "nvim_call_function");
            write_frame(&mut server_end, Message::Response {
                msgid,
                error: Value::Nil,
                result: Value::from("/home/me"),
            }).await;
        });

        assert_eq!(client.current_dir().await.unwrap(), "/home/me");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_remote_error_is_domain_failure() {
        let (client_end, mut server_end) = UnixStream::pair().unwrap();
        let mut client = RpcClient::from_stream(client_end, Duration::from_secs(5));

        tokio::spawn(async move {
            let mut buf = Vec::new();
            let Message::Request { msgid, .. } = read_frame(&mut server_end, &mut buf).await else {
                panic!("expected request");
            };
            write_frame(&mut server_end, Message::Response {
                msgid,
                error: Value::Array(vec![
                    Value::from(0),
                    Value::from("Vim:E492: Not an editor command: bogus"),
                ]),
                result: Value::Nil,
            }).await;
        });

        let err = client.command("bogus").await.unwrap_err();
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "Vim:E492: Not an editor command: bogus");
    }

    #[tokio::test]
    async fn test_skips_notifications_and_answers_requests() {
        let (client_end, mut server_end) = UnixStream::pair().unwrap();
        let mut client = RpcClient::from_stream(client_end, Duration::from_secs(5));

        let server = tokio::spawn(async move {
            let mut buf = Vec::new();
            let Message::Request { msgid, .. } = read_frame(&mut server_end, &mut buf).await else {
                panic!("expected request");
            };

            write_frame(&mut server_end, Message::Notification {
                method: "redraw".to_string(),
                params: vec![],
            }).await;
            write_frame(&mut server_end, Message::Request {
                msgid: 99,
                method: "vim_ask".to_string(),
                params: vec![],
            }).await;

            // The client must answer our request before we answer its call.
            let Message::Response { msgid: answered, error, .. } = read_frame(&mut server_end, &mut buf).await else {
                panic!("expected response to server request");
            };
            assert_eq!(answered, 99);
            assert!(!error.is_nil());

            write_frame(&mut server_end, Message::Response {
                msgid,
                error: Value::Nil,
                result: Value::Boolean(true),
            }).await;
        });

        assert!(client.buffer_is_loaded(1).await.unwrap());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_call_times_out_on_silent_peer() {
        let (client_end, _server_end) = UnixStream::pair().unwrap();
        let mut client = RpcClient::from_stream(client_end, Duration::from_millis(50));

        let err = client.command("echo 1").await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout { ref method, .. } if method == "nvim_command"));
        assert!(!err.is_remote());
    }

    #[tokio::test]
    async fn test_peer_hangup_is_transport_error() {
        let (client_end, server_end) = UnixStream::pair().unwrap();
        let mut client = RpcClient::from_stream(client_end, Duration::from_secs(5));
        drop(server_end);

        let err = client.current_buffer().await.unwrap_err();
        assert!(!err.is_remote());
    }

    #[tokio::test]
    async fn test_window_cursor_is_one_based() {
        let (client_end, mut server_end) = UnixStream::pair().unwrap();
        let mut client = RpcClient::from_stream(client_end, Duration::from_secs(5));

        tokio::spawn(async move {
            let mut buf = Vec::new();
            let Message::Request { msgid, .. } = read_frame(&mut server_end, &mut buf).await else {
                panic!("expected request");
            };
            write_frame(&mut server_end, Message::Response {
                msgid,
                error: Value::Nil,
                result: Value::Array(vec![Value::from(12), Value::from(0)]),
            }).await;
        });

        let pos = client.window_cursor().await.unwrap();
        assert_eq!(pos, CursorPosition { line: 12, column: 1 });
    }
}
