//! In-process fake Neovim for tests.
//!
//! Listens on `<dir>/nvim-<pid>.sock`, records every request it receives and
//! answers through a handler closure. [`default_reply`] models a small editor
//! session so tests only override the calls they care about.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rmpv::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

use crate::codec::{self, Message};
use crate::constants::{DEFAULT_SOCKET_PREFIX, SOCKET_SUFFIX};
use crate::types::Instance;

/// How the fake answers one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Value),
    /// Error response carrying `[0, message]`, like Neovim.
    Err(String),
    /// Never answer.
    Silent,
    /// Drop the connection without answering.
    Hangup,
}

/// One recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub params: Vec<Value>,
}

impl Call {
    /// First string parameter, if any.
    pub fn arg_str(&self) -> Option<&str> {
        self.params.first().and_then(Value::as_str)
    }
}

type Handler = Arc<dyn Fn(&str, &[Value]) -> Reply + Send + Sync>;

pub struct FakeNvim {
    socket_path: PathBuf,
    pid: u32,
    calls: Arc<Mutex<Vec<Call>>>,
    closed: Arc<AtomicUsize>,
    accept_task: tokio::task::JoinHandle<()>,
}

impl FakeNvim {
    /// Bind the socket and start serving. Must be called inside a tokio runtime.
    pub fn start<H>(dir: &Path, pid: u32, handler: H) -> Self
    where
        H: Fn(&str, &[Value]) -> Reply + Send + Sync + 'static,
    {
        let socket_path = dir.join(format!("{DEFAULT_SOCKET_PREFIX}-{pid}.{SOCKET_SUFFIX}"));
        let listener = UnixListener::bind(&socket_path).expect("bind fake nvim socket");

        let handler: Handler = Arc::new(handler);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicUsize::new(0));

        let accept_task = {
            let calls = Arc::clone(&calls);
            let closed = Arc::clone(&closed);
            tokio::spawn(async move {
                while let Ok((stream, _addr)) = listener.accept().await {
                    let handler = Arc::clone(&handler);
                    let calls = Arc::clone(&calls);
                    let closed = Arc::clone(&closed);
                    tokio::spawn(async move {
                        serve(stream, handler, calls).await;
                        closed.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        };

        Self {
            socket_path,
            pid,
            calls,
            closed,
            accept_task,
        }
    }

    pub fn instance(&self) -> Instance {
        Instance {
            socket_path: self.socket_path.clone(),
            id: self.pid,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// All requests received so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Method names received so far, in arrival order.
    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    /// Number of client connections that have ended.
    pub fn closed_connections(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` connections have ended, panicking after 2s.
    pub async fn wait_for_closed(&self, n: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.closed_connections() < n {
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "expected {n} closed connections, saw {}",
                    self.closed_connections()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for FakeNvim {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve(mut stream: UnixStream, handler: Handler, calls: Arc<Mutex<Vec<Call>>>) {
    let mut buf = Vec::new();
    loop {
        let message = match codec::decode(&buf) {
            Ok(Some((message, used))) => {
                buf.drain(..used);
                message
            }
            Ok(None) => match stream.read_buf(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => continue,
            },
            Err(_) => return,
        };

        let Message::Request { msgid, method, params } = message else {
            continue;
        };

        if let Ok(mut log) = calls.lock() {
            log.push(Call {
                method: method.clone(),
                params: params.clone(),
            });
        }

        let (error, result) = match handler(&method, &params) {
            Reply::Ok(value) => (Value::Nil, value),
            Reply::Err(message) => (
                Value::Array(vec![Value::from(0), Value::from(message)]),
                Value::Nil,
            ),
            Reply::Silent => continue,
            Reply::Hangup => return,
        };

        let Ok(frame) = codec::encode(Message::Response { msgid, error, result }) else {
            return;
        };
        if stream.write_all(&frame).await.is_err() {
            return;
        }
    }
}

/// Replies of a small editor session rooted at `/work`.
///
/// Buffers: 1 `/work/src/main.rs` (current, loaded), 2 `/work/README.md`
/// (loaded), 3 unnamed (not loaded). Cursor at line 10, byte column 4.
pub fn default_reply(method: &str, params: &[Value]) -> Reply {
    let first = params.first();
    match method {
        "nvim_call_function" => {
            let name = first.and_then(Value::as_str).unwrap_or_default();
            let args = params.get(1).and_then(Value::as_array);
            match name {
                "getcwd" => Reply::Ok(Value::from("/work")),
                "fnameescape" => {
                    let path = args
                        .and_then(|a| a.first())
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    Reply::Ok(Value::from(path.replace(' ', "\\ ")))
                }
                "cursor" => Reply::Ok(Value::from(0)),
                other => Reply::Err(format!("Vim:E117: Unknown function: {other}")),
            }
        }
        "nvim_get_current_buf" => Reply::Ok(codec::encode_buffer_handle(1)),
        "nvim_list_bufs" => Reply::Ok(Value::Array(
            [1, 2, 3].into_iter().map(codec::encode_buffer_handle).collect(),
        )),
        "nvim_buf_get_name" => {
            let name = match first.map(codec::decode_handle) {
                Some(Ok(1)) => "/work/src/main.rs",
                Some(Ok(2)) => "/work/README.md",
                _ => "",
            };
            Reply::Ok(Value::from(name))
        }
        "nvim_buf_is_loaded" => {
            let loaded = matches!(first.map(codec::decode_handle), Some(Ok(1 | 2)));
            Reply::Ok(Value::Boolean(loaded))
        }
        "nvim_win_get_cursor" => Reply::Ok(Value::Array(vec![Value::from(10), Value::from(4)])),
        "nvim_command" => Reply::Ok(Value::Nil),
        "nvim_exec2" => Reply::Ok(Value::Map(vec![(Value::from("output"), Value::from(""))])),
        "nvim_input" => {
            let len = first.and_then(Value::as_str).map(str::len).unwrap_or(0);
            Reply::Ok(Value::from(len as u64))
        }
        other => Reply::Err(format!("Invalid method: {other}")),
    }
}
