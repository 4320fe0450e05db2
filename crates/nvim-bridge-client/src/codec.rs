//! msgpack-rpc framing.
//!
//! Neovim speaks msgpack-rpc over its `--listen` socket. Every frame is a
//! single msgpack array:
//!
//! ```text
//!   request       [0, msgid, method, params]
//!   response      [1, msgid, error, result]
//!   notification  [2, method, params]
//! ```
//!
//! Frames are not length-prefixed, so decoding works on a growing buffer and
//! reports "need more bytes" instead of failing on a short read.

use std::io::{self, Cursor};

use rmpv::Value;

use crate::rpc::RpcError;

const REQUEST: u64 = 0;
const RESPONSE: u64 = 1;
const NOTIFICATION: u64 = 2;

/// A single msgpack-rpc frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request {
        msgid: u32,
        method: String,
        params: Vec<Value>,
    },
    Response {
        msgid: u32,
        error: Value,
        result: Value,
    },
    Notification {
        method: String,
        params: Vec<Value>,
    },
}

impl Message {
    fn into_value(self) -> Value {
        match self {
            Message::Request { msgid, method, params } => Value::Array(vec![
                Value::from(REQUEST),
                Value::from(msgid),
                Value::from(method),
                Value::Array(params),
            ]),
            Message::Response { msgid, error, result } => Value::Array(vec![
                Value::from(RESPONSE),
                Value::from(msgid),
                error,
                result,
            ]),
            Message::Notification { method, params } => Value::Array(vec![
                Value::from(NOTIFICATION),
                Value::from(method),
                Value::Array(params),
            ]),
        }
    }

    fn from_value(value: Value) -> Result<Self, RpcError> {
        let Value::Array(mut items) = value else {
            return Err(RpcError::Protocol(format!("frame is not an array: {value}")));
        };

        let kind = items.first().and_then(Value::as_u64);
        match (kind, items.len()) {
            (Some(REQUEST), 4) => {
                let params = take_params(items.pop())?;
                let method = take_string(items.pop(), "method")?;
                let msgid = take_msgid(items.pop())?;
                Ok(Message::Request { msgid, method, params })
            }
            (Some(RESPONSE), 4) => {
                let result = items.pop().unwrap_or(Value::Nil);
                let error = items.pop().unwrap_or(Value::Nil);
                let msgid = take_msgid(items.pop())?;
                Ok(Message::Response { msgid, error, result })
            }
            (Some(NOTIFICATION), 3) => {
                let params = take_params(items.pop())?;
                let method = take_string(items.pop(), "method")?;
                Ok(Message::Notification { method, params })
            }
            _ => Err(RpcError::Protocol(format!(
                "unrecognized frame: {}",
                Value::Array(items)
            ))),
        }
    }
}

fn take_msgid(value: Option<Value>) -> Result<u32, RpcError> {
    value
        .as_ref()
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| RpcError::Protocol("invalid msgid".to_string()))
}

fn take_string(value: Option<Value>, field: &str) -> Result<String, RpcError> {
    match value {
        Some(Value::String(s)) => s
            .into_str()
            .ok_or_else(|| RpcError::Protocol(format!("{field} is not valid UTF-8"))),
        _ => Err(RpcError::Protocol(format!("{field} is not a string"))),
    }
}

fn take_params(value: Option<Value>) -> Result<Vec<Value>, RpcError> {
    match value {
        Some(Value::Array(params)) => Ok(params),
        _ => Err(RpcError::Protocol("params is not an array".to_string())),
    }
}

/// Encode a frame to bytes.
pub fn encode(message: Message) -> Result<Vec<u8>, RpcError> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &message.into_value())
        .map_err(|e| RpcError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decode one frame from the front of `buf`.
///
/// Returns `Ok(None)` when `buf` holds only part of a frame, otherwise the
/// frame and the number of bytes it occupied.
pub fn decode(buf: &[u8]) -> Result<Option<(Message, usize)>, RpcError> {
    if buf.is_empty() {
        return Ok(None);
    }

    let mut cursor = Cursor::new(buf);
    match rmpv::decode::read_value(&mut cursor) {
        Ok(value) => {
            let used = cursor.position() as usize;
            Ok(Some((Message::from_value(value)?, used)))
        }
        Err(e) if is_incomplete(&e) => Ok(None),
        Err(e) => Err(RpcError::Decode(e)),
    }
}

fn is_incomplete(err: &rmpv::decode::Error) -> bool {
    match err {
        rmpv::decode::Error::InvalidMarkerRead(e) | rmpv::decode::Error::InvalidDataRead(e) => {
            e.kind() == io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}

/// Decode a Neovim object handle (buffer, window, tabpage).
///
/// Neovim sends handles as msgpack ext values wrapping an integer; plain
/// integers are accepted as well.
pub fn decode_handle(value: &Value) -> Result<i64, RpcError> {
    match value {
        Value::Ext(_, data) => {
            let inner = rmpv::decode::read_value(&mut data.as_slice())?;
            inner
                .as_i64()
                .ok_or_else(|| RpcError::Protocol(format!("ext handle is not an integer: {inner}")))
        }
        other => other
            .as_i64()
            .ok_or_else(|| RpcError::Protocol(format!("expected a handle, got {other}"))),
    }
}

/// Encode an integer handle the way Neovim sends buffer handles (ext type 0).
pub fn encode_buffer_handle(handle: i64) -> Value {
    let mut data = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = rmpv::encode::write_value(&mut data, &Value::from(handle));
    Value::Ext(0, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(msgid: u32, method: &str) -> Message {
        Message::Request {
            msgid,
            method: method.to_string(),
            params: vec![Value::from("arg")],
        }
    }

    #[test]
    fn test_partial_frame_needs_more_bytes() {
        let bytes = encode(request(7, "nvim_command")).unwrap();
        for cut in 1..bytes.len() {
            assert!(decode(&bytes[..cut]).unwrap().is_none(), "cut at {cut}");
        }
        let (message, used) = decode(&bytes).unwrap().unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(message, request(7, "nvim_command"));
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut bytes = encode(request(1, "a")).unwrap();
        let first_len = bytes.len();
        bytes.extend(encode(Message::Notification {
            method: "redraw".to_string(),
            params: vec![],
        }).unwrap());

        let (first, used) = decode(&bytes).unwrap().unwrap();
        assert_eq!(used, first_len);
        assert_eq!(first, request(1, "a"));

        let (second, _) = decode(&bytes[used..]).unwrap().unwrap();
        assert!(matches!(second, Message::Notification { ref method, .. } if method == "redraw"));
    }

    #[test]
    fn test_rejects_non_array_frame() {
        let mut bytes = Vec::new();
        rmpv::encode::write_value(&mut bytes, &Value::from(42)).unwrap();
        assert!(matches!(decode(&bytes), Err(RpcError::Protocol(_))));
    }

    #[test]
    fn test_rejects_unknown_frame_type() {
        let mut bytes = Vec::new();
        let frame = Value::Array(vec![Value::from(9), Value::from(1), Value::Nil, Value::Nil]);
        rmpv::encode::write_value(&mut bytes, &frame).unwrap();
        assert!(matches!(decode(&bytes), Err(RpcError::Protocol(_))));
    }

    #[test]
    fn test_handle_decoding() {
        assert_eq!(decode_handle(&encode_buffer_handle(3)).unwrap(), 3);
        assert_eq!(decode_handle(&Value::from(5)).unwrap(), 5);
        assert!(decode_handle(&Value::from("nope")).is_err());
    }
}
