use std::fmt;

use serde_json::Value;

use crate::engine::EngineHandle;
use crate::frame::FramePosition;

// ── method names ──────────────────────────────────────────────────────────

pub const REGISTER_AUDIO_FRAME_OBSERVER: &str = "registerAudioFrameObserver";
pub const UNREGISTER_AUDIO_FRAME_OBSERVER: &str = "unregisterAudioFrameObserver";
pub const REGISTER_VIDEO_FRAME_OBSERVER: &str = "registerVideoFrameObserver";
pub const UNREGISTER_VIDEO_FRAME_OBSERVER: &str = "unregisterVideoFrameObserver";

/// Error code for malformed call arguments.
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
/// Error code for calls arriving after `detach`.
pub const CHANNEL_CLOSED: &str = "CHANNEL_CLOSED";

// ── call / result ─────────────────────────────────────────────────────────

/// One request from the application side of the control channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Reply to a `MethodCall`.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResult {
    Success(Value),
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResult {
    pub fn null() -> Self {
        MethodResult::Success(Value::Null)
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        MethodResult::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success(_))
    }
}

// ── arguments ─────────────────────────────────────────────────────────────

/// Arguments of a register call.
///
/// Either a bare engine handle, or a map
/// `{ "engineHandle": <int>, "position": <int> }` where `position` is the
/// observed video frame position bitmask.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RegistrationArgs {
    pub handle: EngineHandle,
    pub position: Option<FramePosition>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ArgumentError(pub String);

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ArgumentError {}

impl RegistrationArgs {
    pub fn parse(arguments: &Value) -> Result<Self, ArgumentError> {
        match arguments {
            Value::Number(_) => Ok(Self {
                handle: number_as_i64(arguments, "engine handle")?,
                position: None,
            }),
            Value::Object(map) => {
                let handle = map
                    .get("engineHandle")
                    .ok_or_else(|| ArgumentError("missing \"engineHandle\"".into()))?;
                let handle = number_as_i64(handle, "engineHandle")?;

                let position = match map.get("position") {
                    None | Some(Value::Null) => None,
                    Some(v) => {
                        let bits = number_as_i64(v, "position")?;
                        let bits = u32::try_from(bits)
                            .map_err(|_| ArgumentError(format!("position {bits} out of range")))?;
                        Some(FramePosition(bits))
                    }
                };
                Ok(Self { handle, position })
            }
            other => Err(ArgumentError(format!(
                "expected an engine handle, got {}",
                type_name(other)
            ))),
        }
    }
}

/// Integral numbers pass as-is; floating values are truncated like a
/// platform `Number.toLong()`.
fn number_as_i64(value: &Value, what: &str) -> Result<i64, ArgumentError> {
    let Value::Number(n) = value else {
        return Err(ArgumentError(format!("{what} must be a number, got {}", type_name(value))));
    };
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
        _ => Err(ArgumentError(format!("{what} {n} does not fit a 64-bit handle"))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}
