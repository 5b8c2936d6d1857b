//! Newline-delimited JSON debug protocol (§4.3.2).
//!
//! Every inbound message is `{ "type": "command", "command": <name>,
//! "params": {...} }`; every outbound message is `{ "type": "event",
//! "event": <name>, "data": {...} }`. Unrecognized commands and malformed
//! JSON never reach the evaluator (§7) — they become `error` events.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use serde_json::{json, Value as Json};

use crate::core::{Breakpoint, CallFrame, Debugger};
use crate::handler::EventHandler;
use ez_ast::AstNode;
use ez_value::Value;

/// Frontend-local parse/dispatch failures. Never propagated to the
/// evaluator; always reported as an `error` event (§7).
#[derive(Debug)]
pub enum ProtocolError {
    MalformedJson(serde_json::Error),
    UnknownCommand(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MalformedJson(e) => write!(f, "{e}"),
            ProtocolError::UnknownCommand(name) => write!(f, "unknown command: {name}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::MalformedJson(e) => Some(e),
            ProtocolError::UnknownCommand(_) => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::MalformedJson(e)
    }
}

/// Serializes outbound writes under its own lock (§4.3.2, §5).
pub struct JsonProtocol<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> JsonProtocol<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn send_event(&self, event: &str, data: Json) {
        let message = json!({ "type": "event", "event": event, "data": data });
        let mut line = message.to_string();
        line.push('\n');
        let mut writer = self.writer.lock().unwrap();
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    /// Parse and dispatch one inbound line against `debugger`. Returns the
    /// parsed command name on success, for callers that want to log it.
    pub fn handle_line(&self, debugger: &Debugger, line: &str) -> Result<String, ProtocolError> {
        let parsed: Json = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                let err = ProtocolError::from(e);
                self.send_event("error", json!({ "message": err.to_string() }));
                return Err(err);
            }
        };

        let command = parsed
            .get("command")
            .and_then(Json::as_str)
            .unwrap_or("")
            .to_string();
        let default_params = json!({});
        let params = parsed.get("params").unwrap_or(&default_params);

        match self.dispatch(debugger, &command, params) {
            Ok(()) => Ok(command),
            Err(err) => {
                self.send_event("error", json!({ "message": err.to_string() }));
                Err(err)
            }
        }
    }

    fn dispatch(&self, debugger: &Debugger, command: &str, params: &Json) -> Result<(), ProtocolError> {
        match command {
            "initialize" => {
                self.send_event("initialized", json!({}));
            }
            "start" => {
                debugger.request_step_into();
                self.send_event("started", json!({}));
            }
            "stepInto" => debugger.request_step_into(),
            "stepOver" => debugger.request_step_over(),
            "stepOut" => debugger.request_step_out(),
            "continue" => debugger.request_continue(),
            "setBreakpoint" => {
                let file = param_str(params, "file");
                let line = param_u32(params, "line");
                debugger.set_breakpoint(file.clone(), line, None);
                self.send_event("breakpointSet", json!({ "file": file, "line": line }));
            }
            "clearBreakpoint" => {
                let file = param_str(params, "file");
                let line = param_u32(params, "line");
                debugger.clear_breakpoint(&file, line);
                self.send_event("breakpointCleared", json!({ "file": file, "line": line }));
            }
            "getVariables" => {
                let frame_index = param_u32(params, "frameIndex") as usize;
                let vars = debugger.get_variables(frame_index);
                let data: serde_json::Map<String, Json> = vars
                    .into_iter()
                    .map(|(name, value)| (name, Json::String(value.inspect())))
                    .collect();
                self.send_event("variables", Json::Object(data));
            }
            "getStackTrace" => {
                let frames = debugger.frames();
                self.send_event("stackTrace", json!({ "frames": frames_json(&frames) }));
            }
            "evaluate" => {
                // Reserved (§4.3.2); intentionally a no-op today.
            }
            "terminate" => {
                self.send_event("terminated", json!({}));
            }
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        }
        Ok(())
    }
}

fn param_str(params: &Json, key: &str) -> String {
    params
        .get(key)
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Numeric JSON values are 64-bit floats (§4.3.2); truncate to u32.
fn param_u32(params: &Json, key: &str) -> u32 {
    params
        .get(key)
        .and_then(Json::as_f64)
        .map(|f| f as u32)
        .unwrap_or(0)
}

fn frames_json(frames: &[CallFrame]) -> Json {
    Json::Array(
        frames
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "depth": f.depth,
                    "location": f.location.as_ref().map(|l| json!({
                        "file": l.file,
                        "line": l.line,
                        "column": l.column,
                    })),
                })
            })
            .collect(),
    )
}

/// Event handler that reports debugger activity as protocol events.
pub struct JsonHandler<W: Write> {
    protocol: std::sync::Arc<JsonProtocol<W>>,
}

impl<W: Write> JsonHandler<W> {
    pub fn new(protocol: std::sync::Arc<JsonProtocol<W>>) -> Self {
        Self { protocol }
    }
}

impl<W: Write + Send + Sync> EventHandler for JsonHandler<W> {
    fn on_breakpoint(&self, debugger: &Debugger, breakpoint: &Breakpoint) {
        self.protocol.send_event(
            "stopped",
            json!({
                "reason": "breakpoint",
                "location": { "file": breakpoint.file, "line": breakpoint.line },
            }),
        );
        let _ = debugger;
    }

    fn on_step(&self, debugger: &Debugger, _node: &dyn AstNode) {
        let location = debugger.current_location();
        self.protocol.send_event(
            "stopped",
            json!({
                "reason": "step",
                "location": location.map(|l| json!({ "file": l.file, "line": l.line })),
            }),
        );
    }

    fn on_function_call(&self, _debugger: &Debugger, frame: &CallFrame) {
        self.protocol
            .send_event("output", json!({ "text": format!("-> {}", frame.name) }));
    }

    fn on_function_return(&self, _debugger: &Debugger, frame: &CallFrame, result: &Value) {
        self.protocol.send_event(
            "output",
            json!({ "text": format!("<- {} = {}", frame.name, result.inspect()) }),
        );
    }

    fn on_error(&self, _debugger: &Debugger, message: &str) {
        self.protocol.send_event("error", json!({ "message": message }));
    }
}
