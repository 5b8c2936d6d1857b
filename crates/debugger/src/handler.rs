//! The debugger event-handler contract (§4.3, §6).
//!
//! Both frontends (CLI and JSON) implement this trait. Handler failures
//! must never propagate to the evaluator (§7): implementations are
//! expected to catch their own errors and report them through `on_error`
//! or their own transport, not by panicking.

use crate::core::{Breakpoint, CallFrame, Debugger};
use ez_ast::AstNode;
use ez_value::Value;

pub trait EventHandler: Send + Sync {
    /// A breakpoint was hit; the evaluator is paused and waiting for a
    /// resume request issued from inside this call (or later, from
    /// another thread).
    fn on_breakpoint(&self, debugger: &Debugger, breakpoint: &Breakpoint);

    /// A step stop was hit (no breakpoint at this location).
    fn on_step(&self, debugger: &Debugger, node: &dyn AstNode);

    /// A function call frame was pushed.
    fn on_function_call(&self, _debugger: &Debugger, _frame: &CallFrame) {}

    /// A function call frame was popped, with its return value.
    fn on_function_return(&self, _debugger: &Debugger, _frame: &CallFrame, _result: &Value) {}

    /// A frontend-level error (malformed input, unknown command); never
    /// an evaluator error (those are in-band `Value::Error`s, §7).
    fn on_error(&self, _debugger: &Debugger, _message: &str) {}
}
