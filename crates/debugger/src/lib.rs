pub mod cli;
pub mod core;
pub mod handler;
pub mod json;

pub use core::{
    global, install_global, uninstall_global, Breakpoint, CallFrame, Debugger, DebuggerConfig,
    StepMode,
};
pub use handler::EventHandler;
