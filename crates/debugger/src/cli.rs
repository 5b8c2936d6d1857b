//! Interactive CLI debug frontend (§4.3.1).

use std::io::{BufRead, Write};
use std::sync::Mutex;

use ez_ast::AstNode;
use ez_value::Value;

use crate::core::{Breakpoint, CallFrame, Debugger};
use crate::handler::EventHandler;

/// Shared source text, keyed by file, so the CLI can print context lines
/// around a stop location. The debugger core never reads source text; this
/// is purely a frontend concern.
pub trait SourceProvider: Send + Sync {
    fn lines(&self, file: &str) -> Vec<String>;
}

struct CliState {
    previous_command: String,
}

/// Interactive command-loop frontend over a reader/writer pair.
pub struct CliHandler<R, W> {
    io: Mutex<(R, W)>,
    source: Box<dyn SourceProvider>,
    state: Mutex<CliState>,
}

impl<R: BufRead + Send, W: Write + Send> CliHandler<R, W> {
    pub fn new(reader: R, writer: W, source: Box<dyn SourceProvider>) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
            source,
            state: Mutex::new(CliState {
                previous_command: "step".to_string(),
            }),
        }
    }

    fn print_context(&self, file: &str, line: u32) {
        let lines = self.source.lines(file);
        let mut io = self.io.lock().unwrap();
        let _ = writeln!(io.1, "-> {file}:{line}");
        let start = line.saturating_sub(2).max(1);
        let end = line + 2;
        for n in start..=end {
            let Some(text) = lines.get((n - 1) as usize) else {
                continue;
            };
            let marker = if n == line { "=>" } else { "  " };
            let _ = writeln!(io.1, "{marker} {n:4} | {text}");
        }
    }

    fn print_backtrace(&self, debugger: &Debugger) {
        let frames = debugger.frames();
        let mut io = self.io.lock().unwrap();
        for (i, frame) in frames.iter().enumerate() {
            let marker = if i + 1 == frames.len() { "\u{25b6}" } else { " " };
            let location = frame
                .location
                .as_ref()
                .map(|l| format!("{l}"))
                .unwrap_or_else(|| "?".to_string());
            let _ = writeln!(io.1, "{marker} #{i} {} ({location})", frame.name);
        }
    }

    fn print_help(&self) {
        let mut io = self.io.lock().unwrap();
        let _ = writeln!(
            io.1,
            "continue(c) step(s) next(n) out(o) break(b) backtrace(bt) list(l) print(p) vars(v) help(h) quit(q)"
        );
    }

    fn print_vars(&self, debugger: &Debugger, frame_index: usize) {
        let vars = debugger.get_variables(frame_index);
        let mut io = self.io.lock().unwrap();
        for (name, value) in &vars {
            let _ = writeln!(io.1, "{name} = {}", value.inspect());
        }
    }

    fn print_var(&self, debugger: &Debugger, name: &str) {
        let vars = debugger.get_variables(0);
        let mut io = self.io.lock().unwrap();
        match vars.get(name) {
            Some(v) => {
                let _ = writeln!(io.1, "{name} = {}", v.inspect());
            }
            None => {
                let _ = writeln!(io.1, "no such variable: {name}");
            }
        }
    }

    /// Read one command line, falling back to the previous command on an
    /// empty line. Returns `None` on EOF.
    fn read_command(&self) -> Option<String> {
        let mut line = String::new();
        let read = {
            let mut io = self.io.lock().unwrap();
            io.0.read_line(&mut line)
        };
        match read {
            Ok(0) => None,
            Ok(_) => {
                let trimmed = line.trim().to_string();
                let mut state = self.state.lock().unwrap();
                let command = if trimmed.is_empty() {
                    state.previous_command.clone()
                } else {
                    trimmed
                };
                state.previous_command = command.clone();
                Some(command)
            }
            Err(_) => None,
        }
    }

    /// Drive the command loop until a control-transferring command is
    /// issued (continue/step/next/out) or EOF is reached.
    fn command_loop(&self, debugger: &Debugger) {
        loop {
            let Some(line) = self.read_command() else {
                std::process::exit(0);
            };
            let mut parts = line.splitn(2, ' ');
            let command = parts.next().unwrap_or("");
            let arg = parts.next().unwrap_or("").trim();

            match command {
                "continue" | "c" => {
                    debugger.request_continue();
                    return;
                }
                "step" | "s" => {
                    debugger.request_step_into();
                    return;
                }
                "next" | "n" => {
                    debugger.request_step_over();
                    return;
                }
                "out" | "o" => {
                    debugger.request_step_out();
                    return;
                }
                "break" | "b" => self.handle_break(debugger, arg),
                "backtrace" | "stack" | "bt" => self.print_backtrace(debugger),
                "list" | "l" => {
                    if let Some(location) = debugger.current_location() {
                        self.print_context(&location.file, location.line);
                    }
                }
                "print" | "p" => self.print_var(debugger, arg),
                "vars" | "v" => {
                    let frame_index = arg.parse().unwrap_or(0);
                    self.print_vars(debugger, frame_index);
                }
                "help" | "h" | "?" => self.print_help(),
                "quit" | "q" => std::process::exit(0),
                other => {
                    let mut io = self.io.lock().unwrap();
                    let _ = writeln!(io.1, "unknown command: {other}");
                }
            }
        }
    }

    fn handle_break(&self, debugger: &Debugger, arg: &str) {
        if arg.is_empty() {
            let mut io = self.io.lock().unwrap();
            for bp in debugger.get_breakpoints() {
                let _ = writeln!(io.1, "{}:{}", bp.file, bp.line);
            }
            return;
        }
        if let Some((file, line)) = arg.rsplit_once(':') {
            if let Ok(line) = line.parse::<u32>() {
                debugger.set_breakpoint(file, line, None);
            }
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> EventHandler for CliHandler<R, W> {
    fn on_breakpoint(&self, debugger: &Debugger, breakpoint: &Breakpoint) {
        self.print_context(&breakpoint.file, breakpoint.line);
        self.command_loop(debugger);
    }

    fn on_step(&self, debugger: &Debugger, _node: &dyn AstNode) {
        if let Some(location) = debugger.current_location() {
            self.print_context(&location.file, location.line);
        }
        self.command_loop(debugger);
    }

    fn on_function_call(&self, _debugger: &Debugger, frame: &CallFrame) {
        tracing::trace!(name = %frame.name, "cli observed function call");
    }

    fn on_function_return(&self, _debugger: &Debugger, frame: &CallFrame, result: &Value) {
        tracing::trace!(name = %frame.name, result = %result.inspect(), "cli observed function return");
    }

    fn on_error(&self, _debugger: &Debugger, message: &str) {
        let mut io = self.io.lock().unwrap();
        let _ = writeln!(io.1, "ERROR: {message}");
    }
}
