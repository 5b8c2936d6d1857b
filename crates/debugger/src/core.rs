//! Debug engine core: step-mode state machine, breakpoint table, call stack,
//! and the evaluator<->frontend pause/resume rendezvous (§4.2, §5).

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, OnceLock, RwLock};

use ez_ast::{effective_location, AstNode, Location};
use ez_value::SharedEnv;

use crate::handler::EventHandler;

/// Debugger configuration read once at construction (SPEC_FULL ambient
/// config section).
#[derive(Debug, Clone)]
pub struct DebuggerConfig {
    /// `EZ_DEBUGGER_LOG`: recorded at construction and emitted once via
    /// `tracing::debug!`. The debugger itself never installs a global
    /// subscriber or `EnvFilter` — like the teacher's `lsp` binary, that is
    /// the hosting binary's job (e.g. `tracing_subscriber::fmt()
    /// .with_env_filter(...)`); a library crate with many call sites and
    /// tests cannot safely call `.init()` itself.
    pub log_level: Option<String>,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self { log_level: None }
    }
}

impl DebuggerConfig {
    pub fn from_env() -> Self {
        let log_level = std::env::var("EZ_DEBUGGER_LOG").ok().filter(|s| !s.is_empty());
        Self { log_level }
    }
}

/// Stepping control state (§4.2). Initial state is `Continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Continue,
    StepInto,
    StepOver,
    StepOut,
}

/// A single set/cleared breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    pub file: String,
    pub line: u32,
    /// Stored, never evaluated (§4.2, §9 Open Questions).
    pub condition: Option<String>,
    pub enabled: bool,
}

/// One entry on the call stack (§4.2 `push_frame`).
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub name: String,
    pub location: Option<Location>,
    pub env: SharedEnv,
    pub depth: usize,
}

/// The debugger's internal, lock-guarded state (§5 "one reader/writer
/// lock; all field reads use shared access, all mutations use exclusive
/// access").
struct DebuggerState {
    enabled: bool,
    step_mode: StepMode,
    step_depth: usize,
    paused: bool,
    breakpoints: HashMap<String, HashMap<u32, Breakpoint>>,
    frames: Vec<CallFrame>,
    current_location: Option<Location>,
}

impl DebuggerState {
    fn new() -> Self {
        Self {
            enabled: true,
            step_mode: StepMode::Continue,
            step_depth: 0,
            paused: false,
            breakpoints: HashMap::new(),
            frames: Vec::new(),
            current_location: None,
        }
    }

    fn breakpoint_at(&self, location: &Location) -> Option<Breakpoint> {
        self.breakpoints
            .get(&location.file)
            .and_then(|by_line| by_line.get(&location.line))
            .filter(|bp| bp.enabled)
            .cloned()
    }

    fn should_pause(&self, node: &dyn AstNode) -> Option<PauseReason> {
        if !self.enabled {
            return None;
        }
        let location = effective_location(node)?;
        let depth = self.frames.len();

        match self.step_mode {
            StepMode::Continue => self
                .breakpoint_at(&location)
                .map(PauseReason::Breakpoint),
            StepMode::StepInto => {
                node.kind().is_steppable().then_some(PauseReason::Step)
            }
            StepMode::StepOver => (node.kind().is_steppable() && depth <= self.step_depth)
                .then_some(PauseReason::Step),
            StepMode::StepOut => (depth < self.step_depth).then_some(PauseReason::Step),
        }
    }
}

enum PauseReason {
    Breakpoint(Breakpoint),
    Step,
}

/// Single-slot, non-blocking resume rendezvous (§4.2, §9 "blocking
/// rendezvous"). A `Condvar` guarding a "resume requested" flag, rather
/// than a bounded channel: equivalent semantics, simpler to reason about
/// under the single internal lock.
struct Rendezvous {
    mutex: Mutex<bool>,
    condvar: Condvar,
}

impl Rendezvous {
    fn new() -> Self {
        Self {
            mutex: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Block until a resume is requested, then clear the flag.
    fn wait(&self) {
        let mut requested = self.mutex.lock().unwrap();
        while !*requested {
            requested = self.condvar.wait(requested).unwrap();
        }
        *requested = false;
    }

    /// Non-blocking: set the flag and wake any waiter. A resume sent
    /// while nothing is waiting is absorbed by the next `wait`; a
    /// redundant resume while one is already pending is a no-op.
    fn signal(&self) {
        let mut requested = self.mutex.lock().unwrap();
        *requested = true;
        self.condvar.notify_one();
    }
}

/// The debug engine: evaluator-facing hooks plus frontend-facing controls.
pub struct Debugger {
    state: RwLock<DebuggerState>,
    rendezvous: Rendezvous,
    handler: Box<dyn EventHandler>,
    config: DebuggerConfig,
}

impl Debugger {
    pub fn new(handler: Box<dyn EventHandler>) -> Self {
        Self::with_config(handler, DebuggerConfig::from_env())
    }

    pub fn with_config(handler: Box<dyn EventHandler>, config: DebuggerConfig) -> Self {
        if let Some(level) = &config.log_level {
            tracing::debug!(level, "debugger log level configured");
        }
        Self {
            state: RwLock::new(DebuggerState::new()),
            rendezvous: Rendezvous::new(),
            handler,
            config,
        }
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.write().unwrap().enabled = enabled;
        tracing::trace!(enabled, "debugger enabled state changed");
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().unwrap().enabled
    }

    pub fn step_mode(&self) -> StepMode {
        self.state.read().unwrap().step_mode
    }

    fn transition(&self, mode: StepMode) {
        let mut state = self.state.write().unwrap();
        let depth = state.frames.len();
        state.step_mode = mode;
        if !matches!(mode, StepMode::Continue) {
            state.step_depth = depth;
        }
        tracing::debug!(?mode, depth, "step mode transition");
    }

    pub fn request_continue(&self) {
        self.transition(StepMode::Continue);
        self.rendezvous.signal();
    }

    pub fn request_step_into(&self) {
        self.transition(StepMode::StepInto);
        self.rendezvous.signal();
    }

    pub fn request_step_over(&self) {
        self.transition(StepMode::StepOver);
        self.rendezvous.signal();
    }

    pub fn request_step_out(&self) {
        self.transition(StepMode::StepOut);
        self.rendezvous.signal();
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().unwrap().paused
    }

    pub fn set_breakpoint(&self, file: impl Into<String>, line: u32, condition: Option<String>) {
        let file = file.into();
        let mut state = self.state.write().unwrap();
        let by_line = state.breakpoints.entry(file.clone()).or_default();
        by_line.insert(
            line,
            Breakpoint {
                file: file.clone(),
                line,
                condition,
                enabled: true,
            },
        );
        tracing::debug!(file, line, "breakpoint set");
    }

    pub fn clear_breakpoint(&self, file: &str, line: u32) {
        let mut state = self.state.write().unwrap();
        if let Some(by_line) = state.breakpoints.get_mut(file) {
            by_line.remove(&line);
            if by_line.is_empty() {
                state.breakpoints.remove(file);
            }
        }
        tracing::debug!(file, line, "breakpoint cleared");
    }

    /// Flat snapshot of every set breakpoint, order unspecified.
    pub fn get_breakpoints(&self) -> Vec<Breakpoint> {
        self.state
            .read()
            .unwrap()
            .breakpoints
            .values()
            .flat_map(|by_line| by_line.values().cloned())
            .collect()
    }

    pub fn current_location(&self) -> Option<Location> {
        self.state.read().unwrap().current_location.clone()
    }

    pub fn frames(&self) -> Vec<CallFrame> {
        self.state.read().unwrap().frames.clone()
    }

    /// Walk `frame_index`'s environment chain outward; inner bindings
    /// shadow outer. `frame_index` counts from the innermost frame (0 =
    /// the frame most recently pushed), per §4.2; `frames` itself is
    /// stored outermost-first since `push_frame` appends. Out of range
    /// yields an empty map.
    pub fn get_variables(&self, frame_index: usize) -> HashMap<String, ez_value::Value> {
        let state = self.state.read().unwrap();
        let index = state.frames.len().checked_sub(1 + frame_index);
        match index.and_then(|i| state.frames.get(i)) {
            Some(frame) => frame.env.borrow().flatten(),
            None => HashMap::new(),
        }
    }

    /// Called before evaluating any AST node (§4.2).
    pub fn before_eval(&self, node: &dyn AstNode, _env: &SharedEnv) {
        if !self.is_enabled() {
            return;
        }

        let reason = {
            let mut state = self.state.write().unwrap();
            let location = effective_location(node);
            state.current_location = location.clone();
            match location {
                Some(_) => state.should_pause(node),
                None => None,
            }
        };

        let Some(reason) = reason else { return };

        {
            let mut state = self.state.write().unwrap();
            state.paused = true;
        }

        match reason {
            PauseReason::Breakpoint(bp) => self.handler.on_breakpoint(self, &bp),
            PauseReason::Step => self.handler.on_step(self, node),
        }

        self.rendezvous.wait();

        self.state.write().unwrap().paused = false;
    }

    /// Reserved for watch expressions; a no-op today (§4.2).
    pub fn after_eval(&self, _node: &dyn AstNode, _result: &ez_value::Value, _env: &SharedEnv) {}

    pub fn push_frame(
        &self,
        name: impl Into<String>,
        node: &dyn AstNode,
        env: SharedEnv,
        _location: Option<Location>,
    ) {
        let frame = {
            let mut state = self.state.write().unwrap();
            let depth = state.frames.len();
            let frame = CallFrame {
                name: name.into(),
                location: effective_location(node),
                env,
                depth,
            };
            state.frames.push(frame.clone());
            frame
        };
        tracing::trace!(name = %frame.name, depth = frame.depth, "call frame pushed");
        self.handler.on_function_call(self, &frame);
    }

    pub fn pop_frame(&self, result: &ez_value::Value) {
        let frame = self.state.write().unwrap().frames.pop();
        if let Some(frame) = frame {
            tracing::trace!(name = %frame.name, depth = frame.depth, "call frame popped");
            self.handler.on_function_return(self, &frame, result);
        }
    }
}

/// Process-wide optional debugger reference (§4.2 "Global debugger
/// handle"), guarded by its own lock independent of the debugger's
/// internal lock.
static GLOBAL_DEBUGGER: OnceLock<RwLock<Option<std::sync::Arc<Debugger>>>> = OnceLock::new();

fn global_slot() -> &'static RwLock<Option<std::sync::Arc<Debugger>>> {
    GLOBAL_DEBUGGER.get_or_init(|| RwLock::new(None))
}

/// Install the process-wide debugger handle, replacing any previous one.
pub fn install_global(debugger: std::sync::Arc<Debugger>) {
    *global_slot().write().unwrap() = Some(debugger);
}

/// Remove the process-wide debugger handle.
pub fn uninstall_global() {
    *global_slot().write().unwrap() = None;
}

/// Fetch the process-wide debugger handle, if one is installed.
pub fn global() -> Option<std::sync::Arc<Debugger>> {
    global_slot().read().unwrap().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ez_ast::{NodeKind, StubNode};
    use ez_value::Environment;
    use serial_test::serial;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    struct RecordingHandler {
        breakpoints: Mutex<Vec<Breakpoint>>,
        steps: std::sync::Arc<Mutex<usize>>,
    }

    impl RecordingHandler {
        fn new() -> Self {
            Self::with_steps(std::sync::Arc::new(Mutex::new(0)))
        }

        fn with_steps(steps: std::sync::Arc<Mutex<usize>>) -> Self {
            Self {
                breakpoints: Mutex::new(Vec::new()),
                steps,
            }
        }
    }

    impl EventHandler for RecordingHandler {
        fn on_breakpoint(&self, debugger: &Debugger, bp: &Breakpoint) {
            self.breakpoints.lock().unwrap().push(bp.clone());
            debugger.request_continue();
        }

        fn on_step(&self, debugger: &Debugger, _node: &dyn AstNode) {
            *self.steps.lock().unwrap() += 1;
            debugger.request_continue();
        }
    }

    fn shared_env() -> SharedEnv {
        Rc::new(RefCell::new(Environment::new()))
    }

    #[test]
    fn continue_mode_pauses_only_on_enabled_breakpoint() {
        let debugger = Debugger::new(Box::new(RecordingHandler::new()));
        debugger.set_breakpoint("foo.ez", 10, None);

        let node = StubNode::new(
            NodeKind::ExpressionStatement,
            Location::new("foo.ez", 10, 1),
        );
        debugger.before_eval(&node, &shared_env());

        let other = StubNode::new(
            NodeKind::ExpressionStatement,
            Location::new("foo.ez", 11, 1),
        );
        debugger.before_eval(&other, &shared_env());

        assert!(!debugger.is_paused());
    }

    #[test]
    fn step_over_skips_inner_call_and_fires_after_pop() {
        let steps = Arc::new(Mutex::new(0));
        let debugger = Debugger::new(Box::new(RecordingHandler::with_steps(Arc::clone(&steps))));
        debugger.request_step_over();

        let inner = StubNode::new(NodeKind::ExpressionStatement, Location::new("f.ez", 5, 1));
        let env = shared_env();
        debugger.push_frame("callee", &inner, Rc::clone(&env), None);
        debugger.before_eval(&inner, &env);
        assert!(!debugger.is_paused());
        assert_eq!(*steps.lock().unwrap(), 0);

        debugger.pop_frame(&ez_value::Value::Nil);

        let after = StubNode::new(NodeKind::ExpressionStatement, Location::new("f.ez", 6, 1));
        debugger.before_eval(&after, &env);
        assert_eq!(*steps.lock().unwrap(), 1);
    }

    #[test]
    fn step_out_pauses_once_depth_drops_below_step_depth() {
        let steps = std::sync::Arc::new(Mutex::new(0));
        let debugger = Debugger::new(Box::new(RecordingHandler::with_steps(Arc::clone(&steps))));
        let env = shared_env();
        let node = StubNode::new(NodeKind::ExpressionStatement, Location::new("f.ez", 1, 1));
        debugger.push_frame("callee", &node, Rc::clone(&env), None);
        debugger.request_step_out();

        // Still inside the callee: depth (1) is not below step_depth (1).
        debugger.before_eval(&node, &env);
        assert_eq!(*steps.lock().unwrap(), 0);

        debugger.pop_frame(&ez_value::Value::Nil);
        // Back in the caller: depth (0) is now below step_depth (1).
        debugger.before_eval(&node, &env);
        assert_eq!(*steps.lock().unwrap(), 1);
    }

    #[test]
    fn breakpoint_table_is_idempotent() {
        let debugger = Debugger::new(Box::new(RecordingHandler::new()));
        debugger.set_breakpoint("a.ez", 1, None);
        debugger.set_breakpoint("a.ez", 1, None);
        assert_eq!(debugger.get_breakpoints().len(), 1);

        debugger.clear_breakpoint("a.ez", 1);
        debugger.clear_breakpoint("a.ez", 1);
        assert_eq!(debugger.get_breakpoints().len(), 0);
    }

    #[test]
    fn out_of_range_frame_yields_empty_variables() {
        let debugger = Debugger::new(Box::new(RecordingHandler::new()));
        assert!(debugger.get_variables(0).is_empty());
    }

    #[test]
    #[serial]
    fn global_handle_round_trips() {
        uninstall_global();
        assert!(global().is_none());
        let debugger = std::sync::Arc::new(Debugger::new(Box::new(RecordingHandler::new())));
        install_global(std::sync::Arc::clone(&debugger));
        assert!(global().is_some());
        uninstall_global();
        assert!(global().is_none());
    }

    #[test]
    #[serial]
    fn config_from_env_reads_debugger_log() {
        let _guard = crate::test_support::env_lock();
        let orig = std::env::var("EZ_DEBUGGER_LOG").ok();
        unsafe { std::env::set_var("EZ_DEBUGGER_LOG", "trace") };

        let config = DebuggerConfig::from_env();
        assert_eq!(config.log_level.as_deref(), Some("trace"));

        match orig {
            Some(v) => unsafe { std::env::set_var("EZ_DEBUGGER_LOG", v) },
            None => unsafe { std::env::remove_var("EZ_DEBUGGER_LOG") },
        }
    }
}
