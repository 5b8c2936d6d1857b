//! Black-box scenarios against `ez_debugger`'s public API, combining
//! `ez_ast` and `ez_value` the way a real evaluator would (spec §8
//! scenarios 3-4).

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use ez_ast::{Location, NodeKind, StubNode};
use ez_debugger::{Breakpoint, CallFrame, Debugger, EventHandler, StepMode};
use ez_value::{Environment, SharedEnv, Value};

struct RecordingHandler {
    breakpoints_hit: Arc<Mutex<Vec<Breakpoint>>>,
    steps_hit: Arc<Mutex<usize>>,
}

impl RecordingHandler {
    fn new(breakpoints_hit: Arc<Mutex<Vec<Breakpoint>>>, steps_hit: Arc<Mutex<usize>>) -> Self {
        Self {
            breakpoints_hit,
            steps_hit,
        }
    }
}

impl EventHandler for RecordingHandler {
    fn on_breakpoint(&self, debugger: &Debugger, breakpoint: &Breakpoint) {
        self.breakpoints_hit.lock().unwrap().push(breakpoint.clone());
        debugger.request_continue();
    }

    fn on_step(&self, debugger: &Debugger, _node: &dyn ez_ast::AstNode) {
        *self.steps_hit.lock().unwrap() += 1;
        debugger.request_continue();
    }

    fn on_function_call(&self, _debugger: &Debugger, _frame: &CallFrame) {}
    fn on_function_return(&self, _debugger: &Debugger, _frame: &CallFrame, _result: &Value) {}
}

fn env() -> SharedEnv {
    Rc::new(RefCell::new(Environment::new()))
}

#[test]
fn scenario_3_breakpoint_hit_under_continue() {
    let breakpoints_hit = Arc::new(Mutex::new(Vec::new()));
    let steps_hit = Arc::new(Mutex::new(0));
    let debugger = Debugger::new(Box::new(RecordingHandler::new(
        Arc::clone(&breakpoints_hit),
        steps_hit,
    )));
    debugger.set_breakpoint("foo.ez", 10, None);

    let hit = StubNode::new(NodeKind::ExpressionStatement, Location::new("foo.ez", 10, 1));
    debugger.before_eval(&hit, &env());
    assert!(!debugger.is_paused());
    let recorded = breakpoints_hit.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].file, "foo.ez");
    assert_eq!(recorded[0].line, 10);
    drop(recorded);

    let elsewhere = StubNode::new(NodeKind::ExpressionStatement, Location::new("foo.ez", 11, 1));
    debugger.before_eval(&elsewhere, &env());
    assert!(!debugger.is_paused());
    assert_eq!(breakpoints_hit.lock().unwrap().len(), 1);
}

#[test]
fn scenario_4_step_over_skips_inner_call() {
    let breakpoints_hit = Arc::new(Mutex::new(Vec::new()));
    let steps_hit = Arc::new(Mutex::new(0));
    let debugger = Debugger::new(Box::new(RecordingHandler::new(
        breakpoints_hit,
        Arc::clone(&steps_hit),
    )));
    debugger.request_step_over();
    assert_eq!(debugger.step_mode(), StepMode::StepOver);

    let callee_env = env();
    let inner = StubNode::new(NodeKind::ExpressionStatement, Location::new("callee.ez", 2, 1));
    debugger.push_frame("callee", &inner, Rc::clone(&callee_env), None);
    debugger.before_eval(&inner, &callee_env);
    // Depth 1 > step_depth 0: the inner call is skipped.
    assert_eq!(*steps_hit.lock().unwrap(), 0);

    debugger.pop_frame(&Value::Nil);

    let outer = StubNode::new(NodeKind::ExpressionStatement, Location::new("caller.ez", 3, 1));
    debugger.before_eval(&outer, &env());
    // Back at depth 0: the next steppable node pauses.
    assert_eq!(*steps_hit.lock().unwrap(), 1);
}
