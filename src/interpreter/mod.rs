/// Graph interpreter.
///
/// Walks the logic graph one node at a time, carrying the program scope,
/// a stack of activation frames for user-defined function calls, and
/// per-frame iteration state for `for each` loops. The function table is
/// borrowed from the graph and never mutated during a run.
mod builtins;
mod eval;
mod ops;

use std::collections::HashMap;
use std::io::{BufRead, Write};

use thiserror::Error;

use crate::ast::AskKind;
use crate::graph::{Graph, NodeId, Op};
use crate::value::{vyra_repr, Value};

/// Default ceiling on loop iterations; a watchdog against runaway programs.
pub const DEFAULT_ITERATION_LIMIT: u64 = 1_000_000;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("NameError: {0} is not defined")]
    Name(String),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ArityError: {name}() takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("DivisionByZero: division or modulo by zero")]
    DivisionByZero,
    #[error("IndexError: index {index} is out of range for length {len}")]
    Index { index: i64, len: usize },
    #[error("IterationLimitExceeded: loop ran more than {0} iterations")]
    IterationLimit(u64),
    #[error("InputError: {0}")]
    Input(String),
    #[error("IOError: {0}")]
    Io(String),
}

impl RuntimeError {
    /// Process exit code for this error when it escapes to the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            RuntimeError::Io(_) => 3,
            _ => 1,
        }
    }
}

/// Live iteration state of one `ForStep` node.
struct ForState {
    items: Vec<Value>,
    index: usize,
}

/// One activation record: the callee's locals, where to resume in the
/// caller, and where the caller wants the result bound.
struct Frame {
    locals: HashMap<String, Value>,
    return_target: Option<NodeId>,
    result_target: Option<String>,
    iters: HashMap<NodeId, ForState>,
}

pub struct Interpreter {
    globals: HashMap<String, Value>,
    frames: Vec<Frame>,
    base_iters: HashMap<NodeId, ForState>,
    iteration_limit: u64,
    iterations: u64,
    pub debug: bool,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_io(
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Box::new(std::io::stdout()),
        )
    }

    /// Build an interpreter over explicit streams. Tests pass cursors and
    /// shared buffers here; the CLI passes the process streams.
    pub fn with_io(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Interpreter {
            globals: HashMap::new(),
            frames: Vec::new(),
            base_iters: HashMap::new(),
            iteration_limit: DEFAULT_ITERATION_LIMIT,
            iterations: 0,
            debug: false,
            input,
            output,
        }
    }

    pub fn set_iteration_limit(&mut self, limit: u64) {
        self.iteration_limit = limit;
    }

    /// Execute a graph from its entry node. The top-level scope persists
    /// across calls, which is what gives the REPL its shared state.
    pub fn run(&mut self, graph: &Graph) -> Result<(), RuntimeError> {
        self.iterations = 0;
        self.exec_from(graph, graph.entry, 0)?;
        Ok(())
    }

    /// Look up a variable: the current frame's locals, then the program
    /// scope. Callers' locals are invisible to callees.
    pub fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(frame) = self.frames.last() {
            if let Some(v) = frame.locals.get(name) {
                return Ok(v.clone());
            }
        }
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::Name(format!("variable '{}'", name)))
    }

    /// Bind in the nearest scope that already defines the name, otherwise
    /// in the innermost scope.
    pub fn assign(&mut self, name: &str, val: Value) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.locals.contains_key(name) {
                frame.locals.insert(name.to_string(), val);
                return;
            }
            if self.globals.contains_key(name) {
                self.globals.insert(name.to_string(), val);
                return;
            }
            frame.locals.insert(name.to_string(), val);
            return;
        }
        self.globals.insert(name.to_string(), val);
    }

    /// Names bound in the top-level scope, sorted. Used by the REPL.
    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .globals
            .keys()
            .filter(|n| !n.starts_with("__"))
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    fn iters_mut(&mut self) -> &mut HashMap<NodeId, ForState> {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.iters,
            None => &mut self.base_iters,
        }
    }

    /// One loop-body entry against the watchdog.
    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.iterations += 1;
        if self.iterations > self.iteration_limit {
            return Err(RuntimeError::IterationLimit(self.iteration_limit));
        }
        Ok(())
    }

    /// Execute from `pc` until the program halts or a frame below
    /// `stop_depth` returns. Returns the value produced by that return,
    /// if any — that is how expression-position calls get their result.
    fn exec_from(
        &mut self,
        graph: &Graph,
        mut pc: NodeId,
        stop_depth: usize,
    ) -> Result<Option<Value>, RuntimeError> {
        loop {
            let node = graph.node(pc);
            if self.debug {
                eprintln!("[debug] node {} {} (line {})", pc, node.op.name(), node.line);
            }

            match &node.op {
                Op::Entry
                | Op::Pass
                | Op::LoopBodyEnd
                | Op::ContinueTarget
                | Op::FuncEntry { .. } => {
                    pc = self.next(node)?;
                }
                Op::BreakTarget { clears } => {
                    if let Some(for_node) = clears {
                        self.iters_mut().remove(for_node);
                    }
                    pc = self.next(node)?;
                }
                Op::Halt => return Ok(None),
                Op::Assign { target, expr } => {
                    let val = self.eval(graph, expr)?;
                    self.assign(target, val);
                    pc = self.next(node)?;
                }
                Op::Display(expr) => {
                    let val = self.eval(graph, expr)?;
                    let text = vyra_repr(&val);
                    writeln!(self.output, "{}", text)
                        .map_err(|e| RuntimeError::Io(e.to_string()))?;
                    pc = self.next(node)?;
                }
                Op::Input {
                    target,
                    kind,
                    prompt,
                } => {
                    let val = self.read_input(prompt, *kind)?;
                    self.assign(target, val);
                    pc = self.next(node)?;
                }
                Op::Branch(cond) => {
                    let taken = self.eval(graph, cond)?.is_truthy();
                    pc = if taken {
                        self.slot(node.succ.then, "then")?
                    } else {
                        self.slot(node.succ.els, "else")?
                    };
                }
                Op::LoopHead(cond) => {
                    if self.eval(graph, cond)?.is_truthy() {
                        self.tick()?;
                        pc = self.slot(node.succ.body, "body")?;
                    } else {
                        pc = self.slot(node.succ.exit, "exit")?;
                    }
                }
                Op::ForStep { var, iter } => {
                    if !self.iters_mut().contains_key(&pc) {
                        let items = self.realize_sequence(graph, iter)?;
                        self.iters_mut().insert(pc, ForState { items, index: 0 });
                    }
                    let pulled = {
                        let state = self.iters_mut().get_mut(&pc).expect("for state exists");
                        if state.index < state.items.len() {
                            let item = state.items[state.index].clone();
                            state.index += 1;
                            Some(item)
                        } else {
                            None
                        }
                    };
                    match pulled {
                        Some(item) => {
                            self.assign(var, item);
                            self.tick()?;
                            pc = self.slot(node.succ.body, "body")?;
                        }
                        None => {
                            self.iters_mut().remove(&pc);
                            pc = self.slot(node.succ.exit, "exit")?;
                        }
                    }
                }
                Op::ListAppend { target, expr } => {
                    let val = self.eval(graph, expr)?;
                    match self.lookup(target)? {
                        Value::List(items) => items.borrow_mut().push(val),
                        other => {
                            return Err(RuntimeError::Type(format!(
                                "cannot append to {} '{}'",
                                other.type_name(),
                                target
                            )))
                        }
                    }
                    pc = self.next(node)?;
                }
                Op::ReadFile { path, target } => {
                    let path = self.path_value(graph, path)?;
                    let content = std::fs::read_to_string(&path)
                        .map_err(|e| RuntimeError::Io(format!("cannot read '{}': {}", path, e)))?;
                    self.assign(target, Value::Str(content));
                    pc = self.next(node)?;
                }
                Op::WriteFile { expr, path } => {
                    let content = vyra_repr(&self.eval(graph, expr)?);
                    let path = self.path_value(graph, path)?;
                    std::fs::write(&path, content)
                        .map_err(|e| RuntimeError::Io(format!("cannot write '{}': {}", path, e)))?;
                    pc = self.next(node)?;
                }
                Op::Call { name, args, target } => {
                    let mut argv = Vec::with_capacity(args.len());
                    for arg in args {
                        argv.push(self.eval(graph, arg)?);
                    }
                    if let Some(func) = graph.functions.get(name) {
                        if argv.len() != func.params.len() {
                            return Err(RuntimeError::Arity {
                                name: name.clone(),
                                expected: func.params.len(),
                                got: argv.len(),
                            });
                        }
                        let return_target = Some(self.next(node)?);
                        let locals: HashMap<String, Value> =
                            func.params.iter().cloned().zip(argv).collect();
                        self.frames.push(Frame {
                            locals,
                            return_target,
                            result_target: target.clone(),
                            iters: HashMap::new(),
                        });
                        pc = func.entry;
                    } else if builtins::is_builtin(name) {
                        let val = builtins::call(name, argv)?;
                        if let Some(target) = target {
                            self.assign(target, val);
                        }
                        pc = self.next(node)?;
                    } else {
                        return Err(RuntimeError::Name(format!("function '{}'", name)));
                    }
                }
                Op::Return(expr) => {
                    let val = match expr {
                        Some(expr) => self.eval(graph, expr)?,
                        None => Value::Absent,
                    };
                    match self.pop_return(val, stop_depth)? {
                        Flow::Resume(at) => pc = at,
                        Flow::Done(val) => return Ok(val),
                    }
                }
                Op::FuncExit => match self.pop_return(Value::Absent, stop_depth)? {
                    Flow::Resume(at) => pc = at,
                    Flow::Done(val) => return Ok(val),
                },
            }
        }
    }

    /// Pop the current frame on return. Returning from the outermost frame
    /// of this execution ends it; a statement call resumes at its
    /// return-target after binding the result.
    fn pop_return(&mut self, val: Value, stop_depth: usize) -> Result<Flow, RuntimeError> {
        match self.frames.pop() {
            None => Ok(Flow::Done(None)),
            Some(frame) => {
                if self.frames.len() < stop_depth {
                    return Ok(Flow::Done(Some(val)));
                }
                match frame.return_target {
                    Some(target) => {
                        if let Some(result_target) = &frame.result_target {
                            self.assign(result_target, val);
                        }
                        Ok(Flow::Resume(target))
                    }
                    None => Ok(Flow::Done(Some(val))),
                }
            }
        }
    }

    /// Call a function to completion — the path taken by calls in
    /// expression position. Built-ins and user functions share it.
    pub(crate) fn call_function(
        &mut self,
        graph: &Graph,
        name: &str,
        argv: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if let Some(func) = graph.functions.get(name) {
            if argv.len() != func.params.len() {
                return Err(RuntimeError::Arity {
                    name: name.to_string(),
                    expected: func.params.len(),
                    got: argv.len(),
                });
            }
            let locals: HashMap<String, Value> = func.params.iter().cloned().zip(argv).collect();
            self.frames.push(Frame {
                locals,
                return_target: None,
                result_target: None,
                iters: HashMap::new(),
            });
            let depth = self.frames.len();
            let result = self.exec_from(graph, func.entry, depth)?;
            return Ok(result.unwrap_or(Value::Absent));
        }
        if builtins::is_builtin(name) {
            return builtins::call(name, argv);
        }
        Err(RuntimeError::Name(format!("function '{}'", name)))
    }

    fn read_input(&mut self, prompt: &str, kind: AskKind) -> Result<Value, RuntimeError> {
        write!(self.output, "{}", prompt).map_err(|e| RuntimeError::Io(e.to_string()))?;
        self.output
            .flush()
            .map_err(|e| RuntimeError::Io(e.to_string()))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| RuntimeError::Io(e.to_string()))?;
        if read == 0 {
            return Err(RuntimeError::Input("unexpected end of input".to_string()));
        }
        let line = line.trim_end_matches(['\n', '\r']);

        match kind {
            AskKind::Text => Ok(Value::Str(line.to_string())),
            AskKind::Number => {
                if let Ok(i) = line.trim().parse::<i64>() {
                    return Ok(Value::Int(i));
                }
                if let Ok(f) = line.trim().parse::<f64>() {
                    return Ok(Value::Float(f));
                }
                Err(RuntimeError::Input(format!(
                    "'{}' is not a number",
                    line.trim()
                )))
            }
        }
    }

    /// Snapshot the elements an expression iterates over: list elements,
    /// or the characters of a string.
    fn realize_sequence(
        &mut self,
        graph: &Graph,
        iter: &crate::ast::Expr,
    ) -> Result<Vec<Value>, RuntimeError> {
        match self.eval(graph, iter)? {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            other => Err(RuntimeError::Type(format!(
                "cannot iterate over {}",
                other.type_name()
            ))),
        }
    }

    fn path_value(
        &mut self,
        graph: &Graph,
        expr: &crate::ast::Expr,
    ) -> Result<String, RuntimeError> {
        match self.eval(graph, expr)? {
            Value::Str(s) => Ok(s),
            other => Err(RuntimeError::Type(format!(
                "file path must be text, got {}",
                other.type_name()
            ))),
        }
    }

    fn next(&self, node: &crate::graph::Node) -> Result<NodeId, RuntimeError> {
        self.slot(node.succ.next, "next")
    }

    fn slot(&self, id: Option<NodeId>, name: &str) -> Result<NodeId, RuntimeError> {
        id.ok_or_else(|| {
            RuntimeError::Type(format!("malformed graph: missing '{}' successor", name))
        })
    }
}

enum Flow {
    Resume(NodeId),
    Done(Option<Value>),
}
