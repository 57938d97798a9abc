/// Logic graph — the intermediate representation.
///
/// A program lowers to an arena of nodes connected by named successor
/// slots. Edges are integer indices into the arena, not owning references,
/// so loop back-edges cost nothing. The function table maps each defined
/// function to its `FuncEntry`/`FuncExit` span; it is built here during
/// lowering and frozen before interpretation.
use std::collections::BTreeMap;
use std::collections::HashMap;

use thiserror::Error;

use crate::ast::{AskKind, BinOp, Expr, Program, Stmt, StmtKind};
use crate::json::JsonValue;
use crate::value::Value;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Entry,
    Assign {
        target: String,
        expr: Expr,
    },
    Display(Expr),
    Input {
        target: String,
        kind: AskKind,
        prompt: String,
    },
    Branch(Expr),
    LoopHead(Expr),
    LoopBodyEnd,
    ForStep {
        var: String,
        iter: Expr,
    },
    ListAppend {
        target: String,
        expr: Expr,
    },
    ReadFile {
        path: Expr,
        target: String,
    },
    WriteFile {
        expr: Expr,
        path: Expr,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        target: Option<String>,
    },
    Return(Option<Expr>),
    FuncEntry {
        name: String,
        params: Vec<String>,
    },
    FuncExit,
    /// Labels a loop's exit; `clears` names the `ForStep` whose iteration
    /// state must be dropped when the loop is left.
    BreakTarget {
        clears: Option<NodeId>,
    },
    /// Labels the re-entry point of a loop (its `LoopHead`/`ForStep`).
    ContinueTarget,
    /// Join/pass-through node with no effect.
    Pass,
    Halt,
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Entry => "ENTRY",
            Op::Assign { .. } => "ASSIGN",
            Op::Display(_) => "DISPLAY",
            Op::Input { .. } => "INPUT",
            Op::Branch(_) => "BRANCH",
            Op::LoopHead(_) => "LOOP_HEAD",
            Op::LoopBodyEnd => "LOOP_BODY_END",
            Op::ForStep { .. } => "FOR_STEP",
            Op::ListAppend { .. } => "LIST_APPEND",
            Op::ReadFile { .. } => "READ_FILE",
            Op::WriteFile { .. } => "WRITE_FILE",
            Op::Call { .. } => "CALL",
            Op::Return(_) => "RETURN",
            Op::FuncEntry { .. } => "FUNC_ENTRY",
            Op::FuncExit => "FUNC_EXIT",
            Op::BreakTarget { .. } => "BREAK_TARGET",
            Op::ContinueTarget => "CONTINUE_TARGET",
            Op::Pass => "PASS",
            Op::Halt => "HALT",
        }
    }

    /// Terminal nodes carry no successors at all.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Op::Return(_) | Op::FuncExit | Op::Halt)
    }
}

/// Named successor slots. Exactly one of the slot groups is populated,
/// depending on the opcode: `next` for linear nodes, `then`/`els` for
/// `Branch`, `body`/`exit` for `LoopHead` and `ForStep`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Successors {
    pub next: Option<NodeId>,
    pub then: Option<NodeId>,
    pub els: Option<NodeId>,
    pub body: Option<NodeId>,
    pub exit: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub succ: Successors,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct FuncRecord {
    pub params: Vec<String>,
    pub entry: NodeId,
    pub exit: NodeId,
}

#[derive(Debug, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub entry: NodeId,
    pub functions: HashMap<String, FuncRecord>,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Line {line}: 'Stop the loop' outside of a loop")]
    BreakOutsideLoop { line: usize },
    #[error("Line {line}: 'Continue' outside of a loop")]
    ContinueOutsideLoop { line: usize },
}

impl Graph {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Well-formedness violations, if any. Empty for every graph the
    /// builder produces; exercised directly by tests.
    pub fn check(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (id, node) in self.nodes.iter().enumerate() {
            let s = &node.succ;
            let fail = |msg: &str, problems: &mut Vec<String>| {
                problems.push(format!("node {} ({}): {}", id, node.op.name(), msg));
            };
            match &node.op {
                Op::Branch(_) => {
                    if s.then.is_none() || s.els.is_none() {
                        fail("branch must have both then and else successors", &mut problems);
                    }
                }
                Op::LoopHead(_) | Op::ForStep { .. } => {
                    if s.body.is_none() || s.exit.is_none() {
                        fail("loop must have both body and exit successors", &mut problems);
                    }
                }
                op if op.is_terminal() => {
                    if s.next.is_some() || s.then.is_some() || s.body.is_some() {
                        fail("terminal node must have no successors", &mut problems);
                    }
                }
                _ => {
                    if s.next.is_none() {
                        fail("node must have a next successor", &mut problems);
                    }
                }
            }
        }
        problems
    }

    /// Newline-delimited node descriptors for `--viz` and `parse`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (id, node) in self.nodes.iter().enumerate() {
            let mut obj = BTreeMap::new();
            obj.insert("id".to_string(), JsonValue::Int(id as i64));
            obj.insert(
                "op".to_string(),
                JsonValue::String(node.op.name().to_string()),
            );
            obj.insert("payload".to_string(), payload_json(&node.op));
            obj.insert("successors".to_string(), successors_json(&node.succ));
            out.push_str(&crate::json::to_string(&JsonValue::Object(obj)));
            out.push('\n');
        }
        out
    }
}

fn payload_json(op: &Op) -> JsonValue {
    let mut obj = BTreeMap::new();
    match op {
        Op::Assign { target, expr } | Op::ListAppend { target, expr } => {
            obj.insert("target".to_string(), JsonValue::String(target.clone()));
            obj.insert("expr".to_string(), JsonValue::String(expr.to_string()));
        }
        Op::Display(expr) | Op::Branch(expr) | Op::LoopHead(expr) => {
            obj.insert("expr".to_string(), JsonValue::String(expr.to_string()));
        }
        Op::Input { target, kind, .. } => {
            obj.insert("target".to_string(), JsonValue::String(target.clone()));
            let kind = match kind {
                AskKind::Text => "text",
                AskKind::Number => "number",
            };
            obj.insert("kind".to_string(), JsonValue::String(kind.to_string()));
        }
        Op::ForStep { var, iter } => {
            obj.insert("var".to_string(), JsonValue::String(var.clone()));
            obj.insert("iter".to_string(), JsonValue::String(iter.to_string()));
        }
        Op::ReadFile { path, target } => {
            obj.insert("path".to_string(), JsonValue::String(path.to_string()));
            obj.insert("target".to_string(), JsonValue::String(target.clone()));
        }
        Op::WriteFile { expr, path } => {
            obj.insert("expr".to_string(), JsonValue::String(expr.to_string()));
            obj.insert("path".to_string(), JsonValue::String(path.to_string()));
        }
        Op::Call { name, args, target } => {
            obj.insert("function".to_string(), JsonValue::String(name.clone()));
            obj.insert(
                "args".to_string(),
                JsonValue::Array(
                    args.iter()
                        .map(|a| JsonValue::String(a.to_string()))
                        .collect(),
                ),
            );
            if let Some(target) = target {
                obj.insert("target".to_string(), JsonValue::String(target.clone()));
            }
        }
        Op::Return(Some(expr)) => {
            obj.insert("expr".to_string(), JsonValue::String(expr.to_string()));
        }
        Op::FuncEntry { name, params } => {
            obj.insert("function".to_string(), JsonValue::String(name.clone()));
            obj.insert(
                "params".to_string(),
                JsonValue::Array(
                    params
                        .iter()
                        .map(|p| JsonValue::String(p.clone()))
                        .collect(),
                ),
            );
        }
        _ => {}
    }
    JsonValue::Object(obj)
}

fn successors_json(succ: &Successors) -> JsonValue {
    let mut obj = BTreeMap::new();
    let mut put = |key: &str, id: Option<NodeId>| {
        if let Some(id) = id {
            obj.insert(key.to_string(), JsonValue::Int(id as i64));
        }
    };
    put("next", succ.next);
    put("then", succ.then);
    put("else", succ.els);
    put("body", succ.body);
    put("exit", succ.exit);
    JsonValue::Object(obj)
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

/// Lower a parsed program to its logic graph.
pub fn lower_program(program: &Program) -> Result<Graph, BuildError> {
    let mut builder = Builder {
        graph: Graph::default(),
        break_targets: Vec::new(),
        continue_targets: Vec::new(),
        hidden_counters: 0,
    };

    let entry = builder.add(Op::Entry, 0);
    builder.graph.entry = entry;
    let tail = builder.lower_stmts(&program.statements, entry)?;
    let halt = builder.add(Op::Halt, 0);
    builder.link(tail, halt);

    Ok(builder.graph)
}

struct Builder {
    graph: Graph,
    break_targets: Vec<NodeId>,
    continue_targets: Vec<NodeId>,
    hidden_counters: usize,
}

impl Builder {
    fn add(&mut self, op: Op, line: usize) -> NodeId {
        let id = self.graph.nodes.len();
        self.graph.nodes.push(Node {
            op,
            succ: Successors::default(),
            line,
        });
        id
    }

    fn link(&mut self, from: NodeId, to: NodeId) {
        debug_assert!(self.graph.nodes[from].succ.next.is_none());
        self.graph.nodes[from].succ.next = Some(to);
    }

    fn lower_stmts(&mut self, stmts: &[Stmt], mut cur: NodeId) -> Result<NodeId, BuildError> {
        for stmt in stmts {
            cur = self.lower_stmt(stmt, cur)?;
        }
        Ok(cur)
    }

    fn lower_stmt(&mut self, stmt: &Stmt, cur: NodeId) -> Result<NodeId, BuildError> {
        let line = stmt.line;
        match &stmt.kind {
            StmtKind::Assign { target, expr } => Ok(self.chain(
                Op::Assign {
                    target: target.clone(),
                    expr: expr.clone(),
                },
                line,
                cur,
            )),
            StmtKind::Display(expr) => Ok(self.chain(Op::Display(expr.clone()), line, cur)),
            StmtKind::Ask {
                target,
                kind,
                prompt,
            } => Ok(self.chain(
                Op::Input {
                    target: target.clone(),
                    kind: *kind,
                    prompt: prompt.clone(),
                },
                line,
                cur,
            )),
            StmtKind::ListAppend { target, expr } => Ok(self.chain(
                Op::ListAppend {
                    target: target.clone(),
                    expr: expr.clone(),
                },
                line,
                cur,
            )),
            StmtKind::ReadFile { path, target } => Ok(self.chain(
                Op::ReadFile {
                    path: path.clone(),
                    target: target.clone(),
                },
                line,
                cur,
            )),
            StmtKind::WriteFile { expr, path } => Ok(self.chain(
                Op::WriteFile {
                    expr: expr.clone(),
                    path: path.clone(),
                },
                line,
                cur,
            )),
            StmtKind::Call { name, args, target } => Ok(self.chain(
                Op::Call {
                    name: name.clone(),
                    args: args.clone(),
                    target: target.clone(),
                },
                line,
                cur,
            )),
            StmtKind::Return(expr) => {
                let node = self.add(Op::Return(expr.clone()), line);
                self.link(cur, node);
                // Anything after a return in the same block is unreachable;
                // give it a detached chain to hang off.
                Ok(self.add(Op::Pass, line))
            }
            StmtKind::Break => {
                let target = *self
                    .break_targets
                    .last()
                    .ok_or(BuildError::BreakOutsideLoop { line })?;
                let node = self.add(Op::Pass, line);
                self.link(cur, node);
                self.link(node, target);
                Ok(self.add(Op::Pass, line))
            }
            StmtKind::Continue => {
                let target = *self
                    .continue_targets
                    .last()
                    .ok_or(BuildError::ContinueOutsideLoop { line })?;
                let node = self.add(Op::Pass, line);
                self.link(cur, node);
                self.link(node, target);
                Ok(self.add(Op::Pass, line))
            }
            StmtKind::If {
                cond,
                then_block,
                elif_blocks,
                else_block,
            } => {
                let branch = self.add(Op::Branch(cond.clone()), line);
                self.link(cur, branch);
                let join = self.add(Op::Pass, line);

                let then_entry = self.add(Op::Pass, line);
                self.graph.nodes[branch].succ.then = Some(then_entry);
                let then_tail = self.lower_stmts(then_block, then_entry)?;
                self.link(then_tail, join);

                let else_entry = self.lower_else(elif_blocks, else_block, join, line)?;
                self.graph.nodes[branch].succ.els = Some(else_entry);

                Ok(join)
            }
            StmtKind::While { cond, body } => self.lower_while(cond, body, cur, line),
            StmtKind::Repeat { count, body } => {
                // Desugars to a hidden counter. The increment runs at body
                // entry so that Continue cannot skip it.
                let hidden = format!("__repeat_{}", self.hidden_counters);
                self.hidden_counters += 1;

                let init = self.add(
                    Op::Assign {
                        target: hidden.clone(),
                        expr: Expr::Literal(Value::Int(0)),
                    },
                    line,
                );
                self.link(cur, init);

                let cond = Expr::Binary(
                    BinOp::Lt,
                    Box::new(Expr::Ident(hidden.clone())),
                    Box::new(count.clone()),
                );
                let incr = Stmt {
                    kind: StmtKind::Assign {
                        target: hidden.clone(),
                        expr: Expr::Binary(
                            BinOp::Add,
                            Box::new(Expr::Ident(hidden)),
                            Box::new(Expr::Literal(Value::Int(1))),
                        ),
                    },
                    line,
                };
                let mut desugared = Vec::with_capacity(body.len() + 1);
                desugared.push(incr);
                desugared.extend(body.iter().cloned());

                self.lower_while(&cond, &desugared, init, line)
            }
            StmtKind::ForEach { var, iter, body } => {
                let cont = self.add(Op::ContinueTarget, line);
                self.link(cur, cont);
                let step = self.add(
                    Op::ForStep {
                        var: var.clone(),
                        iter: iter.clone(),
                    },
                    line,
                );
                self.link(cont, step);
                let brk = self.add(Op::BreakTarget { clears: Some(step) }, line);

                self.break_targets.push(brk);
                self.continue_targets.push(cont);
                let body_entry = self.add(Op::Pass, line);
                self.graph.nodes[step].succ.body = Some(body_entry);
                let body_tail = self.lower_stmts(body, body_entry)?;
                let body_end = self.add(Op::LoopBodyEnd, line);
                self.link(body_tail, body_end);
                self.link(body_end, cont);
                self.break_targets.pop();
                self.continue_targets.pop();

                self.graph.nodes[step].succ.exit = Some(brk);
                Ok(brk)
            }
            StmtKind::FunctionDef { name, params, body } => {
                let entry = self.add(
                    Op::FuncEntry {
                        name: name.clone(),
                        params: params.clone(),
                    },
                    line,
                );

                // Loops do not cross function boundaries.
                let saved_breaks = std::mem::take(&mut self.break_targets);
                let saved_continues = std::mem::take(&mut self.continue_targets);

                let body_entry = self.add(Op::Pass, line);
                self.link(entry, body_entry);
                let body_tail = self.lower_stmts(body, body_entry)?;
                let exit = self.add(Op::FuncExit, line);
                self.link(body_tail, exit);

                self.break_targets = saved_breaks;
                self.continue_targets = saved_continues;

                self.graph.functions.insert(
                    name.clone(),
                    FuncRecord {
                        params: params.clone(),
                        entry,
                        exit,
                    },
                );

                // The definition is recorded, not executed: control at the
                // enclosing level skips straight over the body.
                Ok(cur)
            }
        }
    }

    fn chain(&mut self, op: Op, line: usize, cur: NodeId) -> NodeId {
        let node = self.add(op, line);
        self.link(cur, node);
        node
    }

    fn lower_while(
        &mut self,
        cond: &Expr,
        body: &[Stmt],
        cur: NodeId,
        line: usize,
    ) -> Result<NodeId, BuildError> {
        let cont = self.add(Op::ContinueTarget, line);
        self.link(cur, cont);
        let head = self.add(Op::LoopHead(cond.clone()), line);
        self.link(cont, head);
        let brk = self.add(Op::BreakTarget { clears: None }, line);

        self.break_targets.push(brk);
        self.continue_targets.push(cont);
        let body_entry = self.add(Op::Pass, line);
        self.graph.nodes[head].succ.body = Some(body_entry);
        let body_tail = self.lower_stmts(body, body_entry)?;
        let body_end = self.add(Op::LoopBodyEnd, line);
        self.link(body_tail, body_end);
        self.link(body_end, cont);
        self.break_targets.pop();
        self.continue_targets.pop();

        self.graph.nodes[head].succ.exit = Some(brk);
        Ok(brk)
    }

    /// Chain elif clauses into nested branches; the last link is the else
    /// block, or the join itself when there is none.
    fn lower_else(
        &mut self,
        elif_blocks: &[(Expr, Vec<Stmt>)],
        else_block: &[Stmt],
        join: NodeId,
        line: usize,
    ) -> Result<NodeId, BuildError> {
        if let Some(((cond, block), rest)) = elif_blocks.split_first() {
            let branch = self.add(Op::Branch(cond.clone()), line);
            let then_entry = self.add(Op::Pass, line);
            self.graph.nodes[branch].succ.then = Some(then_entry);
            let then_tail = self.lower_stmts(block, then_entry)?;
            self.link(then_tail, join);
            let else_entry = self.lower_else(rest, else_block, join, line)?;
            self.graph.nodes[branch].succ.els = Some(else_entry);
            return Ok(branch);
        }

        if else_block.is_empty() {
            return Ok(join);
        }

        let entry = self.add(Op::Pass, line);
        let tail = self.lower_stmts(else_block, entry)?;
        self.link(tail, join);
        Ok(entry)
    }
}
