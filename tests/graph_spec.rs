/// Spec tests for the AST → logic-graph lowering.
///
/// These pin the shapes the builder emits (branch joins, loop back-edges,
/// break/continue binding, the hidden repeat counter) and the graph
/// well-formedness invariants: every branch has both arms, every loop has
/// body and exit, terminals have no successors.
use vyra::graph::{lower_program, BuildError, Graph, NodeId, Op};
use vyra::parser::parse_program;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build(src: &str) -> Graph {
    let program = parse_program(src).expect("parse failed");
    lower_program(&program).expect("lower failed")
}

fn build_err(src: &str) -> BuildError {
    let program = parse_program(src).expect("parse failed");
    lower_program(&program).expect_err("expected a build error")
}

fn find_all(graph: &Graph, pred: impl Fn(&Op) -> bool) -> Vec<NodeId> {
    graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| pred(&n.op))
        .map(|(id, _)| id)
        .collect()
}

fn find_one(graph: &Graph, pred: impl Fn(&Op) -> bool) -> NodeId {
    let found = find_all(graph, pred);
    assert_eq!(found.len(), 1, "expected exactly one matching node");
    found[0]
}

/// Follow `next` edges from the entry, collecting opcodes until a node
/// with no `next` (or a non-linear node) is reached.
fn linear_chain(graph: &Graph) -> Vec<&'static str> {
    let mut ops = Vec::new();
    let mut at = Some(graph.entry);
    while let Some(id) = at {
        let node = graph.node(id);
        ops.push(node.op.name());
        at = node.succ.next;
    }
    ops
}

// ---------------------------------------------------------------------------
// Straight-line lowering
// ---------------------------------------------------------------------------

#[test]
fn straight_line_chain() {
    let graph = build("Set x to 5.\nDisplay x.");
    assert_eq!(
        linear_chain(&graph),
        vec!["ENTRY", "ASSIGN", "DISPLAY", "HALT"]
    );
}

#[test]
fn program_ends_in_halt() {
    let graph = build("Display 1.");
    let halts = find_all(&graph, |op| matches!(op, Op::Halt));
    assert_eq!(halts.len(), 1);
}

#[test]
fn well_formedness_holds_for_a_nested_program() {
    let src = "Set i to 0.\nWhile i is less than 3:\n    If i is 1:\n        Display \"one\".\n    Otherwise:\n        Display i.\n    Increment i.\nFor each c in \"ab\":\n    Display c.";
    let graph = build(src);
    assert_eq!(graph.check(), Vec::<String>::new());
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

#[test]
fn branch_has_both_arms() {
    let graph = build("If x is 1, display \"one\".");
    let branch = find_one(&graph, |op| matches!(op, Op::Branch(_)));
    let succ = &graph.node(branch).succ;
    assert!(succ.then.is_some());
    assert!(succ.els.is_some());
    assert!(succ.next.is_none());
}

#[test]
fn if_without_else_falls_through_to_the_join() {
    let graph = build("If x is 1, display \"one\".\nDisplay \"after\".");
    let branch = find_one(&graph, |op| matches!(op, Op::Branch(_)));
    let els = graph.node(branch).succ.els.unwrap();
    // The else arm is the join itself: a pass-through node.
    assert!(matches!(graph.node(els).op, Op::Pass));
}

#[test]
fn elif_chain_lowers_to_nested_branches() {
    let src = "If x is 1:\n    Display 1.\nOtherwise if x is 2:\n    Display 2.\nOtherwise:\n    Display 3.";
    let graph = build(src);
    let branches = find_all(&graph, |op| matches!(op, Op::Branch(_)));
    assert_eq!(branches.len(), 2);
    // The second branch hangs off the first one's else arm.
    let first_els = graph.node(branches[0]).succ.els.unwrap();
    assert_eq!(first_els, branches[1]);
}

// ---------------------------------------------------------------------------
// Loops
// ---------------------------------------------------------------------------

#[test]
fn while_loop_shape() {
    let graph = build("While x is 1:\n    Display x.");
    let head = find_one(&graph, |op| matches!(op, Op::LoopHead(_)));
    let succ = &graph.node(head).succ;
    assert!(succ.body.is_some());
    assert!(succ.exit.is_some());

    // The exit is the loop's break target.
    let exit = succ.exit.unwrap();
    assert!(matches!(graph.node(exit).op, Op::BreakTarget { .. }));

    // The body ends by re-entering through the continue target.
    let body_end = find_one(&graph, |op| matches!(op, Op::LoopBodyEnd));
    let cont = graph.node(body_end).succ.next.unwrap();
    assert!(matches!(graph.node(cont).op, Op::ContinueTarget));
    assert_eq!(graph.node(cont).succ.next, Some(head));
}

#[test]
fn break_jumps_to_the_innermost_break_target() {
    let src = "While a is 1:\n    While b is 1:\n        Stop the loop.";
    let graph = build(src);
    let heads = find_all(&graph, |op| matches!(op, Op::LoopHead(_)));
    assert_eq!(heads.len(), 2);
    let inner_exit = graph.node(heads[1]).succ.exit.unwrap();

    // The Pass lowered from `Stop the loop` points at the inner exit.
    let jumps: Vec<NodeId> = find_all(&graph, |op| matches!(op, Op::Pass))
        .into_iter()
        .filter(|&id| graph.node(id).succ.next == Some(inner_exit))
        .collect();
    assert!(!jumps.is_empty(), "no jump to the inner break target");
}

#[test]
fn repeat_desugars_to_a_hidden_counter_loop() {
    let graph = build("Repeat 5 times:\n    Display 1.");
    // One loop head, plus an init and an increment of the hidden name.
    find_one(&graph, |op| matches!(op, Op::LoopHead(_)));
    let hidden_assigns = find_all(&graph, |op| {
        matches!(op, Op::Assign { target, .. } if target.starts_with("__repeat_"))
    });
    assert_eq!(hidden_assigns.len(), 2);
    assert_eq!(graph.check(), Vec::<String>::new());
}

#[test]
fn nested_repeats_use_distinct_counters() {
    let graph = build("Repeat 2 times:\n    Repeat 3 times:\n        Display 1.");
    let mut names: Vec<String> = graph
        .nodes
        .iter()
        .filter_map(|n| match &n.op {
            Op::Assign { target, .. } if target.starts_with("__repeat_") => {
                Some(target.clone())
            }
            _ => None,
        })
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 2);
}

#[test]
fn for_each_exit_clears_its_iteration_state() {
    let graph = build("For each x in xs:\n    Display x.");
    let step = find_one(&graph, |op| matches!(op, Op::ForStep { .. }));
    let exit = graph.node(step).succ.exit.unwrap();
    let Op::BreakTarget { clears } = &graph.node(exit).op else {
        panic!("for-each exit is not a break target");
    };
    assert_eq!(*clears, Some(step));
}

#[test]
fn break_outside_a_loop_is_rejected() {
    assert!(matches!(
        build_err("Stop the loop."),
        BuildError::BreakOutsideLoop { .. }
    ));
}

#[test]
fn continue_outside_a_loop_is_rejected() {
    assert!(matches!(
        build_err("Continue."),
        BuildError::ContinueOutsideLoop { .. }
    ));
}

#[test]
fn break_in_a_function_body_does_not_bind_an_outer_loop() {
    let src = "While a is 1:\n    Create function f that takes x:\n        Stop the loop.";
    assert!(matches!(
        build_err(src),
        BuildError::BreakOutsideLoop { .. }
    ));
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

#[test]
fn function_table_records_the_span() {
    let graph = build("Create function add that takes a and b:\n    Return a plus b.");
    let record = graph.functions.get("add").expect("function not recorded");
    assert_eq!(record.params, vec!["a".to_string(), "b".to_string()]);
    assert!(matches!(
        graph.node(record.entry).op,
        Op::FuncEntry { .. }
    ));
    assert!(matches!(graph.node(record.exit).op, Op::FuncExit));
}

#[test]
fn definition_is_skipped_by_the_enclosing_flow() {
    let src = "Create function f that takes x:\n    Display x.\nDisplay \"after\".";
    let graph = build(src);
    // Walking next-edges from the entry never enters the function body.
    assert!(!linear_chain(&graph).contains(&"FUNC_ENTRY"));
}

#[test]
fn function_body_is_reachable_from_its_entry() {
    let graph = build("Create function f that takes x:\n    Display x.");
    let record = graph.functions.get("f").unwrap();
    let mut at = Some(record.entry);
    let mut saw_display = false;
    while let Some(id) = at {
        if matches!(graph.node(id).op, Op::Display(_)) {
            saw_display = true;
        }
        at = graph.node(id).succ.next;
    }
    assert!(saw_display);
}

// ---------------------------------------------------------------------------
// Dump
// ---------------------------------------------------------------------------

#[test]
fn dump_is_one_descriptor_per_node() {
    let graph = build("Set x to 5.\nDisplay x.");
    let dump = graph.dump();
    assert_eq!(dump.lines().count(), graph.nodes.len());
    assert!(dump.contains("\"op\":\"ASSIGN\""));
    assert!(dump.contains("\"op\":\"HALT\""));
}
