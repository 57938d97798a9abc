use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;

use vyra::ast::{Expr, Program, Stmt, StmtKind};
use vyra::graph::lower_program;
use vyra::interpreter::Interpreter;
use vyra::loader::{self, LoadError};
use vyra::parser::{self, ParseError};
use vyra::rewrite::{rewrite_source, RewriteConfig};
use vyra::value::vyra_repr;

const EXIT_RUNTIME: i32 = 1;
const EXIT_PARSE: i32 = 2;
const EXIT_IO: i32 = 3;
const EXIT_AI: i32 = 4;

#[derive(ClapParser)]
#[command(name = "vyra", about = "Vyra — programming in plain English")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Vyra program
    Run {
        file: String,
        /// Trace each executed graph node to stderr
        #[arg(long)]
        debug: bool,
        /// Write the logic graph next to the source before running
        #[arg(long)]
        viz: bool,
        /// Rewrite free-form English through the AI front end first
        #[arg(long)]
        ai: bool,
    },
    /// Parse a program and print its logic graph without executing
    Parse {
        file: String,
        #[arg(long)]
        ai: bool,
    },
    /// Interactive REPL sharing one top-level scope across inputs
    Repl {
        #[arg(long)]
        ai: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            debug,
            viz,
            ai,
        } => cmd_run(&file, debug, viz, ai),
        Commands::Parse { file, ai } => cmd_parse(&file, ai),
        Commands::Repl { ai } => cmd_repl(ai),
    }
}

/// Load, optionally rewrite, and parse a program — or exit with the right
/// code trying.
fn read_program(file: &str, ai: bool) -> Program {
    let source = match loader::load_source(Path::new(file)) {
        Ok(text) => text,
        Err(e @ LoadError::Io { .. }) => {
            eprintln!("{}", e.to_string().red());
            process::exit(EXIT_IO);
        }
        Err(e) => {
            eprintln!("{}", ParseError::from(e).to_string().red());
            process::exit(EXIT_PARSE);
        }
    };

    let source = apply_rewrite(&source, ai);

    match parser::parse_program(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            process::exit(EXIT_PARSE);
        }
    }
}

fn apply_rewrite(source: &str, ai: bool) -> String {
    let mut config = RewriteConfig::from_env();
    if ai {
        config.enabled = true;
    }
    match rewrite_source(source, &config) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            process::exit(EXIT_AI);
        }
    }
}

fn build_graph(program: &Program) -> vyra::graph::Graph {
    match lower_program(program) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            process::exit(EXIT_PARSE);
        }
    }
}

fn cmd_run(file: &str, debug: bool, viz: bool, ai: bool) {
    let program = read_program(file, ai);
    let graph = build_graph(&program);

    if viz {
        let out_path = PathBuf::from(file).with_extension("graph.jsonl");
        if let Err(e) = std::fs::write(&out_path, graph.dump()) {
            eprintln!(
                "{}",
                format!("Cannot write '{}': {}", out_path.display(), e).red()
            );
            process::exit(EXIT_IO);
        }
        eprintln!("Graph written to {}", out_path.display());
    }

    let mut interp = Interpreter::new();
    interp.debug = debug;
    if let Err(e) = interp.run(&graph) {
        eprintln!("{}", e.to_string().red());
        process::exit(e.exit_code());
    }
}

fn cmd_parse(file: &str, ai: bool) {
    let program = read_program(file, ai);
    let graph = build_graph(&program);
    print!("{}", graph.dump());
}

// ─── REPL ────────────────────────────────────────────────────────────────────

fn repl_help() {
    println!("Commands:");
    println!("  :help / :h   Show this help");
    println!("  :quit / :q   Exit the REPL");
    println!("  :clear / :c  Forget all definitions and variables");
    println!("  :vars        Show top-level variables");
    println!();
    println!("Sentences end with '.'; block headers end with ':' and their");
    println!("bodies are indented. Finish a block with an empty line.");
}

/// A block is open while the last line is a header or still indented.
fn is_incomplete(source: &str) -> bool {
    match source.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(last) => {
            last.trim_end().ends_with(':') || last.starts_with(' ') || last.starts_with('\t')
        }
        None => false,
    }
}

/// Record which names an input binds to list literals, so later inputs can
/// resolve `add X to Y` the same way a single-file parse would.
fn collect_list_names(stmts: &[Stmt], lists: &mut HashSet<String>) {
    for stmt in stmts {
        if let StmtKind::Assign {
            target,
            expr: Expr::List(_),
        } = &stmt.kind
        {
            lists.insert(target.clone());
        }
    }
}

fn cmd_repl(ai: bool) {
    let mut interp = Interpreter::new();
    let mut fn_defs: Vec<Stmt> = Vec::new();
    let mut known_lists: HashSet<String> = HashSet::new();
    let mut buffer: Vec<String> = Vec::new();

    println!("Vyra REPL — :help for commands, :quit to exit");

    let stdin = io::stdin();

    loop {
        let prompt = if buffer.is_empty() { "vyra> " } else { "...   " };
        print!("{}", prompt);
        io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(_) => break,
        }
        let line = line.trim_end_matches(['\n', '\r']).to_string();

        if buffer.is_empty() && line.trim().starts_with(':') {
            match line.trim() {
                ":quit" | ":q" => {
                    println!("Bye.");
                    break;
                }
                ":help" | ":h" => {
                    repl_help();
                    continue;
                }
                ":clear" | ":c" => {
                    interp = Interpreter::new();
                    fn_defs.clear();
                    known_lists.clear();
                    println!("Cleared.");
                    continue;
                }
                ":vars" => {
                    let names = interp.global_names();
                    if names.is_empty() {
                        println!("  (empty)");
                    }
                    for name in names {
                        if let Some(val) = interp.global(&name) {
                            println!("  {} = {}", name, vyra_repr(val));
                        }
                    }
                    continue;
                }
                cmd => {
                    println!("Unknown command: {}. Type :help.", cmd);
                    continue;
                }
            }
        }

        buffer.push(line.clone());
        let source = buffer.join("\n");

        if is_incomplete(&source) && !line.trim().is_empty() {
            continue;
        }
        if source.trim().is_empty() {
            buffer.clear();
            continue;
        }
        buffer.clear();

        let source = apply_rewrite_repl(&source, ai);
        let Some(source) = source else { continue };

        let program = match parser::parse_program_with_lists(&source, &known_lists) {
            Ok(program) => program,
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                continue;
            }
        };

        collect_list_names(&program.statements, &mut known_lists);

        // Earlier function definitions ride along so calls keep resolving;
        // they lower to disconnected subgraphs and cost nothing to re-lower.
        let mut statements = fn_defs.clone();
        statements.extend(program.statements.iter().cloned());
        let combined = Program { statements };

        let graph = match lower_program(&combined) {
            Ok(graph) => graph,
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                continue;
            }
        };

        match interp.run(&graph) {
            Ok(()) => {
                for stmt in &program.statements {
                    if let StmtKind::FunctionDef { name, .. } = &stmt.kind {
                        println!("{}", format!("defined: {}", name).cyan());
                        fn_defs.push(stmt.clone());
                    }
                }
            }
            Err(e) => {
                eprintln!("{}", e.to_string().red());
            }
        }
    }
}

fn apply_rewrite_repl(source: &str, ai: bool) -> Option<String> {
    let mut config = RewriteConfig::from_env();
    if ai {
        config.enabled = true;
    }
    match rewrite_source(source, &config) {
        Ok(text) => Some(text),
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            None
        }
    }
}
