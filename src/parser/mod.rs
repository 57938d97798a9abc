/// Sentence parser.
///
/// Sentences from the splitter are matched against the ordered pattern
/// table (`patterns.rs`), classified into statement fragments, and then
/// assembled into nested blocks by indentation (`blocks.rs`). Expressions
/// inside sentences go through the recursive-descent parser in `expr.rs`.
///
/// Parsing is two-pass: the first pass records every name declared through
/// a list-creation sentence so that the second pass can resolve the
/// ambiguous `add X to Y` form (list append vs in-place arithmetic).
mod blocks;
mod expr;
mod patterns;

pub use patterns::{Action, Pattern, PATTERNS};

use std::collections::HashSet;

use thiserror::Error;

use crate::ast::{AskKind, BinOp, Expr, Program, Stmt, StmtKind, UnaryOp};
use crate::lexer::{self, LexerError, Sentence, Terminator};
use crate::loader::LoadError;
use crate::value::Value;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Line {line}: Could not understand: '{text}'")]
    UnknownSentence { line: usize, text: String },
    #[error("Line {line}: Unbalanced blocks: {msg}")]
    UnbalancedBlocks { line: usize, msg: String },
    #[error("Line {line}: Malformed expression: {msg}")]
    MalformedExpression { line: usize, msg: String },
    #[error("Line {line}: {msg}")]
    UnexpectedToken { line: usize, msg: String },
    #[error("Include cycle detected: {chain}")]
    IncludeCycle { chain: String },
    #[error("Included file not found: '{path}'")]
    IncludeMissing { path: String },
}

impl From<LexerError> for ParseError {
    fn from(e: LexerError) -> ParseError {
        match e {
            LexerError::UnterminatedString { line } => ParseError::UnexpectedToken {
                line,
                msg: "Unterminated string literal".to_string(),
            },
            LexerError::UnterminatedSentence { line, text } => {
                ParseError::UnknownSentence { line, text }
            }
        }
    }
}

impl From<LoadError> for ParseError {
    fn from(e: LoadError) -> ParseError {
        match e {
            LoadError::IncludeCycle { chain } => ParseError::IncludeCycle { chain },
            LoadError::IncludeMissing { path } => ParseError::IncludeMissing { path },
            LoadError::Io { path, source } => ParseError::IncludeMissing {
                path: format!("{} ({})", path, source),
            },
        }
    }
}

/// Words with a fixed grammatical role; rejecting them as identifiers keeps
/// sentences unambiguous.
const RESERVED: &[&str] = &[
    "add", "and", "append", "as", "ask", "break", "by", "call", "called", "continue", "create",
    "decrement", "define", "display", "divide", "each", "else", "equals", "false", "file", "for",
    "followed", "from", "function", "get", "if", "in", "increment", "into", "is", "list", "loop",
    "make", "minus", "mod", "modulo", "multiply", "no", "none", "not", "nothing", "of",
    "otherwise", "plus", "print", "read", "repeat", "return", "run", "save", "say", "set", "show",
    "stop", "store", "subtract", "the", "times", "to", "true", "until", "value", "values",
    "variable", "when", "while", "with", "write", "yes",
];

/// Parse expanded source text into a program.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    parse_program_with_lists(source, &HashSet::new())
}

/// Like [`parse_program`], with extra names already known to be lists.
/// The REPL threads the lists declared in earlier inputs through here so
/// `add X to Y` keeps resolving correctly across lines.
pub fn parse_program_with_lists(
    source: &str,
    known_lists: &HashSet<String>,
) -> Result<Program, ParseError> {
    let sentences = lexer::split_sentences(source)?;
    let mut parser = Parser::new(&sentences);
    parser
        .declared_lists
        .extend(known_lists.iter().cloned());
    let statements = blocks::assemble(&parser, &sentences)?;
    Ok(Program { statements })
}

/// One classified sentence, before block assembly.
#[derive(Debug, Clone)]
pub(crate) enum Fragment {
    Stmt(StmtKind),
    IfHeader(Expr),
    ElifHeader(Expr),
    ElseHeader,
    WhileHeader(Expr),
    RepeatHeader(Expr),
    ForEachHeader(String, Expr),
    FuncHeader(String, Vec<String>),
    InlineIf(Expr, StmtKind),
    InlineElse(StmtKind),
}

pub(crate) struct Parser {
    declared_lists: HashSet<String>,
}

impl Parser {
    /// First pass: scan for list-creation sentences so the second pass can
    /// disambiguate `add X to Y`.
    fn new(sentences: &[Sentence]) -> Parser {
        let mut declared_lists = HashSet::new();
        for sent in sentences {
            if sent.terminator != Terminator::Period {
                continue;
            }
            if let Some((pattern, caps)) = patterns::match_sentence(&sent.text, false) {
                if matches!(pattern.action, Action::ListCreate | Action::ListCreateEmpty) {
                    declared_lists.insert(caps[1].to_string());
                }
            }
        }
        Parser { declared_lists }
    }

    pub(crate) fn is_declared_list(&self, name: &str) -> bool {
        self.declared_lists.contains(name)
    }

    pub(crate) fn classify(&self, sent: &Sentence) -> Result<Fragment, ParseError> {
        let header = sent.terminator == Terminator::Colon;
        let line = sent.line;
        let (pattern, caps) = patterns::match_sentence(&sent.text, header).ok_or_else(|| {
            ParseError::UnknownSentence {
                line,
                text: sent.text.clone(),
            }
        })?;

        let group = |k: usize| -> String { caps[k].trim().to_string() };
        let opt_group =
            |k: usize| -> Option<String> { caps.get(k).map(|m| m.as_str().trim().to_string()) };
        let expr = |k: usize| -> Result<Expr, ParseError> { expr::parse_expr(&group(k), line) };

        let fragment = match pattern.action {
            // ── Headers ────────────────────────────────────────────────
            // Function names are not checked against the reserved words:
            // they only ever appear after `call`/`create function`, where
            // an action verb like `add` is unambiguous.
            Action::FuncDef => {
                let params = self.param_list(&group(2), line)?;
                Fragment::FuncHeader(group(1), params)
            }
            Action::FuncDefNoParams => Fragment::FuncHeader(group(1), Vec::new()),
            Action::ElifHeader => Fragment::ElifHeader(expr(1)?),
            Action::ElseHeader => Fragment::ElseHeader,
            Action::IfHeader => Fragment::IfHeader(expr(1)?),
            Action::RepeatHeader => Fragment::RepeatHeader(expr(1)?),
            Action::WhileHeader => Fragment::WhileHeader(expr(1)?),
            Action::UntilHeader => {
                Fragment::WhileHeader(Expr::Unary(UnaryOp::Not, Box::new(expr(1)?)))
            }
            Action::ForEachHeader => {
                Fragment::ForEachHeader(self.ident(group(1), line)?, expr(2)?)
            }

            // ── Simple statements ──────────────────────────────────────
            Action::ListCreate => Fragment::Stmt(StmtKind::Assign {
                target: self.ident(group(1), line)?,
                expr: expr(2)?,
            }),
            Action::ListCreateEmpty => Fragment::Stmt(StmtKind::Assign {
                target: self.ident(group(1), line)?,
                expr: Expr::List(Vec::new()),
            }),
            Action::CreateVar => {
                let value = match opt_group(2) {
                    Some(text) => expr::parse_expr(&text, line)?,
                    None => Expr::Literal(Value::Absent),
                };
                Fragment::Stmt(StmtKind::Assign {
                    target: self.ident(group(1), line)?,
                    expr: value,
                })
            }
            Action::DefineAs | Action::SetTo => Fragment::Stmt(StmtKind::Assign {
                target: self.ident(group(1), line)?,
                expr: expr(2)?,
            }),
            Action::Store => Fragment::Stmt(StmtKind::Assign {
                target: self.ident(group(2), line)?,
                expr: expr(1)?,
            }),
            Action::AddStore => self.binop_store(BinOp::Add, expr(1)?, expr(2)?, group(3), line)?,
            Action::SubStore => self.binop_store(BinOp::Sub, expr(1)?, expr(2)?, group(3), line)?,
            Action::SubFromStore => {
                // `subtract A from B` computes B − A.
                self.binop_store(BinOp::Sub, expr(2)?, expr(1)?, group(3), line)?
            }
            Action::MulStore => self.binop_store(BinOp::Mul, expr(1)?, expr(2)?, group(3), line)?,
            Action::DivStore => self.binop_store(BinOp::Div, expr(1)?, expr(2)?, group(3), line)?,
            Action::AddTo => {
                let target = group(2);
                if self.is_declared_list(&target) {
                    Fragment::Stmt(StmtKind::ListAppend {
                        target,
                        expr: expr(1)?,
                    })
                } else {
                    Fragment::Stmt(StmtKind::Assign {
                        target: target.clone(),
                        expr: Expr::Binary(
                            BinOp::Add,
                            Box::new(Expr::Ident(target)),
                            Box::new(expr(1)?),
                        ),
                    })
                }
            }
            Action::Append => Fragment::Stmt(StmtKind::ListAppend {
                target: group(2),
                expr: expr(1)?,
            }),
            Action::SubtractFrom => self.in_place(BinOp::Sub, group(2), expr(1)?),
            Action::MultiplyBy => self.in_place(BinOp::Mul, group(1), expr(2)?),
            Action::DivideBy => self.in_place(BinOp::Div, group(1), expr(2)?),
            Action::Increment => {
                self.in_place(BinOp::Add, group(1), Expr::Literal(Value::Int(1)))
            }
            Action::Decrement => {
                self.in_place(BinOp::Sub, group(1), Expr::Literal(Value::Int(1)))
            }
            Action::Display => Fragment::Stmt(StmtKind::Display(expr(1)?)),
            Action::AskNumberCalled => self.ask(group(1), group(1), AskKind::Number, line)?,
            Action::AskTextCalled => self.ask(group(2), group(1), AskKind::Text, line)?,
            Action::AskText => self.ask(group(1), group(1), AskKind::Text, line)?,
            Action::GetNumber => self.ask(group(1), group(1), AskKind::Number, line)?,
            Action::GetText => self.ask(group(1), group(1), AskKind::Text, line)?,
            Action::InlineIf => {
                let cond = expr(1)?;
                let stmt = self.simple_stmt(&group(2), line)?;
                Fragment::InlineIf(cond, stmt)
            }
            Action::InlineElse => Fragment::InlineElse(self.simple_stmt(&group(1), line)?),
            Action::Break => Fragment::Stmt(StmtKind::Break),
            Action::Continue => Fragment::Stmt(StmtKind::Continue),
            Action::CallStore => Fragment::Stmt(StmtKind::Call {
                name: group(1),
                args: self.arg_list(&group(2), line)?,
                target: Some(self.ident(group(3), line)?),
            }),
            Action::CallArgs => Fragment::Stmt(StmtKind::Call {
                name: group(1),
                args: self.arg_list(&group(2), line)?,
                target: None,
            }),
            Action::CallBare => {
                let target = match opt_group(2) {
                    Some(name) => Some(self.ident(name, line)?),
                    None => None,
                };
                Fragment::Stmt(StmtKind::Call {
                    name: group(1),
                    args: Vec::new(),
                    target,
                })
            }
            Action::Return => Fragment::Stmt(StmtKind::Return(Some(expr(1)?))),
            Action::ReturnVoid => Fragment::Stmt(StmtKind::Return(None)),
            Action::ReadFile => Fragment::Stmt(StmtKind::ReadFile {
                path: expr(1)?,
                target: self.ident(group(2), line)?,
            }),
            Action::WriteFile => Fragment::Stmt(StmtKind::WriteFile {
                expr: expr(1)?,
                path: expr(2)?,
            }),
        };

        Ok(fragment)
    }

    fn binop_store(
        &self,
        op: BinOp,
        left: Expr,
        right: Expr,
        target: String,
        line: usize,
    ) -> Result<Fragment, ParseError> {
        Ok(Fragment::Stmt(StmtKind::Assign {
            target: self.ident(target, line)?,
            expr: Expr::Binary(op, Box::new(left), Box::new(right)),
        }))
    }

    fn in_place(&self, op: BinOp, target: String, operand: Expr) -> Fragment {
        Fragment::Stmt(StmtKind::Assign {
            target: target.clone(),
            expr: Expr::Binary(op, Box::new(Expr::Ident(target)), Box::new(operand)),
        })
    }

    fn ask(
        &self,
        target: String,
        prompt_words: String,
        kind: AskKind,
        line: usize,
    ) -> Result<Fragment, ParseError> {
        let target = self.ident(target, line)?;
        let prompt = format!("Enter {}: ", prompt_words.replace('_', " "));
        Ok(Fragment::Stmt(StmtKind::Ask {
            target,
            kind,
            prompt,
        }))
    }

    /// Parse the embedded statement of an inline `if`/`otherwise`.
    fn simple_stmt(&self, text: &str, line: usize) -> Result<StmtKind, ParseError> {
        let pseudo = Sentence {
            text: text.to_string(),
            indent: 0,
            terminator: Terminator::Period,
            line,
        };
        match self.classify(&pseudo)? {
            Fragment::Stmt(kind) => Ok(kind),
            Fragment::InlineIf(cond, stmt) => Ok(StmtKind::If {
                cond,
                then_block: vec![Stmt { kind: stmt, line }],
                elif_blocks: Vec::new(),
                else_block: Vec::new(),
            }),
            _ => Err(ParseError::UnexpectedToken {
                line,
                msg: format!("'{}' cannot be used inside an inline if", text),
            }),
        }
    }

    fn ident(&self, name: String, line: usize) -> Result<String, ParseError> {
        if RESERVED.contains(&name.to_lowercase().as_str()) {
            return Err(ParseError::UnexpectedToken {
                line,
                msg: format!("'{}' is a reserved word and cannot be used as a name", name),
            });
        }
        Ok(name)
    }

    fn param_list(&self, text: &str, line: usize) -> Result<Vec<String>, ParseError> {
        let mut params = Vec::new();
        for part in split_top_level(text) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if !part.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(ParseError::UnexpectedToken {
                    line,
                    msg: format!("invalid parameter name '{}'", part),
                });
            }
            params.push(self.ident(part.to_string(), line)?);
        }
        Ok(params)
    }

    fn arg_list(&self, text: &str, line: usize) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        for part in split_top_level(text) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            args.push(expr::parse_expr(part, line)?);
        }
        Ok(args)
    }
}

/// Split on `,` and the word `and` at the top level — outside quotes,
/// brackets, and parentheses. Used for call arguments and parameter lists.
fn split_top_level(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];
        if let Some(q) = quote {
            cur.push(ch);
            if ch == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                cur.push(ch);
                i += 1;
            }
            '(' | '[' => {
                depth += 1;
                cur.push(ch);
                i += 1;
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                cur.push(ch);
                i += 1;
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut cur));
                i += 1;
            }
            c if c.is_whitespace() && depth == 0 => {
                // Look ahead for a standalone `and`.
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let word_start = j;
                while j < chars.len() && chars[j].is_alphabetic() {
                    j += 1;
                }
                let word: String = chars[word_start..j].iter().collect();
                let word_ends = chars.get(j).map_or(true, |c| c.is_whitespace());
                if word.eq_ignore_ascii_case("and") && word_ends {
                    parts.push(std::mem::take(&mut cur));
                    i = j;
                } else {
                    cur.push(' ');
                    i += 1;
                }
            }
            other => {
                cur.push(other);
                i += 1;
            }
        }
    }

    if !cur.trim().is_empty() {
        parts.push(cur);
    }
    parts
}
