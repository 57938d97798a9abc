/// Block assembly.
///
/// A `:` sentence owns the contiguous run of following sentences with
/// strictly greater indentation; a `.` sentence closes any block deeper
/// than itself. `otherwise`/`otherwise if` clauses attach to the `if` at
/// their own indentation, in both block and inline form.
use crate::ast::{Stmt, StmtKind};
use crate::lexer::Sentence;

use super::{Fragment, ParseError, Parser};

pub(crate) fn assemble(parser: &Parser, sentences: &[Sentence]) -> Result<Vec<Stmt>, ParseError> {
    let mut i = 0usize;
    let indent = sentences.first().map_or(0, |s| s.indent);
    let stmts = parse_block(parser, sentences, &mut i, indent)?;
    if i < sentences.len() {
        return Err(ParseError::UnbalancedBlocks {
            line: sentences[i].line,
            msg: format!("unexpected indentation of {}", sentences[i].indent),
        });
    }
    Ok(stmts)
}

fn parse_block(
    parser: &Parser,
    sentences: &[Sentence],
    i: &mut usize,
    indent: usize,
) -> Result<Vec<Stmt>, ParseError> {
    let mut stmts = Vec::new();

    while *i < sentences.len() {
        let sent = &sentences[*i];
        if sent.indent < indent {
            break;
        }
        if sent.indent > indent {
            return Err(ParseError::UnbalancedBlocks {
                line: sent.line,
                msg: format!(
                    "indentation of {} does not open a block here",
                    sent.indent
                ),
            });
        }

        let line = sent.line;
        let fragment = parser.classify(sent)?;
        *i += 1;

        match fragment {
            Fragment::Stmt(kind) => stmts.push(Stmt { kind, line }),
            Fragment::IfHeader(cond) => {
                let then_block = parse_child(parser, sentences, i, indent)?;
                let (elif_blocks, else_block) =
                    parse_else_clauses(parser, sentences, i, indent)?;
                stmts.push(Stmt {
                    kind: StmtKind::If {
                        cond,
                        then_block,
                        elif_blocks,
                        else_block,
                    },
                    line,
                });
            }
            Fragment::InlineIf(cond, then_stmt) => {
                let then_block = vec![Stmt {
                    kind: then_stmt,
                    line,
                }];
                let (elif_blocks, else_block) =
                    parse_else_clauses(parser, sentences, i, indent)?;
                stmts.push(Stmt {
                    kind: StmtKind::If {
                        cond,
                        then_block,
                        elif_blocks,
                        else_block,
                    },
                    line,
                });
            }
            Fragment::WhileHeader(cond) => {
                let body = parse_child(parser, sentences, i, indent)?;
                stmts.push(Stmt {
                    kind: StmtKind::While { cond, body },
                    line,
                });
            }
            Fragment::RepeatHeader(count) => {
                let body = parse_child(parser, sentences, i, indent)?;
                stmts.push(Stmt {
                    kind: StmtKind::Repeat { count, body },
                    line,
                });
            }
            Fragment::ForEachHeader(var, iter) => {
                let body = parse_child(parser, sentences, i, indent)?;
                stmts.push(Stmt {
                    kind: StmtKind::ForEach { var, iter, body },
                    line,
                });
            }
            Fragment::FuncHeader(name, params) => {
                let body = parse_child(parser, sentences, i, indent)?;
                stmts.push(Stmt {
                    kind: StmtKind::FunctionDef { name, params, body },
                    line,
                });
            }
            Fragment::ElifHeader(_) | Fragment::ElseHeader | Fragment::InlineElse(_) => {
                return Err(ParseError::UnexpectedToken {
                    line,
                    msg: "'Otherwise' without a matching 'If'".to_string(),
                });
            }
        }
    }

    Ok(stmts)
}

/// The body of a `:` header: following sentences indented deeper than the
/// header. An empty body is allowed.
fn parse_child(
    parser: &Parser,
    sentences: &[Sentence],
    i: &mut usize,
    parent_indent: usize,
) -> Result<Vec<Stmt>, ParseError> {
    match sentences.get(*i) {
        Some(next) if next.indent > parent_indent => {
            let child_indent = next.indent;
            parse_block(parser, sentences, i, child_indent)
        }
        _ => Ok(Vec::new()),
    }
}

/// Consume any `otherwise if` / `otherwise` clauses sitting at the same
/// indentation as the `if` they belong to.
fn parse_else_clauses(
    parser: &Parser,
    sentences: &[Sentence],
    i: &mut usize,
    indent: usize,
) -> Result<(Vec<(crate::ast::Expr, Vec<Stmt>)>, Vec<Stmt>), ParseError> {
    let mut elif_blocks = Vec::new();
    let mut else_block = Vec::new();

    while *i < sentences.len() {
        let sent = &sentences[*i];
        if sent.indent != indent {
            break;
        }
        let line = sent.line;
        match parser.classify(sent)? {
            Fragment::ElifHeader(cond) => {
                *i += 1;
                let body = parse_child(parser, sentences, i, indent)?;
                elif_blocks.push((cond, body));
            }
            Fragment::ElseHeader => {
                *i += 1;
                else_block = parse_child(parser, sentences, i, indent)?;
                break;
            }
            Fragment::InlineElse(kind) => {
                *i += 1;
                else_block = vec![Stmt { kind, line }];
                break;
            }
            _ => break,
        }
    }

    Ok((elif_blocks, else_block))
}
