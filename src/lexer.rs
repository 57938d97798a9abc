/// Sentence splitter.
///
/// Vyra source is a sequence of English sentences terminated by `.` (simple
/// statement) or `:` (block header). The splitter produces them in order,
/// each carrying its indentation and terminator, while treating quoted
/// strings and `[...]` list literals as opaque. `#` comments and `Note:`
/// sentences are removed here.
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `.` — a simple statement.
    Period,
    /// `:` — opens a block of more-indented sentences.
    Colon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    /// The sentence text, trimmed, without its terminator.
    pub text: String,
    /// Leading space count of the line the sentence starts on (tabs count
    /// as four spaces).
    pub indent: usize,
    pub terminator: Terminator,
    /// 1-based source line where the sentence starts.
    pub line: usize,
}

#[derive(Debug, Error)]
pub enum LexerError {
    #[error("Unterminated string literal at line {line}")]
    UnterminatedString { line: usize },
    #[error("Sentence without terminator at line {line}: '{text}'")]
    UnterminatedSentence { line: usize, text: String },
}

const TAB_WIDTH: usize = 4;

/// Split source text into sentences.
pub fn split_sentences(source: &str) -> Result<Vec<Sentence>, LexerError> {
    let chars: Vec<char> = source.chars().collect();
    let mut sentences = Vec::new();

    let mut buf = String::new();
    let mut buf_line = 1usize;
    let mut buf_indent = 0usize;

    let mut line = 1usize;
    let mut line_indent = 0usize;
    let mut at_line_start = true;

    let mut in_string: Option<char> = None;
    let mut bracket_depth = 0usize;
    let mut in_note = false;

    let mut i = 0usize;
    while i < chars.len() {
        let ch = chars[i];

        if let Some(quote) = in_string {
            if ch == '\n' {
                return Err(LexerError::UnterminatedString { line });
            }
            buf.push(ch);
            if ch == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        match ch {
            '\n' => {
                line += 1;
                line_indent = 0;
                at_line_start = true;
                if !buf.trim().is_empty() {
                    buf.push(' ');
                }
            }
            '\r' => {}
            ' ' | '\t' => {
                if at_line_start {
                    line_indent += if ch == '\t' { TAB_WIDTH } else { 1 };
                } else if !buf.trim().is_empty() {
                    buf.push(' ');
                }
            }
            '#' => {
                // Comment to end of line; the newline itself is handled above.
                while i + 1 < chars.len() && chars[i + 1] != '\n' {
                    i += 1;
                }
            }
            '"' | '\'' => {
                mark_start(&mut buf, &mut at_line_start, &mut buf_line, &mut buf_indent, line, line_indent);
                in_string = Some(ch);
                buf.push(ch);
            }
            '[' => {
                mark_start(&mut buf, &mut at_line_start, &mut buf_line, &mut buf_indent, line, line_indent);
                bracket_depth += 1;
                buf.push(ch);
            }
            ']' => {
                bracket_depth = bracket_depth.saturating_sub(1);
                buf.push(ch);
            }
            '.' if bracket_depth == 0 => {
                // A dot between digits is a decimal point, not a terminator.
                let prev_digit = buf.chars().rev().find(|c| !c.is_whitespace()).map_or(false, |c| c.is_ascii_digit());
                let next_digit = chars.get(i + 1).map_or(false, |c| c.is_ascii_digit());
                if prev_digit && next_digit {
                    buf.push(ch);
                } else {
                    emit(&mut sentences, &mut buf, buf_indent, buf_line, Terminator::Period, &mut in_note);
                }
            }
            ':' if bracket_depth == 0 => {
                emit(&mut sentences, &mut buf, buf_indent, buf_line, Terminator::Colon, &mut in_note);
            }
            other => {
                mark_start(&mut buf, &mut at_line_start, &mut buf_line, &mut buf_indent, line, line_indent);
                buf.push(other);
            }
        }
        i += 1;
    }

    let trailing = buf.trim();
    if !trailing.is_empty() {
        return Err(LexerError::UnterminatedSentence {
            line: buf_line,
            text: trailing.to_string(),
        });
    }

    Ok(sentences)
}

/// Record where a sentence begins the first time visible content arrives.
fn mark_start(
    buf: &mut String,
    at_line_start: &mut bool,
    buf_line: &mut usize,
    buf_indent: &mut usize,
    line: usize,
    line_indent: usize,
) {
    if buf.trim().is_empty() {
        buf.clear();
        *buf_line = line;
        *buf_indent = line_indent;
    }
    *at_line_start = false;
}

fn emit(
    sentences: &mut Vec<Sentence>,
    buf: &mut String,
    indent: usize,
    line: usize,
    terminator: Terminator,
    in_note: &mut bool,
) {
    let text = buf.trim().to_string();
    buf.clear();
    // `Note: ...` is a comment running to the next terminator. The colon
    // after `Note` splits like any other, so the marker arrives alone and
    // the note body is the sentence after it.
    if *in_note {
        *in_note = false;
        return;
    }
    if text.is_empty() {
        return;
    }
    if text.eq_ignore_ascii_case("note") && terminator == Terminator::Colon {
        *in_note = true;
        return;
    }
    sentences.push(Sentence {
        text,
        indent,
        terminator,
        line,
    });
}
