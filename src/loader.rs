/// Source reader.
///
/// Loads UTF-8 program text and expands `Include "path".` lines by inlining
/// the (recursively expanded) contents of the named file, resolved relative
/// to the including file. A stack of in-progress canonical paths detects
/// include cycles.
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Included file not found: '{path}'")]
    IncludeMissing { path: String },
    #[error("Include cycle detected: {chain}")]
    IncludeCycle { chain: String },
}

static INCLUDE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^\s*include\s+["'](.+?)["']\s*\.?\s*$"#).unwrap());

/// Load a program from `entry`, expanding includes. A read failure on the
/// entry file itself is an I/O error; a missing *included* file is a parse
/// concern and gets its own kind.
pub fn load_source(entry: &Path) -> Result<String, LoadError> {
    let text = std::fs::read_to_string(entry).map_err(|e| LoadError::Io {
        path: entry.display().to_string(),
        source: e,
    })?;
    let base_dir = entry.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let mut stack = vec![canonicalize_path(entry)];
    expand_includes(&text, &base_dir, &mut stack)
}

/// Expand `Include` lines in already-loaded text. Used directly by the REPL,
/// where there is no entry file.
pub fn expand_includes(
    text: &str,
    base_dir: &Path,
    stack: &mut Vec<PathBuf>,
) -> Result<String, LoadError> {
    let mut out_lines: Vec<String> = Vec::new();

    for raw_line in text.lines() {
        let captures = match INCLUDE_RE.captures(raw_line) {
            Some(c) => c,
            None => {
                out_lines.push(raw_line.to_string());
                continue;
            }
        };

        let rel = captures[1].trim();
        let include_path = canonicalize_path(&base_dir.join(rel));

        if stack.contains(&include_path) {
            let chain = stack
                .iter()
                .chain(std::iter::once(&include_path))
                .map(|p| file_stem(p))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(LoadError::IncludeCycle { chain });
        }

        let included = std::fs::read_to_string(&include_path).map_err(|_| {
            LoadError::IncludeMissing {
                path: include_path.display().to_string(),
            }
        })?;

        stack.push(include_path.clone());
        let next_base = include_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let expanded = expand_includes(&included, &next_base, stack)?;
        stack.pop();

        out_lines.push(expanded);
    }

    Ok(out_lines.join("\n"))
}

fn canonicalize_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("?")
        .to_string()
}
