use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
    /// String concatenation: `X followed by Y`. Coerces both sides to text.
    FollowedBy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    List(Vec<Expr>),
    /// Call in expression position: built-ins or user functions.
    Call(String, Vec<Expr>),
    /// Sequence indexing: `xs[i]`.
    Index(Box<Expr>, Box<Expr>),
}

/// What an `Ask` statement expects from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskKind {
    Text,
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign {
        target: String,
        expr: Expr,
    },
    Display(Expr),
    Ask {
        target: String,
        kind: AskKind,
        prompt: String,
    },
    If {
        cond: Expr,
        then_block: Vec<Stmt>,
        elif_blocks: Vec<(Expr, Vec<Stmt>)>,
        else_block: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Repeat {
        count: Expr,
        body: Vec<Stmt>,
    },
    ForEach {
        var: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        target: Option<String>,
    },
    Return(Option<Expr>),
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
}

/// A parsed program: the ordered top-level statement list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    /// Render the program back to canonical sentences. Parsing the result
    /// yields a semantically equivalent program; expressions come out in
    /// their parenthesized symbolic form via [`Expr`]'s `Display`.
    pub fn to_canonical(&self) -> String {
        let mut out = String::new();
        for stmt in &self.statements {
            write_stmt(&mut out, stmt, 0);
        }
        out
    }
}

fn write_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    let pad = "    ".repeat(depth);
    match &stmt.kind {
        StmtKind::Assign { target, expr } => {
            out.push_str(&format!("{}Set {} to {}.\n", pad, target, expr));
        }
        StmtKind::Display(expr) => {
            out.push_str(&format!("{}Display {}.\n", pad, expr));
        }
        StmtKind::Ask { target, kind, .. } => match kind {
            AskKind::Number => out.push_str(&format!(
                "{}Ask the user for a number called {}.\n",
                pad, target
            )),
            AskKind::Text => {
                out.push_str(&format!("{}Ask the user for {}.\n", pad, target))
            }
        },
        StmtKind::If {
            cond,
            then_block,
            elif_blocks,
            else_block,
        } => {
            out.push_str(&format!("{}If {}:\n", pad, cond));
            for s in then_block {
                write_stmt(out, s, depth + 1);
            }
            for (elif_cond, block) in elif_blocks {
                out.push_str(&format!("{}Otherwise if {}:\n", pad, elif_cond));
                for s in block {
                    write_stmt(out, s, depth + 1);
                }
            }
            if !else_block.is_empty() {
                out.push_str(&format!("{}Otherwise:\n", pad));
                for s in else_block {
                    write_stmt(out, s, depth + 1);
                }
            }
        }
        StmtKind::While { cond, body } => {
            out.push_str(&format!("{}While {}:\n", pad, cond));
            for s in body {
                write_stmt(out, s, depth + 1);
            }
        }
        StmtKind::Repeat { count, body } => {
            out.push_str(&format!("{}Repeat {} times:\n", pad, count));
            for s in body {
                write_stmt(out, s, depth + 1);
            }
        }
        StmtKind::ForEach { var, iter, body } => {
            out.push_str(&format!("{}For each {} in {}:\n", pad, var, iter));
            for s in body {
                write_stmt(out, s, depth + 1);
            }
        }
        StmtKind::Break => out.push_str(&format!("{}Stop the loop.\n", pad)),
        StmtKind::Continue => out.push_str(&format!("{}Continue.\n", pad)),
        StmtKind::FunctionDef { name, params, body } => {
            if params.is_empty() {
                out.push_str(&format!("{}Create function {}:\n", pad, name));
            } else {
                out.push_str(&format!(
                    "{}Create function {} that takes {}:\n",
                    pad,
                    name,
                    params.join(" and ")
                ));
            }
            for s in body {
                write_stmt(out, s, depth + 1);
            }
        }
        StmtKind::Call { name, args, target } => {
            out.push_str(&format!("{}Call {}", pad, name));
            if !args.is_empty() {
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                out.push_str(&format!(" with {}", rendered.join(" and ")));
            }
            if let Some(target) = target {
                out.push_str(&format!(" and store the result in {}", target));
            }
            out.push_str(".\n");
        }
        StmtKind::Return(Some(expr)) => {
            out.push_str(&format!("{}Return {}.\n", pad, expr));
        }
        StmtKind::Return(None) => out.push_str(&format!("{}Return.\n", pad)),
        StmtKind::ListAppend { target, expr } => {
            out.push_str(&format!("{}Append {} to {}.\n", pad, expr, target));
        }
        StmtKind::ReadFile { path, target } => {
            out.push_str(&format!("{}Read file {} into {}.\n", pad, path, target));
        }
        StmtKind::WriteFile { expr, path } => {
            out.push_str(&format!("{}Write {} to file {}.\n", pad, expr, path));
        }
    }
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Lte => "<=",
            BinOp::Gte => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::FollowedBy => "followed by",
        }
    }
}

/// Canonical symbolic form, used by the graph dump.
impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(Value::Str(s)) => write!(f, "\"{}\"", s),
            Expr::Literal(v) => write!(f, "{}", crate::value::vyra_repr(v)),
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Unary(UnaryOp::Not, e) => write!(f, "(not {})", e),
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "(-{})", e),
            Expr::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expr::Call(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Index(seq, index) => write!(f, "{}[{}]", seq, index),
        }
    }
}
