/// The sentence pattern table.
///
/// An ordered, immutable list of `(compiled regex, action)` pairs. Patterns
/// are attempted in order and the first match wins, so ordering is
/// semantically significant: specific forms (`create a list called X`) must
/// precede the general ones (`create a variable called X`), and
/// `add X and Y and store the result in Z` must precede `add X to Y`.
use once_cell::sync::Lazy;
use regex::Regex;

/// What a matched pattern means. Capture-group layout is documented per
/// variant; `Header` actions are only legal on `:`-terminated sentences,
/// everything else only on `.`-terminated ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // ── Block headers (require a `:` terminator) ───────────────────────
    /// (name, params?) — `create function F that takes a and b`
    FuncDef,
    /// (name) — `create function F` / `define function F`
    FuncDefNoParams,
    /// (cond) — `otherwise if C` / `else if C`
    ElifHeader,
    /// () — `otherwise` / `else`
    ElseHeader,
    /// (cond) — `if C` / `when C`
    IfHeader,
    /// (count) — `repeat N times`
    RepeatHeader,
    /// (cond) — `while C` / `repeat while C` / `loop while C`
    WhileHeader,
    /// (cond) — `loop until C`, negated
    UntilHeader,
    /// (var, iterable) — `for each X in E`
    ForEachHeader,

    // ── Simple statements (require a `.` terminator) ───────────────────
    /// (name, values) — `create a list called X with values [..]`
    ListCreate,
    /// (name) — `create an empty list called X`
    ListCreateEmpty,
    /// (name, value?) — `create a variable called X with value E`
    CreateVar,
    /// (name, value) — `define X as E`
    DefineAs,
    /// (name, value) — `set X to E`
    SetTo,
    /// (value, name) — `store E in X` / `save E as X`
    Store,
    /// (a, b, target) — `add A and B and store the result in Z`
    AddStore,
    /// (a, b, target) — `subtract A from B and store …` (Z = B − A)
    SubFromStore,
    /// (a, b, target) — `subtract A and B and store …` (Z = A − B)
    SubStore,
    /// (a, b, target) — `multiply A and B and store …` / `multiply A by B …`
    MulStore,
    /// (a, b, target) — `divide A by B and store …`
    DivStore,
    /// (value, name) — `add E to X`; append if X is a declared list,
    /// in-place arithmetic otherwise
    AddTo,
    /// (value, name) — `append E to X`
    Append,
    /// (value, name) — `subtract E from X`
    SubtractFrom,
    /// (name, value) — `multiply X by E`
    MultiplyBy,
    /// (name, value) — `divide X by E`
    DivideBy,
    /// (name)
    Increment,
    /// (name)
    Decrement,
    /// (expr) — `display E` / `show E` / `print E` / `say E`
    Display,
    /// (name) — `ask the user for a number called X`
    AskNumberCalled,
    /// (prompt, name) — `ask the user for … called X`
    AskTextCalled,
    /// (name) — `ask the user for X`
    AskText,
    /// (name) — `get a number from the user and store it in X`
    GetNumber,
    /// (name) — `get text from the user and store it in X`
    GetText,
    /// (cond, stmt) — inline `if C, S`
    InlineIf,
    /// (stmt) — inline `otherwise S`
    InlineElse,
    /// ()
    Break,
    /// ()
    Continue,
    /// (fn, args, target) — `call F with A and B and store the result in X`
    CallStore,
    /// (fn, args) — `call F with A and B`
    CallArgs,
    /// (fn, target?) — `call F` / `call F and store the result in X`
    CallBare,
    /// (expr)
    Return,
    /// ()
    ReturnVoid,
    /// (path, name) — `read file P into X`
    ReadFile,
    /// (expr, path) — `write E to file P`
    WriteFile,
}

impl Action {
    /// Whether this action is a `:`-terminated block header.
    pub fn is_header(self) -> bool {
        matches!(
            self,
            Action::FuncDef
                | Action::FuncDefNoParams
                | Action::ElifHeader
                | Action::ElseHeader
                | Action::IfHeader
                | Action::RepeatHeader
                | Action::WhileHeader
                | Action::UntilHeader
                | Action::ForEachHeader
        )
    }
}

pub struct Pattern {
    pub regex: Regex,
    pub action: Action,
}

fn pat(regex: &str, action: Action) -> Pattern {
    Pattern {
        regex: Regex::new(&format!("(?i)^{}$", regex)).expect("invalid sentence pattern"),
        action,
    }
}

/// The table. First match wins; do not reorder casually.
pub static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        // Functions before the generic create/define rules.
        pat(r"create\s+function\s+(\w+)\s+that\s+takes\s+(.+)", Action::FuncDef),
        pat(r"define\s+function\s+(\w+)\s+with\s+parameters?\s+(.+)", Action::FuncDef),
        pat(r"(?:create|define)\s+function\s+(\w+)", Action::FuncDefNoParams),
        // Lists before the generic variable-creation rule.
        pat(r"create\s+(?:an?\s+)?list\s+called\s+(\w+)\s+with\s+values\s+(.+)", Action::ListCreate),
        pat(r"create\s+an\s+empty\s+list\s+called\s+(\w+)", Action::ListCreateEmpty),
        pat(r"create\s+(?:a\s+)?list\s+called\s+(\w+)", Action::ListCreateEmpty),
        pat(
            r"(?:create|make)\s+(?:a\s+)?(?:variable\s+)?(?:called\s+)?(\w+)(?:\s+with\s+value\s+(.+))?",
            Action::CreateVar,
        ),
        pat(r"define\s+(\w+)\s+as\s+(.+)", Action::DefineAs),
        pat(r"set\s+(\w+)\s+to\s+(.+)", Action::SetTo),
        pat(r"store\s+(.+)\s+in\s+(\w+)", Action::Store),
        pat(r"save\s+(.+)\s+as\s+(\w+)", Action::Store),
        // Three-address arithmetic before the in-place forms.
        pat(
            r"add\s+(.+?)\s+and\s+(.+?)\s+and\s+store\s+(?:the\s+)?(?:result\s+)?in\s+(\w+)",
            Action::AddStore,
        ),
        pat(
            r"subtract\s+(.+?)\s+from\s+(.+?)\s+and\s+store\s+(?:the\s+)?(?:result\s+)?in\s+(\w+)",
            Action::SubFromStore,
        ),
        pat(
            r"subtract\s+(.+?)\s+and\s+(.+?)\s+and\s+store\s+(?:the\s+)?(?:result\s+)?in\s+(\w+)",
            Action::SubStore,
        ),
        pat(
            r"multiply\s+(.+?)\s+(?:and|by)\s+(.+?)\s+and\s+store\s+(?:the\s+)?(?:result\s+)?in\s+(\w+)",
            Action::MulStore,
        ),
        pat(
            r"divide\s+(.+?)\s+(?:and|by)\s+(.+?)\s+and\s+store\s+(?:the\s+)?(?:result\s+)?in\s+(\w+)",
            Action::DivStore,
        ),
        // `add X to Y` stays ambiguous until the declared-list pass decides.
        pat(r"add\s+(.+?)\s+to\s+(\w+)", Action::AddTo),
        pat(r"append\s+(.+?)\s+to\s+(\w+)", Action::Append),
        pat(r"subtract\s+(.+?)\s+from\s+(\w+)", Action::SubtractFrom),
        pat(r"multiply\s+(\w+)\s+by\s+(.+)", Action::MultiplyBy),
        pat(r"divide\s+(\w+)\s+by\s+(.+)", Action::DivideBy),
        pat(r"increment\s+(\w+)", Action::Increment),
        pat(r"decrement\s+(\w+)", Action::Decrement),
        pat(r"(?:display|show|print|say)\s+(.+)", Action::Display),
        pat(r"ask\s+the\s+user\s+for\s+a\s+number\s+called\s+(\w+)", Action::AskNumberCalled),
        pat(
            r"ask\s+the\s+user\s+for\s+(?:their\s+|an?\s+)?(.+?)\s+\(?called\s+(\w+)\)?",
            Action::AskTextCalled,
        ),
        pat(r"ask\s+the\s+user\s+for\s+(?:their\s+|an?\s+)?(\w+)", Action::AskText),
        pat(
            r"get\s+a\s+number\s+from\s+the\s+user\s+and\s+store\s+it\s+in\s+(\w+)",
            Action::GetNumber,
        ),
        pat(
            r"get\s+(?:some\s+)?text\s+from\s+the\s+user\s+and\s+store\s+it\s+in\s+(\w+)",
            Action::GetText,
        ),
        // Control flow.
        pat(r"otherwise\s+if\s+(.+?)(?:,?\s+then)?", Action::ElifHeader),
        pat(r"else\s+if\s+(.+?)(?:,?\s+then)?", Action::ElifHeader),
        pat(r"(?:otherwise|else)", Action::ElseHeader),
        pat(r"(?:if|when)\s+(.+?)(?:,?\s+then)?", Action::IfHeader),
        pat(r"(?:if|when)\s+(.+?),\s*(?:then\s+)?(.+)", Action::InlineIf),
        pat(r"(?:otherwise|else),?\s+(.+)", Action::InlineElse),
        pat(r"repeat\s+(.+?)\s+times?", Action::RepeatHeader),
        pat(r"loop\s+until\s+(.+)", Action::UntilHeader),
        pat(r"(?:repeat\s+while|loop\s+while|while)\s+(.+)", Action::WhileHeader),
        pat(r"for\s+each\s+(\w+)\s+in\s+(.+)", Action::ForEachHeader),
        pat(r"(?:stop\s+the\s+loop|stop|break(?:\s+the\s+loop)?)", Action::Break),
        pat(
            r"(?:continue(?:\s+to\s+(?:the\s+)?next\s+iteration)?|next\s+iteration)",
            Action::Continue,
        ),
        // Calls: with-store before with-args before bare.
        pat(
            r"(?:call|run)\s+(\w+)\s+with\s+(.+?)\s+and\s+store\s+(?:the\s+)?(?:result\s+)?in\s+(\w+)",
            Action::CallStore,
        ),
        pat(r"(?:call|run)\s+(\w+)\s+with\s+(.+)", Action::CallArgs),
        pat(
            r"(?:call|run)\s+(\w+)(?:\s+and\s+store\s+(?:the\s+)?(?:result\s+)?in\s+(\w+))?",
            Action::CallBare,
        ),
        pat(r"return\s+(.+)", Action::Return),
        pat(r"(?:return|exit(?:\s+the\s+function)?)", Action::ReturnVoid),
        pat(r"read\s+file\s+(.+?)\s+into\s+(\w+)", Action::ReadFile),
        pat(r"write\s+(.+?)\s+to\s+file\s+(.+)", Action::WriteFile),
    ]
});

/// First pattern (in table order) matching `text` under the right
/// terminator class.
pub fn match_sentence(text: &str, header: bool) -> Option<(&'static Pattern, regex::Captures<'_>)> {
    for pattern in PATTERNS.iter() {
        if pattern.action.is_header() != header {
            continue;
        }
        if let Some(caps) = pattern.regex.captures(text) {
            return Some((pattern, caps));
        }
    }
    None
}
