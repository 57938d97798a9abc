/// Optional English-rewrite front end.
///
/// Off by default; no network traffic unless explicitly enabled via the
/// CLI `--ai` flag or `VYRA_AI=1`. When enabled, source text is POSTed to
/// an OpenAI-compatible chat-completions endpoint that rewrites free-form
/// English into canonical Vyra sentences before parsing. Any failure halts
/// the run before parsing.
use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use thiserror::Error;

use crate::json::{self, JsonValue};

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("AIRewriteError: {0}")]
    Error(String),
}

fn err(msg: impl Into<String>) -> RewriteError {
    RewriteError::Error(msg.into())
}

#[derive(Debug, Clone)]
pub struct RewriteConfig {
    pub enabled: bool,
    pub provider: String,
    pub url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        RewriteConfig {
            enabled: false,
            provider: "openai_compatible".to_string(),
            url: None,
            model: None,
            api_key: None,
            timeout_seconds: 30,
        }
    }
}

impl RewriteConfig {
    pub fn from_env() -> RewriteConfig {
        let enabled = matches!(
            std::env::var("VYRA_AI").unwrap_or_default().trim(),
            "1" | "true" | "yes" | "on"
        );
        let provider = std::env::var("VYRA_AI_PROVIDER")
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "openai_compatible".to_string());
        let timeout_seconds = std::env::var("VYRA_AI_TIMEOUT")
            .ok()
            .and_then(|t| t.trim().parse::<u64>().ok())
            .map(|t| t.max(1))
            .unwrap_or(30);

        RewriteConfig {
            enabled,
            provider,
            url: std::env::var("VYRA_AI_URL").ok().filter(|s| !s.is_empty()),
            model: std::env::var("VYRA_AI_MODEL").ok().filter(|s| !s.is_empty()),
            api_key: std::env::var("VYRA_AI_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            timeout_seconds,
        }
    }
}

const SYSTEM_PROMPT: &str = "You rewrite free-form English into canonical Vyra code. \
Return ONLY Vyra source code, no explanations. \
Rules: one statement per line; end simple statements with '.'; \
end block headers with ':'; indent block bodies by exactly two spaces. \
Use existing Vyra verbs like Set/Store/Display/If/Otherwise/While/Repeat/For each/\
Create function/Call/Return/Break/Continue.";

const BODY_LIMIT: u64 = 10 * 1024 * 1024;

/// Rewrite `source` through the configured endpoint. With rewriting
/// disabled this is the identity.
pub fn rewrite_source(source: &str, config: &RewriteConfig) -> Result<String, RewriteError> {
    if !config.enabled {
        return Ok(source.to_string());
    }

    if config.provider.to_lowercase() != "openai_compatible" {
        return Err(err(format!(
            "unsupported provider '{}' (supported: openai_compatible)",
            config.provider
        )));
    }

    let mut missing = Vec::new();
    if config.url.is_none() {
        missing.push("VYRA_AI_URL");
    }
    if config.model.is_none() {
        missing.push("VYRA_AI_MODEL");
    }
    if !missing.is_empty() {
        return Err(err(format!(
            "rewrite is enabled but missing configuration: {}",
            missing.join(", ")
        )));
    }
    let url = config.url.as_deref().expect("checked above");
    let model = config.model.as_deref().expect("checked above");

    let body = request_body(model, source);

    let mut request = ureq::post(url)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .set("Content-Type", "application/json");
    if let Some(api_key) = &config.api_key {
        request = request.set("Authorization", &format!("Bearer {}", api_key));
    }

    let response = match request.send_string(&body) {
        Ok(resp) => resp,
        Err(ureq::Error::Status(code, _)) => {
            return Err(err(format!("rewrite request failed: HTTP {}", code)))
        }
        Err(ureq::Error::Transport(e)) => {
            return Err(err(format!("rewrite request failed: {}", e)))
        }
    };

    let mut buf = Vec::new();
    response
        .into_reader()
        .take(BODY_LIMIT)
        .read_to_end(&mut buf)
        .map_err(|e| err(format!("failed to read rewrite response: {}", e)))?;
    let text = String::from_utf8_lossy(&buf).into_owned();

    extract_content(&text)
}

fn request_body(model: &str, source: &str) -> String {
    let message = |role: &str, content: &str| {
        let mut m = BTreeMap::new();
        m.insert("role".to_string(), JsonValue::String(role.to_string()));
        m.insert(
            "content".to_string(),
            JsonValue::String(content.to_string()),
        );
        JsonValue::Object(m)
    };

    let mut payload = BTreeMap::new();
    payload.insert("model".to_string(), JsonValue::String(model.to_string()));
    payload.insert(
        "messages".to_string(),
        JsonValue::Array(vec![
            message("system", SYSTEM_PROMPT),
            message("user", source),
        ]),
    );
    payload.insert("temperature".to_string(), JsonValue::Int(0));
    json::to_string(&JsonValue::Object(payload))
}

/// Pull `choices[0].message.content` out of the response and strip any
/// Markdown fences the model wrapped it in.
fn extract_content(body: &str) -> Result<String, RewriteError> {
    let parsed =
        json::parse(body).map_err(|e| err(format!("rewrite response was not JSON: {}", e)))?;

    let content = parsed
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| err("rewrite response was not in the expected format"))?;

    let rewritten = strip_code_fences(content);
    if rewritten.trim().is_empty() {
        return Err(err("rewrite returned empty output"));
    }
    Ok(rewritten)
}

fn strip_code_fences(text: &str) -> String {
    let text = text.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }
    let without_open = match text.find('\n') {
        Some(idx) => &text[idx + 1..],
        None => return String::new(),
    };
    let without_close = without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim_end();
    without_close.to_string()
}
