//! Static code analysis tool
//!
//! Actions:
//! - `analyze` - line counts, function count, language, SHA-256 fingerprint
//! - `complexity` - decision point count and a cyclomatic complexity estimate
//!
//! Example step config:
//! ```yaml
//! - id: review
//!   type: tool
//!   config:
//!     tool: code_analyzer
//!     action: analyze
//!     parameters:
//!       language: rust
//!   inputs:
//!     - name: code
//!       source: source_code
//!       required: true
//! ```

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use super::{str_param, Tool, ToolAction, ToolExecutionContext, ToolKind, ToolResult};
use crate::workflow::LogLevel;

static FUNCTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:fn|def|func|function)\s+\w+")
        .unwrap()
});

static DECISION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|elif|else if|for|while|case|catch|except|match)\b|&&|\|\||\?\s").unwrap()
});

#[derive(Debug, Default)]
pub struct CodeAnalyzerTool;

impl CodeAnalyzerTool {
    pub fn new() -> Self {
        Self
    }
}

/// Guess a language from obvious markers when none is given
pub fn detect_language(code: &str) -> &'static str {
    if code.contains("fn ") && (code.contains("let ") || code.contains("->")) {
        "rust"
    } else if code.contains("def ") && code.contains(':') {
        "python"
    } else if code.contains("func ") && code.contains("package ") {
        "go"
    } else if code.contains("function ") || code.contains("=>") || code.contains("const ") {
        "javascript"
    } else {
        "unknown"
    }
}

fn comment_prefix(language: &str) -> &'static [&'static str] {
    match language {
        "python" | "ruby" | "shell" | "bash" => &["#"],
        "sql" | "lua" => &["--"],
        _ => &["//", "/*", "*", "*/"],
    }
}

/// Line, function and fingerprint summary of `code`
pub fn analyze(code: &str, language: &str) -> Value {
    let prefixes = comment_prefix(language);
    let mut blank = 0usize;
    let mut comment = 0usize;
    let mut total = 0usize;

    for line in code.lines() {
        total += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            blank += 1;
        } else if prefixes.iter().any(|p| trimmed.starts_with(p)) {
            comment += 1;
        }
    }

    let fingerprint = hex::encode(Sha256::digest(code.as_bytes()));

    json!({
        "language": language,
        "totalLines": total,
        "codeLines": total - blank - comment,
        "commentLines": comment,
        "blankLines": blank,
        "functions": FUNCTION_REGEX.find_iter(code).count(),
        "characters": code.chars().count(),
        "fingerprint": fingerprint,
    })
}

/// Cyclomatic complexity estimate of `code`
pub fn complexity(code: &str) -> Value {
    let decisions = DECISION_REGEX.find_iter(code).count();
    let functions = FUNCTION_REGEX.find_iter(code).count().max(1);
    let cyclomatic = decisions + functions;
    let per_function = cyclomatic as f64 / functions as f64;

    let rating = match per_function {
        x if x <= 5.0 => "low",
        x if x <= 10.0 => "moderate",
        x if x <= 20.0 => "high",
        _ => "very high",
    };

    json!({
        "decisionPoints": decisions,
        "cyclomatic": cyclomatic,
        "averagePerFunction": (per_function * 100.0).round() / 100.0,
        "rating": rating,
    })
}

#[async_trait]
impl Tool for CodeAnalyzerTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CodeAnalyzer
    }

    fn actions(&self) -> &'static [ToolAction] {
        &[ToolAction::Analyze, ToolAction::Complexity]
    }

    async fn invoke(
        &self,
        action: ToolAction,
        params: &Map<String, Value>,
        ctx: &ToolExecutionContext<'_>,
    ) -> ToolResult {
        let Some(code) = str_param(params, "code") else {
            return ToolResult::error("code_analyzer requires a 'code' parameter");
        };
        let language = str_param(params, "language").unwrap_or_else(|| detect_language(code));

        ctx.log(
            LogLevel::Debug,
            format!("Analyzing {} bytes of {}", code.len(), language),
        );

        match action {
            ToolAction::Analyze => ToolResult::ok(analyze(code, language)),
            ToolAction::Complexity => ToolResult::ok(complexity(code))
                .with_metadata(json!({ "language": language })),
            other => ToolResult::error(format!("code_analyzer does not support '{}'", other)),
        }
    }
}
