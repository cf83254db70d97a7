//! Mock annotation resolution.
//!
//! A field's `@mock` text is classified once, in priority order: JSON literal,
//! arrow-function expression, randomized-value call, raw string.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Classified form of a field's mock annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAnnotation {
    /// Annotation text was valid JSON
    Literal(Value),
    /// `() => expr`, evaluated without a request body
    StaticExpr(String),
    /// `(body) => expr`, evaluated against the request body
    DynamicExpr(String),
    /// `faker.namespace.method(...)` call
    Randomized(String),
    /// Anything else, used verbatim as a string value
    Raw(String),
    None,
}

impl ParsedAnnotation {
    /// Whether the value must be produced per request rather than once.
    pub fn is_deferrable(&self) -> bool {
        matches!(self, Self::DynamicExpr(_) | Self::Randomized(_))
    }
}

/// Arrow function form `(param) => body` or `() => body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrowFunction<'a> {
    pub param: Option<&'a str>,
    pub body: &'a str,
}

fn arrow_regex() -> &'static Regex {
    static ARROW: OnceLock<Regex> = OnceLock::new();
    ARROW.get_or_init(|| {
        Regex::new(r"(?s)^\(\s*([A-Za-z_$][\w$]*)?\s*\)\s*=>\s*(.+)$").expect("static regex")
    })
}

fn randomized_regex() -> &'static Regex {
    static RANDOMIZED: OnceLock<Regex> = OnceLock::new();
    RANDOMIZED.get_or_init(|| {
        Regex::new(r"(?s)^faker\.[A-Za-z_]\w*\.[A-Za-z_]\w*\s*\(.*\)$").expect("static regex")
    })
}

/// Split an arrow function into its parameter name and body text.
pub fn parse_arrow(text: &str) -> Option<ArrowFunction<'_>> {
    let caps = arrow_regex().captures(text.trim())?;
    Some(ArrowFunction {
        param: caps.get(1).map(|m| m.as_str()),
        body: caps.get(2).map(|m| m.as_str().trim())?,
    })
}

/// Classify raw annotation text. Never fails: unrecognized text is `Raw`.
pub fn resolve(annotation: Option<&str>) -> ParsedAnnotation {
    let Some(text) = annotation else {
        return ParsedAnnotation::None;
    };
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return ParsedAnnotation::Literal(value);
    }

    if let Some(arrow) = parse_arrow(trimmed) {
        return if arrow.param.is_some() {
            ParsedAnnotation::DynamicExpr(trimmed.to_string())
        } else {
            ParsedAnnotation::StaticExpr(trimmed.to_string())
        };
    }

    if randomized_regex().is_match(trimmed) {
        return ParsedAnnotation::Randomized(trimmed.to_string());
    }

    ParsedAnnotation::Raw(text.to_string())
}
