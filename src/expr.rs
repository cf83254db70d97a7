//! Sandboxed evaluation of arrow-function mock annotations.
//!
//! `() => expr` and `(body) => expr` annotations are evaluated as single Rhai
//! expressions, never as statements, with operation and depth limits and no
//! output side effects. The request body is bound under the arrow's parameter
//! name. A few JavaScript spellings (`===`, `!==`, top-level `({ ... })`) are
//! accepted and rewritten to their Rhai forms.

use crate::annotation::parse_arrow;
use crate::faker;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::Name;
use fake::Fake;
use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;
use thiserror::Error;

const MAX_OPERATIONS: u64 = 50_000;
const MAX_EXPR_DEPTH: usize = 64;
const MAX_STRING_SIZE: usize = 1 << 20;
const MAX_ARRAY_SIZE: usize = 10_000;

/// Errors raised while evaluating an annotation expression.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("not an arrow function expression: {0}")]
    NotAnArrow(String),

    #[error("failed to evaluate expression: {0}")]
    Eval(#[from] Box<rhai::EvalAltResult>),
}

/// Restricted expression evaluator.
pub struct ExpressionEvaluator {
    engine: Engine,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        let mut engine = Engine::new();

        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_expr_depths(MAX_EXPR_DEPTH, MAX_EXPR_DEPTH);
        engine.set_max_string_size(MAX_STRING_SIZE);
        engine.set_max_array_size(MAX_ARRAY_SIZE);
        engine.set_max_map_size(MAX_ARRAY_SIZE);
        engine.on_print(|_| {});
        engine.on_debug(|_, _, _| {});

        engine.register_fn("fake_name", || Name().fake::<String>());
        engine.register_fn("fake_email", || SafeEmail().fake::<String>());
        engine.register_fn("fake_word", || Word().fake::<String>());
        engine.register_fn("fake_sentence", || Sentence(3..10).fake::<String>());
        engine.register_fn("uuid", faker::random_uuid);
        engine.register_fn("now", || chrono::Utc::now().to_rfc3339());

        Self { engine }
    }

    /// Evaluate an arrow expression. The body is only bound when the arrow
    /// declares a parameter.
    pub fn evaluate(&self, source: &str, body: Option<&Value>) -> Result<Value, ExprError> {
        let arrow = parse_arrow(source).ok_or_else(|| ExprError::NotAnArrow(source.to_string()))?;
        let script = to_rhai(arrow.body);

        let mut scope = Scope::new();
        if let Some(param) = arrow.param {
            let bound = match body {
                Some(value) => rhai::serde::to_dynamic(value)?,
                None => rhai::serde::to_dynamic(Value::Object(Default::default()))?,
            };
            scope.push_dynamic(param, bound);
        }

        let result = self
            .engine
            .eval_expression_with_scope::<Dynamic>(&mut scope, &script)?;

        Ok(rhai::serde::from_dynamic::<Value>(&result)?)
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite JavaScript-flavored operators and object literals into Rhai syntax.
fn to_rhai(body: &str) -> String {
    let mut script = body.trim().to_string();

    if script.starts_with("({") && script.ends_with("})") {
        script = script[1..script.len() - 1].to_string();
    }
    if script.starts_with('{') {
        script.insert(0, '#');
    }

    loosen_equality(&script)
}

/// Turn `===`/`!==` into `==`/`!=`, leaving string literals untouched.
fn loosen_equality(script: &str) -> String {
    let mut out = String::with_capacity(script.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = script.char_indices();

    while let Some((i, ch)) = chars.next() {
        out.push(ch);
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if ch == '\\' => escaped = true,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' || ch == '`' => quote = Some(ch),
            None if (ch == '=' || ch == '!') && script[i + 1..].starts_with("==") => {
                // keep the next `=` and drop the one after it
                if let Some((_, next)) = chars.next() {
                    out.push(next);
                }
                chars.next();
            }
            None => {}
        }
    }

    out
}
