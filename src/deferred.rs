//! Request-time evaluation of deferred synthesis leaves.

use crate::annotation::{self, ParsedAnnotation};
use crate::faker;
use crate::synth::{DeferredComputation, Synthesized, Synthesizer};
use serde_json::{Map, Value};
use tracing::debug;

impl Synthesizer {
    /// Resolve every deferred leaf in `tree` against the request body.
    ///
    /// Randomized leaves ignore the body and draw a fresh value. A failing
    /// body-aware expression yields `null` for that leaf only.
    pub fn evaluate_deferred(&self, tree: &Synthesized, body: &Value) -> Value {
        match tree {
            Synthesized::Value(value) => value.clone(),
            Synthesized::Deferred(computation) => self.evaluate_computation(computation, body),
            Synthesized::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.evaluate_deferred(item, body))
                    .collect(),
            ),
            Synthesized::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, item)| (key.clone(), self.evaluate_deferred(item, body)))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    fn evaluate_computation(&self, computation: &DeferredComputation, body: &Value) -> Value {
        match annotation::resolve(Some(&computation.expression)) {
            ParsedAnnotation::Randomized(source) => faker::generate(&source),
            ParsedAnnotation::DynamicExpr(source) | ParsedAnnotation::StaticExpr(source) => {
                match self.evaluator().evaluate(&source, Some(body)) {
                    Ok(value) => value,
                    Err(e) => {
                        if self.is_verbose() {
                            debug!(expression = %source, error = %e, "Deferred expression failed");
                        }
                        Value::Null
                    }
                }
            }
            ParsedAnnotation::Literal(value) => value,
            ParsedAnnotation::Raw(text) => Value::String(text),
            ParsedAnnotation::None => Value::Null,
        }
    }
}
