//! Type-directed value synthesis.
//!
//! Walks an interface's field descriptors and produces a value tree. Only
//! required fields are emitted. In deferred mode, body-aware and randomized
//! annotations become [`DeferredComputation`] leaves that are filled in per
//! request; in eager mode they are evaluated on the spot.

use crate::annotation::{self, ParsedAnnotation};
use crate::descriptor::{TypeDescriptor, TypeKind};
use crate::expr::ExpressionEvaluator;
use crate::faker;
use crate::heuristics;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// How body-aware and randomized annotations are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    /// Evaluate everything immediately
    Eager,
    /// Leave per-request annotations as deferred markers
    Deferred,
}

/// A leaf that must be evaluated against the request body before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredComputation {
    pub expression: String,
}

/// Synthesized value tree, possibly containing deferred leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesized {
    Value(Value),
    Deferred(DeferredComputation),
    Array(Vec<Synthesized>),
    Object(Vec<(String, Synthesized)>),
}

impl Synthesized {
    /// Whether any deferred leaf remains in the tree.
    pub fn has_deferred(&self) -> bool {
        match self {
            Synthesized::Value(_) => false,
            Synthesized::Deferred(_) => true,
            Synthesized::Array(items) => items.iter().any(Synthesized::has_deferred),
            Synthesized::Object(fields) => fields.iter().any(|(_, v)| v.has_deferred()),
        }
    }

    /// Convert a tree without deferred leaves into a plain value.
    ///
    /// Deferred leaves, if any, become `null`.
    pub fn into_value(self) -> Value {
        match self {
            Synthesized::Value(value) => value,
            Synthesized::Deferred(_) => Value::Null,
            Synthesized::Array(items) => {
                Value::Array(items.into_iter().map(Synthesized::into_value).collect())
            }
            Synthesized::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.into_value()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

/// Produces mock values from field descriptors.
#[derive(Clone)]
pub struct Synthesizer {
    evaluator: Arc<ExpressionEvaluator>,
    verbose: bool,
}

impl Synthesizer {
    pub fn new(evaluator: Arc<ExpressionEvaluator>, verbose: bool) -> Self {
        Self { evaluator, verbose }
    }

    pub fn evaluator(&self) -> &ExpressionEvaluator {
        &self.evaluator
    }

    /// Whether per-field evaluation failures are logged.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Synthesize an object holding exactly the required fields.
    ///
    /// `body` is only consulted in eager mode; body-aware expressions see
    /// `{}` when it is absent.
    pub fn synthesize(
        &self,
        fields: &[TypeDescriptor],
        mode: SynthesisMode,
        body: Option<&Value>,
    ) -> Synthesized {
        let entries = fields
            .iter()
            .filter(|field| !field.optional)
            .map(|field| (field.name.clone(), self.synthesize_field(field, mode, body)))
            .collect();

        Synthesized::Object(entries)
    }

    /// Eager synthesis straight to a plain value.
    pub fn synthesize_value(&self, fields: &[TypeDescriptor], body: Option<&Value>) -> Value {
        self.synthesize(fields, SynthesisMode::Eager, body).into_value()
    }

    fn synthesize_field(
        &self,
        field: &TypeDescriptor,
        mode: SynthesisMode,
        body: Option<&Value>,
    ) -> Synthesized {
        match annotation::resolve(field.annotation.as_deref()) {
            ParsedAnnotation::Literal(value) => Synthesized::Value(value),
            ParsedAnnotation::Raw(text) => Synthesized::Value(Value::String(text)),
            ParsedAnnotation::StaticExpr(source) => {
                Synthesized::Value(self.evaluate_or_null(&field.name, &source, None))
            }
            ParsedAnnotation::DynamicExpr(source) | ParsedAnnotation::Randomized(source)
                if mode == SynthesisMode::Deferred =>
            {
                Synthesized::Deferred(DeferredComputation { expression: source })
            }
            ParsedAnnotation::DynamicExpr(source) => {
                Synthesized::Value(self.evaluate_or_null(&field.name, &source, body))
            }
            ParsedAnnotation::Randomized(source) => Synthesized::Value(faker::generate(&source)),
            ParsedAnnotation::None => self.synthesize_kind(field, mode, body),
        }
    }

    fn synthesize_kind(
        &self,
        field: &TypeDescriptor,
        mode: SynthesisMode,
        body: Option<&Value>,
    ) -> Synthesized {
        match &field.kind {
            TypeKind::Array(_) => {
                let element = field
                    .element()
                    .map(|element| self.synthesize_field(&element, mode, body))
                    .unwrap_or(Synthesized::Value(Value::Null));
                Synthesized::Array(vec![element])
            }
            // Nested structures are not expanded
            TypeKind::Object | TypeKind::Reference(_) => Synthesized::Value(Value::Object(Map::new())),
            TypeKind::Primitive(kind) => {
                Synthesized::Value(heuristics::realistic_value(&field.name, *kind))
            }
        }
    }

    fn evaluate_or_null(&self, field: &str, source: &str, body: Option<&Value>) -> Value {
        let empty = Value::Object(Map::new());
        let body = Some(body.unwrap_or(&empty));

        match self.evaluator.evaluate(source, body) {
            Ok(value) => value,
            Err(e) => {
                if self.verbose {
                    debug!(field = %field, error = %e, "Mock expression failed, using null");
                }
                Value::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PrimitiveKind;
    use serde_json::json;

    fn synthesizer() -> Synthesizer {
        Synthesizer::new(Arc::new(ExpressionEvaluator::new()), false)
    }

    fn number(name: &str) -> TypeDescriptor {
        TypeDescriptor::required(name, TypeKind::Primitive(PrimitiveKind::Number))
    }

    fn string(name: &str) -> TypeDescriptor {
        TypeDescriptor::required(name, TypeKind::Primitive(PrimitiveKind::String))
    }

    #[test]
    fn test_literal_annotation() {
        let fields = vec![number("id").with_annotation("123")];
        let value = synthesizer().synthesize_value(&fields, None);
        assert_eq!(value, json!({"id": 123}));
    }

    #[test]
    fn test_literal_ignores_declared_kind() {
        let literal = json!({"nested": [1, "two", null]});
        let fields = vec![string("data").with_annotation(literal.to_string())];
        let value = synthesizer().synthesize_value(&fields, None);
        assert_eq!(value["data"], literal);
    }

    #[test]
    fn test_required_only() {
        let fields = vec![
            TypeDescriptor::required("flag", TypeKind::Primitive(PrimitiveKind::Boolean)).optional(),
            string("name"),
            number("note").with_annotation("5").optional(),
        ];
        let value = synthesizer().synthesize_value(&fields, None);
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name".to_string()]);
    }

    #[test]
    fn test_raw_and_static() {
        let fields = vec![
            string("greeting").with_annotation("hello there"),
            number("answer").with_annotation("() => 6 * 7"),
            number("broken").with_annotation("() => nope()"),
        ];
        let value = synthesizer().synthesize_value(&fields, None);
        assert_eq!(value["greeting"], json!("hello there"));
        assert_eq!(value["answer"], json!(42));
        assert_eq!(value["broken"], Value::Null);
    }

    #[test]
    fn test_out_of_range_faker_bounds() {
        let fields = vec![
            number("n").with_annotation("faker.number.int({ min: 9223372036854775807 })"),
            number("f").with_annotation(format!(
                "faker.number.float({{ min: {} }})",
                "9".repeat(400)
            )),
        ];
        let value = synthesizer().synthesize_value(&fields, None);
        assert_eq!(value["n"], json!(i64::MAX));
        assert!(value["f"].is_number());
    }

    #[test]
    fn test_dynamic_eager_uses_body() {
        let fields = vec![string("echo").with_annotation("(body) => body.msg")];
        let body = json!({"msg": "hi"});
        let value = synthesizer().synthesize_value(&fields, Some(&body));
        assert_eq!(value["echo"], json!("hi"));

        let value = synthesizer().synthesize_value(&fields, None);
        assert_eq!(value["echo"], Value::Null);
    }

    #[test]
    fn test_deferred_mode_emits_markers() {
        let fields = vec![
            string("echo").with_annotation("(body) => body.msg"),
            string("first").with_annotation("faker.person.firstName()"),
            number("id").with_annotation("1"),
        ];
        let tree = synthesizer().synthesize(&fields, SynthesisMode::Deferred, None);
        assert!(tree.has_deferred());

        let Synthesized::Object(entries) = tree else {
            panic!("expected object");
        };
        assert_eq!(
            entries[0].1,
            Synthesized::Deferred(DeferredComputation {
                expression: "(body) => body.msg".to_string()
            })
        );
        assert!(matches!(entries[1].1, Synthesized::Deferred(_)));
        assert_eq!(entries[2].1, Synthesized::Value(json!(1)));
    }

    #[test]
    fn test_unannotated_kinds() {
        let fields = vec![
            TypeDescriptor::required(
                "tags",
                TypeKind::Array(Box::new(TypeKind::Primitive(PrimitiveKind::String))),
            ),
            TypeDescriptor::required("address", TypeKind::Reference("Address".to_string())),
            TypeDescriptor::required("meta", TypeKind::Object),
            string("email"),
        ];
        let value = synthesizer().synthesize_value(&fields, None);
        assert_eq!(value["tags"], json!(["lorem"]));
        assert_eq!(value["address"], json!({}));
        assert_eq!(value["meta"], json!({}));
        assert_eq!(value["email"], json!("john.doe@example.com"));
    }
}
