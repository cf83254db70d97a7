//! Request guards: pick one of two responses from a predicate over the request.
//!
//! Guard definitions arrive as raw JSON/YAML and are validated once, when the
//! endpoint is prepared. A guard that fails validation is reported and the
//! endpoint serves its default response.

use crate::context::{loose_string, RequestContext};
use crate::faker;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors found while validating a guard definition.
#[derive(Debug, Error, PartialEq)]
pub enum GuardError {
    #[error("guard definition is not an object: {0}")]
    Malformed(String),

    #[error("guard is missing its condition")]
    MissingCondition,

    #[error("guard condition is missing a field path")]
    MissingField,

    #[error("guard condition is missing an operator")]
    MissingOperator,

    #[error("unknown guard operator: {0}")]
    UnknownOperator(String),

    #[error("guard is missing its {0} branch")]
    MissingBranch(&'static str),

    #[error("{0} branch sets both body and interface")]
    ConflictingShape(&'static str),

    #[error("{0} branch has invalid status code {1}")]
    InvalidStatus(&'static str, u16),
}

/// Comparison applied to the resolved request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Exists,
    NotExists,
}

impl FromStr for GuardOperator {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "equals" | "eq" | "==" | "===" => Ok(Self::Equals),
            "notequals" | "ne" | "neq" | "!=" | "!==" => Ok(Self::NotEquals),
            "contains" => Ok(Self::Contains),
            "notcontains" => Ok(Self::NotContains),
            "exists" => Ok(Self::Exists),
            "notexists" => Ok(Self::NotExists),
            _ => Err(GuardError::UnknownOperator(s.to_string())),
        }
    }
}

impl fmt::Display for GuardOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
        };
        f.write_str(name)
    }
}

/// Predicate over one request field.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardCondition {
    /// Dot path looked up in the body, then the query
    pub field: String,
    pub operator: GuardOperator,
    pub value: Option<Value>,
}

impl GuardCondition {
    pub fn new(field: impl Into<String>, operator: GuardOperator, value: Option<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Evaluate against a request. Missing fields never error.
    pub fn evaluate(&self, ctx: &RequestContext) -> bool {
        let resolved = ctx.field(&self.field).filter(|v| !v.is_null());
        let expected = self.value.as_ref().map(loose_string);

        match self.operator {
            GuardOperator::Equals => resolved.map(loose_string) == expected,
            GuardOperator::NotEquals => resolved.map(loose_string) != expected,
            GuardOperator::Contains => match (resolved.and_then(Value::as_str), &expected) {
                (Some(actual), Some(needle)) => actual.contains(needle.as_str()),
                _ => false,
            },
            GuardOperator::NotContains => match (resolved.and_then(Value::as_str), &expected) {
                (Some(actual), Some(needle)) => !actual.contains(needle.as_str()),
                _ => false,
            },
            GuardOperator::Exists => resolved.is_some(),
            GuardOperator::NotExists => resolved.is_none(),
        }
    }
}

/// Body source for a guard branch.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// Inline body; `null` when none was given
    Inline(Value),
    /// Name of an interface synthesized on demand
    Reference(String),
}

/// One candidate response of a guard.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub status: u16,
    pub shape: ResponseShape,
}

impl ResponseSpec {
    pub fn inline(status: u16, body: Value) -> Self {
        Self {
            status,
            shape: ResponseShape::Inline(body),
        }
    }

    pub fn reference(status: u16, interface: impl Into<String>) -> Self {
        Self {
            status,
            shape: ResponseShape::Reference(interface.into()),
        }
    }
}

/// Which branch a guard selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Condition held
    Left,
    /// Condition did not hold
    Right,
}

/// Validated guard attached to an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardSpec {
    pub condition: GuardCondition,
    pub left: ResponseSpec,
    pub right: ResponseSpec,
}

#[derive(Debug, Deserialize)]
struct RawGuard {
    condition: Option<RawCondition>,
    left: Option<RawResponse>,
    right: Option<RawResponse>,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    field: Option<String>,
    operator: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    status: Option<u16>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default, alias = "interfaceRef", alias = "interface_ref")]
    interface: Option<String>,
}

impl RawResponse {
    fn validate(self, side: &'static str) -> Result<ResponseSpec, GuardError> {
        let status = self.status.unwrap_or(200);
        if !(100..=599).contains(&status) {
            return Err(GuardError::InvalidStatus(side, status));
        }

        let shape = match (self.body, self.interface) {
            (Some(_), Some(_)) => return Err(GuardError::ConflictingShape(side)),
            (_, Some(name)) => ResponseShape::Reference(name),
            (body, None) => ResponseShape::Inline(body.unwrap_or(Value::Null)),
        };

        Ok(ResponseSpec { status, shape })
    }
}

impl GuardSpec {
    pub fn new(condition: GuardCondition, left: ResponseSpec, right: ResponseSpec) -> Self {
        Self {
            condition,
            left,
            right,
        }
    }

    /// Validate a raw guard definition.
    pub fn from_definition(definition: &Value) -> Result<Self, GuardError> {
        let raw: RawGuard = serde_json::from_value(definition.clone())
            .map_err(|e| GuardError::Malformed(e.to_string()))?;

        let condition = raw.condition.ok_or(GuardError::MissingCondition)?;
        let field = condition
            .field
            .filter(|f| !f.trim().is_empty())
            .ok_or(GuardError::MissingField)?;
        let operator: GuardOperator = condition
            .operator
            .ok_or(GuardError::MissingOperator)?
            .parse()?;

        let left = raw.left.ok_or(GuardError::MissingBranch("left"))?.validate("left")?;
        let right = raw
            .right
            .ok_or(GuardError::MissingBranch("right"))?
            .validate("right")?;

        Ok(Self {
            condition: GuardCondition {
                field,
                operator,
                value: condition.value,
            },
            left,
            right,
        })
    }

    /// Pick the branch for this request: left when the condition holds.
    pub fn select(&self, ctx: &RequestContext) -> (Branch, &ResponseSpec) {
        if self.condition.evaluate(ctx) {
            (Branch::Left, &self.left)
        } else {
            (Branch::Right, &self.right)
        }
    }
}

/// Generic body used when a branch references an interface that cannot be found.
pub fn fallback_body(reference: &str, status: u16) -> Value {
    if reference.to_lowercase().contains("error") {
        json!({
            "error": reference,
            "message": "An error occurred",
            "code": status,
        })
    } else {
        json!({
            "id": faker::random_uuid(),
            "message": "Success",
            "success": true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_guard() -> GuardSpec {
        GuardSpec::new(
            GuardCondition::new("role", GuardOperator::Equals, Some(json!("admin"))),
            ResponseSpec::inline(200, json!({"access": "granted"})),
            ResponseSpec::reference(403, "ErrorResponse"),
        )
    }

    #[test]
    fn test_select_branches() {
        let guard = role_guard();

        let admin = RequestContext::new().with_body(json!({"role": "admin"}));
        let (branch, spec) = guard.select(&admin);
        assert_eq!(branch, Branch::Left);
        assert_eq!(spec.status, 200);

        let guest = RequestContext::new().with_body(json!({"role": "guest"}));
        let (branch, spec) = guard.select(&guest);
        assert_eq!(branch, Branch::Right);
        assert_eq!(spec.shape, ResponseShape::Reference("ErrorResponse".to_string()));
    }

    #[test]
    fn test_select_is_deterministic() {
        let guard = role_guard();
        let ctx = RequestContext::new().with_body(json!({"role": "admin"}));
        let first = guard.select(&ctx).0;
        for _ in 0..10 {
            assert_eq!(guard.select(&ctx).0, first);
        }
    }

    #[test]
    fn test_loose_equality() {
        let cond = GuardCondition::new("count", GuardOperator::Equals, Some(json!("5")));
        assert!(cond.evaluate(&RequestContext::new().with_body(json!({"count": 5}))));
        assert!(cond.evaluate(&RequestContext::new().with_query("count", "5")));

        let cond = GuardCondition::new("count", GuardOperator::NotEquals, Some(json!(5)));
        assert!(cond.evaluate(&RequestContext::new().with_body(json!({"count": 6}))));
        assert!(cond.evaluate(&RequestContext::new()));
    }

    #[test]
    fn test_contains() {
        let ctx = RequestContext::new().with_body(json!({"email": "ada@corp.io", "n": 12}));

        let cond = GuardCondition::new("email", GuardOperator::Contains, Some(json!("@corp")));
        assert!(cond.evaluate(&ctx));

        let cond = GuardCondition::new("email", GuardOperator::NotContains, Some(json!("@corp")));
        assert!(!cond.evaluate(&ctx));

        // non-strings never satisfy either containment operator
        let cond = GuardCondition::new("n", GuardOperator::Contains, Some(json!("1")));
        assert!(!cond.evaluate(&ctx));
        let cond = GuardCondition::new("n", GuardOperator::NotContains, Some(json!("9")));
        assert!(!cond.evaluate(&ctx));
    }

    #[test]
    fn test_exists() {
        let ctx = RequestContext::new().with_body(json!({"user": {"token": "t", "gone": null}}));

        assert!(GuardCondition::new("user.token", GuardOperator::Exists, None).evaluate(&ctx));
        assert!(GuardCondition::new("user.gone", GuardOperator::NotExists, None).evaluate(&ctx));
        assert!(GuardCondition::new("user.a.b.c", GuardOperator::NotExists, None).evaluate(&ctx));
    }

    #[test]
    fn test_from_definition() {
        let definition = json!({
            "condition": {"field": "role", "operator": "equals", "value": "admin"},
            "left": {"status": 200, "body": {"ok": true}},
            "right": {"status": 403, "interfaceRef": "ErrorResponse"}
        });
        let guard = GuardSpec::from_definition(&definition).unwrap();
        assert_eq!(guard.condition.operator, GuardOperator::Equals);
        assert_eq!(guard.left, ResponseSpec::inline(200, json!({"ok": true})));
        assert_eq!(guard.right, ResponseSpec::reference(403, "ErrorResponse"));
    }

    #[test]
    fn test_inline_body_defaults_to_null() {
        let definition = json!({
            "condition": {"field": "x", "operator": "exists"},
            "left": {"status": 204},
            "right": {}
        });
        let guard = GuardSpec::from_definition(&definition).unwrap();
        assert_eq!(guard.left, ResponseSpec::inline(204, Value::Null));
        assert_eq!(guard.right, ResponseSpec::inline(200, Value::Null));
    }

    #[test]
    fn test_invalid_definitions() {
        let no_condition = json!({"left": {}, "right": {}});
        assert_eq!(
            GuardSpec::from_definition(&no_condition),
            Err(GuardError::MissingCondition)
        );

        let bad_operator = json!({
            "condition": {"field": "x", "operator": "matches"},
            "left": {}, "right": {}
        });
        assert_eq!(
            GuardSpec::from_definition(&bad_operator),
            Err(GuardError::UnknownOperator("matches".to_string()))
        );

        let no_right = json!({
            "condition": {"field": "x", "operator": "exists"},
            "left": {}
        });
        assert_eq!(
            GuardSpec::from_definition(&no_right),
            Err(GuardError::MissingBranch("right"))
        );

        assert!(matches!(
            GuardSpec::from_definition(&json!("nope")),
            Err(GuardError::Malformed(_))
        ));
    }

    #[test]
    fn test_operator_aliases() {
        assert_eq!("not_equals".parse::<GuardOperator>(), Ok(GuardOperator::NotEquals));
        assert_eq!("notContains".parse::<GuardOperator>(), Ok(GuardOperator::NotContains));
        assert_eq!("==".parse::<GuardOperator>(), Ok(GuardOperator::Equals));
    }

    #[test]
    fn test_fallback_shapes() {
        let error = fallback_body("ErrorResponse", 404);
        assert_eq!(error["code"], json!(404));
        assert!(error.get("message").is_some());

        let success = fallback_body("CreatedUser", 201);
        assert_eq!(success["success"], json!(true));
        assert!(success.get("id").is_some());
    }
}
