//! Per-request context handed to the engine by the transport layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Normalized request data: path params, query values and parsed body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub query: HashMap<String, Value>,
    #[serde(default)]
    pub body: Value,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Resolve a dot path in the body, falling back to the query.
    ///
    /// A body value of `null` counts as absent, so the query is consulted.
    pub fn field(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.body, path)
            .filter(|v| !v.is_null())
            .or_else(|| self.query_field(path))
    }

    /// Resolve a dot path in the query map; the first segment names the parameter.
    pub fn query_field(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = self.query.get(head)?;
        match rest {
            Some(rest) => lookup_path(value, rest),
            None => Some(value),
        }
    }

    /// Resolve a dot path in the body.
    pub fn body_field(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.body, path)
    }
}

/// Walk `path` (`a.b.0.c`) through objects and arrays.
///
/// Missing keys, out-of-range indices, empty segments and traversal into
/// scalars all yield `None`.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |current, segment| {
        if segment.is_empty() {
            return None;
        }
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// String form used for loose comparisons and template substitution.
pub fn loose_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
