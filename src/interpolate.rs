//! Parameter interpolation into response bodies.
//!
//! String leaves are matched, in order, against a whole-body placeholder
//! (`{{body}}`), a single typed placeholder (`{{body.a.b}}`, `{{query.x}}`),
//! and finally a text pass that replaces every `:param`, `{{body.*}}` and
//! `{{query.*}}` token with its string form. Unresolved tokens stay verbatim.
//!
//! Plain JSON values cannot contain cycles. Bodies assembled from shared
//! references ([`Node`]) can, so the graph walk tracks the references on the
//! current path and replaces a revisited one with [`CIRCULAR_SENTINEL`].
//! [`Node`] and [`Interpolator::interpolate_graph`] are the entry points for
//! hosts that build bodies from shared references; the engine itself works on
//! plain JSON.

use crate::context::{loose_string, RequestContext};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Replacement for a reference that is already on the current path.
pub const CIRCULAR_SENTINEL: &str = "[Circular]";

/// A response body node that may share (and cycle through) containers.
#[derive(Debug, Clone)]
pub enum Node {
    /// Plain JSON, interpolated without cycle tracking
    Value(Value),
    Array(Rc<RefCell<Vec<Node>>>),
    Object(Rc<RefCell<Vec<(String, Node)>>>),
}

impl Node {
    pub fn array(items: Vec<Node>) -> Self {
        Node::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(fields: Vec<(String, Node)>) -> Self {
        Node::Object(Rc::new(RefCell::new(fields)))
    }

    /// Identity of the shared container, if this node is one.
    fn identity(&self) -> Option<usize> {
        match self {
            Node::Value(_) => None,
            Node::Array(items) => Some(Rc::as_ptr(items) as *const () as usize),
            Node::Object(fields) => Some(Rc::as_ptr(fields) as *const () as usize),
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::Value(value)
    }
}

/// Substitutes request values into response bodies.
pub struct Interpolator {
    single: Regex,
    token: Regex,
}

impl Interpolator {
    pub fn new() -> Self {
        Self {
            single: Regex::new(r"^\{\{\s*(body|query)\.([^{}\s]+)\s*\}\}$").expect("static regex"),
            token: Regex::new(r"\{\{\s*(body|query)\.([^{}\s]+)\s*\}\}|:([A-Za-z_][A-Za-z0-9_]*)")
                .expect("static regex"),
        }
    }

    /// Interpolate a plain JSON body.
    pub fn interpolate(&self, value: &Value, ctx: &RequestContext) -> Value {
        match value {
            Value::String(s) => self.interpolate_str(s, ctx),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.interpolate(item, ctx))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.interpolate(v, ctx)))
                    .collect::<Map<_, _>>(),
            ),
            other => other.clone(),
        }
    }

    /// Interpolate a possibly cyclic body graph into plain JSON.
    pub fn interpolate_graph(&self, node: &Node, ctx: &RequestContext) -> Value {
        let mut on_path = HashSet::new();
        self.walk(node, ctx, &mut on_path)
    }

    fn walk(&self, node: &Node, ctx: &RequestContext, on_path: &mut HashSet<usize>) -> Value {
        let Some(id) = node.identity() else {
            return match node {
                Node::Value(value) => self.interpolate(value, ctx),
                _ => Value::Null,
            };
        };

        if !on_path.insert(id) {
            return Value::String(CIRCULAR_SENTINEL.to_string());
        }

        let result = match node {
            Node::Array(items) => Value::Array(
                items
                    .borrow()
                    .iter()
                    .map(|item| self.walk(item, ctx, on_path))
                    .collect(),
            ),
            Node::Object(fields) => Value::Object(
                fields
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), self.walk(v, ctx, on_path)))
                    .collect::<Map<_, _>>(),
            ),
            Node::Value(_) => Value::Null,
        };

        on_path.remove(&id);
        result
    }

    fn interpolate_str(&self, s: &str, ctx: &RequestContext) -> Value {
        if s.trim() == "{{body}}" {
            return ctx.body.clone();
        }

        if let Some(caps) = self.single.captures(s) {
            return match resolve(ctx, &caps[1], &caps[2]) {
                Some(value) => value.clone(),
                None => Value::String(s.to_string()),
            };
        }

        if !s.contains("{{") && !s.contains(':') {
            return Value::String(s.to_string());
        }

        let replaced = self.token.replace_all(s, |caps: &Captures| {
            let resolved = match caps.get(3) {
                Some(param) => ctx.params.get(param.as_str()).cloned(),
                None => resolve(ctx, &caps[1], &caps[2]).map(loose_string),
            };
            resolved.unwrap_or_else(|| caps[0].to_string())
        });

        Value::String(replaced.into_owned())
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve<'a>(ctx: &'a RequestContext, source: &str, path: &str) -> Option<&'a Value> {
    match source {
        "body" => ctx.body_field(path),
        _ => ctx.query_field(path),
    }
}
