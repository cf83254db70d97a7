//! Endpoint lookup.
//!
//! Matches a method and path against prepared endpoints and captures `:name`
//! path parameters and query values into a [`RequestContext`].

use crate::context::RequestContext;
use crate::engine::Endpoint;
use serde_json::Value;
use std::collections::HashMap;

/// Result of matching a request against endpoints.
#[derive(Debug)]
pub struct MatchResult<'a> {
    /// The matched endpoint
    pub endpoint: &'a Endpoint,
    /// Params and query captured during matching; the body is left empty
    pub context: RequestContext,
}

/// Request matcher engine.
pub struct Matcher {
    templates: Vec<PathTemplate>,
}

#[derive(Debug)]
struct PathTemplate {
    segments: Vec<TemplateSegment>,
}

#[derive(Debug)]
enum TemplateSegment {
    Literal(String),
    Param(String),
}

impl PathTemplate {
    fn parse(template: &str) -> Self {
        let segments = split_path(template)
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => TemplateSegment::Param(name.to_string()),
                _ => TemplateSegment::Literal(segment.to_string()),
            })
            .collect();

        Self { segments }
    }

    fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                TemplateSegment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                TemplateSegment::Param(name) => {
                    params.insert(name.clone(), decode(part));
                }
            }
        }

        Some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl Matcher {
    /// Create a new matcher for the given endpoints.
    pub fn new(endpoints: &[Endpoint]) -> Self {
        let templates = endpoints
            .iter()
            .map(|endpoint| PathTemplate::parse(&endpoint.path))
            .collect();

        Self { templates }
    }

    /// Find the first endpoint matching a request line.
    ///
    /// Literal-only templates win over templates with parameters.
    pub fn find_match<'a>(
        &self,
        endpoints: &'a [Endpoint],
        method: &str,
        path: &str,
        query_string: Option<&str>,
    ) -> Option<MatchResult<'a>> {
        let method_upper = method.to_uppercase();

        let mut candidates: Vec<_> = endpoints
            .iter()
            .zip(&self.templates)
            .filter(|(endpoint, _)| endpoint.method.to_uppercase() == method_upper)
            .filter_map(|(endpoint, template)| {
                template.matches(path).map(|params| (endpoint, params))
            })
            .collect();

        candidates.sort_by_key(|(_, params)| params.len());
        let (endpoint, params) = candidates.into_iter().next()?;

        let context = RequestContext {
            params,
            query: parse_query_string(query_string.unwrap_or("")),
            body: Value::Null,
        };

        Some(MatchResult { endpoint, context })
    }
}

/// Parse a query string; repeated keys collect into an array.
pub fn parse_query_string(query: &str) -> HashMap<String, Value> {
    let mut params: HashMap<String, Value> = HashMap::new();

    for part in query.split('&') {
        if part.is_empty() {
            continue;
        }
        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        let key = decode(key);
        let value = Value::String(decode(value));

        match params.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                params.insert(key, value);
            }
        }
    }

    params
}

fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    urlencoding::decode(&s)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(s)
}

/// Split `"/path?query"` into its path and optional query string.
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}
