//! Structural type descriptors and the interface source parser.
//!
//! Interfaces are written as TypeScript-style declarations. Each field may
//! carry a `@mock` tag in its preceding doc comment; the text after the tag is
//! kept verbatim as the field's annotation.

use regex::Regex;
use std::sync::OnceLock;

/// Primitive kinds recognized by the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
}

/// Structural kind of a declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    /// Array of the boxed element kind
    Array(Box<TypeKind>),
    /// Inline object literal type
    Object,
    /// Named reference to another interface
    Reference(String),
}

/// Description of one declared interface field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    pub optional: bool,
    /// Raw `@mock` text, if any
    pub annotation: Option<String>,
}

impl TypeDescriptor {
    /// A required field with no annotation.
    pub fn required(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            annotation: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Descriptor used to synthesize one element of an array field.
    pub fn element(&self) -> Option<TypeDescriptor> {
        match &self.kind {
            TypeKind::Array(inner) => Some(TypeDescriptor {
                name: self.name.clone(),
                kind: (**inner).clone(),
                optional: false,
                annotation: None,
            }),
            _ => None,
        }
    }
}

/// A parsed interface declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub fields: Vec<TypeDescriptor>,
}

impl Interface {
    pub fn field(&self, name: &str) -> Option<&TypeDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Parse every `interface Name { ... }` declaration in a source file.
///
/// Unparseable member lines (methods, index signatures) are skipped.
pub fn parse_interfaces(source: &str) -> Vec<Interface> {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    let header = HEADER.get_or_init(|| {
        Regex::new(r"interface\s+([A-Za-z_$][\w$]*)(?:\s*<[^>{]*>)?(?:\s+extends\s+[^{]+)?\s*\{")
            .expect("static regex")
    });
    let mut interfaces = Vec::new();
    let mut search_from = 0;

    while let Some(caps) = header.captures(&source[search_from..]) {
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let name = caps[1].to_string();
        let body_start = search_from + whole;

        let Some(body_end) = matching_brace(source, body_start) else {
            break;
        };

        interfaces.push(Interface {
            name,
            fields: parse_members(&source[body_start..body_end]),
        });
        search_from = body_end + 1;
    }

    interfaces
}

/// Find the index of the `}` closing a block whose `{` ends right before `start`.
fn matching_brace(source: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, ch) in source[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_members(body: &str) -> Vec<TypeDescriptor> {
    let mut fields = Vec::new();
    let mut pending_doc: Option<String> = None;
    let mut rest = body;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ';' || c == ',');
        if rest.is_empty() {
            break;
        }

        if let Some(after) = rest.strip_prefix("/*") {
            let end = after.find("*/").unwrap_or(after.len());
            pending_doc = Some(after[..end].to_string());
            rest = after.get(end + 2..).unwrap_or("");
            continue;
        }

        if rest.starts_with("//") {
            let end = rest.find('\n').unwrap_or(rest.len());
            rest = &rest[end..];
            continue;
        }

        let end = member_end(rest);
        let member = &rest[..end];
        rest = &rest[end..];

        if let Some(mut field) = parse_member(member) {
            field.annotation = pending_doc.take().and_then(|doc| mock_tag(&doc));
            fields.push(field);
        } else {
            pending_doc = None;
        }
    }

    fields
}

/// Length of the member declaration at the start of `rest`, honoring nested braces.
fn member_end(rest: &str) -> usize {
    let mut depth = 0i32;
    for (i, ch) in rest.char_indices() {
        match ch {
            '{' | '(' | '<' | '[' => depth += 1,
            '}' | ')' | '>' | ']' => depth -= 1,
            ';' | ',' if depth <= 0 => return i,
            '\n' if depth <= 0 && !continues_on_next_line(&rest[..i], &rest[i..]) => return i,
            _ => {}
        }
    }
    rest.len()
}

/// A member spans lines while its type is still open: a dangling `:` or `|`,
/// or a following line that starts with `|`.
fn continues_on_next_line(before: &str, after: &str) -> bool {
    let before = before.trim_end();
    before.ends_with(':') || before.ends_with('|') || after.trim_start().starts_with('|')
}

fn parse_member(member: &str) -> Option<TypeDescriptor> {
    let member = member.trim().trim_start_matches("readonly ").trim_start();
    let (name_part, type_part) = member.split_once(':')?;
    let name_part = name_part.trim();
    let (name, optional) = match name_part.strip_suffix('?') {
        Some(name) => (name.trim(), true),
        None => (name_part, false),
    };
    let name = name.trim_matches(|c| c == '"' || c == '\'');

    if name.is_empty()
        || name.contains('(')
        || name.starts_with('[')
        || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '-')
    {
        return None;
    }

    Some(TypeDescriptor {
        name: name.to_string(),
        kind: parse_kind(type_part.trim()),
        optional,
        annotation: None,
    })
}

fn parse_kind(ty: &str) -> TypeKind {
    let ty = ty.trim();

    if ty.starts_with('{') {
        return TypeKind::Object;
    }
    if let Some(inner) = ty.strip_suffix("[]") {
        return TypeKind::Array(Box::new(parse_kind(inner.trim_matches(|c| c == '(' || c == ')'))));
    }
    if let Some(inner) = ty.strip_prefix("Array<").and_then(|t| t.strip_suffix('>')) {
        return TypeKind::Array(Box::new(parse_kind(inner)));
    }

    if ty.contains('|') {
        let first = ty
            .split('|')
            .map(str::trim)
            .find(|t| *t != "null" && *t != "undefined" && !t.is_empty())
            .unwrap_or("string");
        return union_member_kind(first);
    }

    match ty {
        "string" => TypeKind::Primitive(PrimitiveKind::String),
        "number" | "bigint" => TypeKind::Primitive(PrimitiveKind::Number),
        "boolean" => TypeKind::Primitive(PrimitiveKind::Boolean),
        "Date" => TypeKind::Primitive(PrimitiveKind::String),
        "object" | "any" | "unknown" => TypeKind::Object,
        other if other.starts_with("Record<") => TypeKind::Object,
        other => TypeKind::Reference(other.to_string()),
    }
}

fn union_member_kind(member: &str) -> TypeKind {
    if member.starts_with('\'') || member.starts_with('"') || member.starts_with('`') {
        TypeKind::Primitive(PrimitiveKind::String)
    } else if member.parse::<f64>().is_ok() {
        TypeKind::Primitive(PrimitiveKind::Number)
    } else if member == "true" || member == "false" {
        TypeKind::Primitive(PrimitiveKind::Boolean)
    } else {
        parse_kind(member)
    }
}

/// Extract the text following `@mock` from a doc comment body.
fn mock_tag(doc: &str) -> Option<String> {
    let cleaned: Vec<&str> = doc
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .collect();

    let start = cleaned.iter().position(|line| line.starts_with("@mock"))?;
    let mut text = cleaned[start].trim_start_matches("@mock").trim().to_string();

    for line in &cleaned[start + 1..] {
        if line.starts_with('@') {
            break;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(line);
    }

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = r#"
export interface User {
  /** @mock 123 */
  id: number;
  /**
   * Display name.
   * @mock (body) => body.name
   */
  name: string;
  nickname?: string;
  tags: string[];
  address: Address;
  meta: { source: string; weight: number };
  role: 'admin' | 'guest';
}

interface Address {
  city: string;
}
"#;

    #[test]
    fn test_parse_fields() {
        let interfaces = parse_interfaces(USER);
        assert_eq!(interfaces.len(), 2);

        let user = &interfaces[0];
        assert_eq!(user.name, "User");
        let names: Vec<_> = user.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "name", "nickname", "tags", "address", "meta", "role"]
        );
        assert_eq!(interfaces[1].name, "Address");
    }

    #[test]
    fn test_parse_annotations() {
        let interfaces = parse_interfaces(USER);
        let user = &interfaces[0];
        assert_eq!(user.field("id").unwrap().annotation.as_deref(), Some("123"));
        assert_eq!(
            user.field("name").unwrap().annotation.as_deref(),
            Some("(body) => body.name")
        );
        assert_eq!(user.field("tags").unwrap().annotation, None);
    }

    #[test]
    fn test_parse_kinds() {
        let interfaces = parse_interfaces(USER);
        let user = &interfaces[0];
        assert_eq!(
            user.field("id").unwrap().kind,
            TypeKind::Primitive(PrimitiveKind::Number)
        );
        assert!(user.field("nickname").unwrap().optional);
        assert_eq!(
            user.field("tags").unwrap().kind,
            TypeKind::Array(Box::new(TypeKind::Primitive(PrimitiveKind::String)))
        );
        assert_eq!(
            user.field("address").unwrap().kind,
            TypeKind::Reference("Address".to_string())
        );
        assert_eq!(user.field("meta").unwrap().kind, TypeKind::Object);
        assert_eq!(
            user.field("role").unwrap().kind,
            TypeKind::Primitive(PrimitiveKind::String)
        );
    }

    #[test]
    fn test_parse_multiline_union() {
        let source = "interface U {\n  role:\n    | 'admin'\n    | 'guest';\n  level: 1 |\n    2;\n  id: number;\n}";
        let interfaces = parse_interfaces(source);
        let u = &interfaces[0];
        let names: Vec<_> = u.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["role", "level", "id"]);
        assert_eq!(
            u.field("role").unwrap().kind,
            TypeKind::Primitive(PrimitiveKind::String)
        );
        assert_eq!(
            u.field("level").unwrap().kind,
            TypeKind::Primitive(PrimitiveKind::Number)
        );
        assert_eq!(
            u.field("id").unwrap().kind,
            TypeKind::Primitive(PrimitiveKind::Number)
        );
    }

    #[test]
    fn test_element_descriptor() {
        let tags = TypeDescriptor::required(
            "tags",
            TypeKind::Array(Box::new(TypeKind::Primitive(PrimitiveKind::String))),
        );
        let element = tags.element().unwrap();
        assert_eq!(element.name, "tags");
        assert_eq!(element.kind, TypeKind::Primitive(PrimitiveKind::String));

        let id = TypeDescriptor::required("id", TypeKind::Primitive(PrimitiveKind::Number));
        assert!(id.element().is_none());
    }
}
