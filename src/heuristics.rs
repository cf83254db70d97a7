//! Plausible default values for fields without a mock annotation.
//!
//! String fields map to a representative literal chosen by the first matching
//! name category. Number fields draw from a category-specific range; booleans
//! are a coin flip.

use crate::descriptor::PrimitiveKind;
use rand::Rng;
use serde_json::{json, Value};

/// Semantic category inferred from a field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCategory {
    Identifier,
    Email,
    PersonName,
    Url,
    Timestamp,
    Phone,
    Currency,
    Count,
    Generic,
}

/// Ordered table: the first category whose keyword occurs in the name wins.
const CATEGORY_KEYWORDS: &[(NameCategory, &[&str])] = &[
    (NameCategory::Email, &["email", "mail"]),
    (
        NameCategory::PersonName,
        &["firstname", "lastname", "fullname", "username", "author", "name"],
    ),
    (
        NameCategory::Url,
        &["url", "uri", "link", "href", "website", "avatar", "image"],
    ),
    (
        NameCategory::Timestamp,
        &["date", "time", "created", "updated", "deleted", "expires"],
    ),
    (NameCategory::Phone, &["phone", "mobile", "tel"]),
    (
        NameCategory::Currency,
        &["price", "amount", "cost", "balance", "salary", "fee"],
    ),
    (
        NameCategory::Count,
        &["count", "total", "quantity", "qty", "number", "num"],
    ),
];

/// Classify a field name into a semantic category.
pub fn categorize(name: &str) -> NameCategory {
    let lower = name.to_lowercase();

    if lower == "id"
        || lower == "uuid"
        || lower == "guid"
        || lower.ends_with("_id")
        || lower.ends_with("uuid")
        || name.ends_with("Id")
        || name.ends_with("ID")
    {
        return NameCategory::Identifier;
    }

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(NameCategory::Generic)
}

/// Produce a realistic value for a primitive field.
pub fn realistic_value(name: &str, kind: PrimitiveKind) -> Value {
    match kind {
        PrimitiveKind::String => json!(string_for(categorize(name), name)),
        PrimitiveKind::Number => number_for(categorize(name)),
        PrimitiveKind::Boolean => json!(rand::thread_rng().gen_bool(0.5)),
    }
}

fn string_for(category: NameCategory, name: &str) -> &'static str {
    match category {
        NameCategory::Identifier => "123e4567-e89b-12d3-a456-426614174000",
        NameCategory::Email => "john.doe@example.com",
        NameCategory::PersonName => {
            let lower = name.to_lowercase();
            if lower.contains("first") {
                "John"
            } else if lower.contains("last") {
                "Doe"
            } else if lower.contains("user") {
                "johndoe"
            } else {
                "John Doe"
            }
        }
        NameCategory::Url => "https://example.com",
        NameCategory::Timestamp => "2024-01-15T10:30:00.000Z",
        NameCategory::Phone => "+1-555-123-4567",
        NameCategory::Currency => "99.99",
        NameCategory::Count => "42",
        NameCategory::Generic => "lorem",
    }
}

fn number_for(category: NameCategory) -> Value {
    let mut rng = rand::thread_rng();
    match category {
        NameCategory::Identifier => json!(rng.gen_range(1..=10_000)),
        NameCategory::Count => json!(rng.gen_range(0..=100)),
        NameCategory::Currency => {
            let cents: i64 = rng.gen_range(100..=100_000);
            json!(cents as f64 / 100.0)
        }
        NameCategory::Timestamp => json!(chrono::Utc::now().timestamp_millis()),
        _ => json!(rng.gen_range(1..=1_000)),
    }
}
