//! Randomized values for `faker.<namespace>.<method>(...)` annotations.

use chrono::{Duration, Utc};
use fake::faker::address::en::{CityName, CountryName, StateName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{DomainSuffix, SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word, Words};
use fake::faker::name::en::{FirstName, LastName, Name, Title};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// A parsed randomized-value call.
#[derive(Debug, Clone, PartialEq)]
pub struct FakerCall {
    pub namespace: String,
    pub method: String,
    /// Numeric `{ min, max }` bounds when the call passes them
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FakerCall {
    pub fn parse(text: &str) -> Option<Self> {
        static CALL: OnceLock<Regex> = OnceLock::new();
        let call = CALL.get_or_init(|| {
            Regex::new(r"(?s)^faker\.([A-Za-z_]\w*)\.([A-Za-z_]\w*)\s*\((.*)\)$")
                .expect("static regex")
        });
        let caps = call.captures(text.trim())?;
        let args = caps.get(3).map(|m| m.as_str()).unwrap_or("");

        Some(Self {
            namespace: caps[1].to_string(),
            method: caps[2].to_string(),
            min: numeric_arg(args, "min"),
            max: numeric_arg(args, "max"),
        })
    }

    /// Category key in `namespace.method` form.
    pub fn category(&self) -> String {
        format!("{}.{}", self.namespace, self.method)
    }
}

fn numeric_arg(args: &str, key: &str) -> Option<f64> {
    let pattern = format!(r#"["']?{}["']?\s*:\s*(-?\d+(?:\.\d+)?)"#, key);
    Regex::new(&pattern)
        .ok()?
        .captures(args)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Draw a fresh value for a randomized annotation.
///
/// Unknown categories yield a random lorem word.
pub fn generate(text: &str) -> Value {
    match FakerCall::parse(text) {
        Some(call) => generate_call(&call),
        None => json!(Word().fake::<String>()),
    }
}

pub fn generate_call(call: &FakerCall) -> Value {
    let mut rng = rand::thread_rng();

    match (call.namespace.as_str(), call.method.as_str()) {
        ("person" | "name", "firstName") => json!(FirstName().fake::<String>()),
        ("person" | "name", "lastName") => json!(LastName().fake::<String>()),
        ("person" | "name", "fullName" | "findName") => json!(Name().fake::<String>()),
        ("person" | "name", "jobTitle" | "prefix") => json!(Title().fake::<String>()),

        ("internet", "email" | "exampleEmail") => json!(SafeEmail().fake::<String>()),
        ("internet", "userName" | "username" | "displayName") => {
            json!(Username().fake::<String>())
        }
        ("internet", "url") => json!(format!(
            "https://{}.{}",
            Word().fake::<String>(),
            DomainSuffix().fake::<String>()
        )),
        ("internet", "domainName") => json!(format!(
            "{}.{}",
            Word().fake::<String>(),
            DomainSuffix().fake::<String>()
        )),
        ("image", "avatar" | "url") => json!(format!(
            "https://i.pravatar.cc/150?img={}",
            rng.gen_range(1..=70)
        )),

        ("location" | "address", "city") => json!(CityName().fake::<String>()),
        ("location" | "address", "country") => json!(CountryName().fake::<String>()),
        ("location" | "address", "state") => json!(StateName().fake::<String>()),
        ("location" | "address", "street" | "streetAddress") => json!(format!(
            "{} {}",
            rng.gen_range(1..=9999),
            StreetName().fake::<String>()
        )),
        ("location" | "address", "zipCode") => json!(ZipCode().fake::<String>()),

        ("phone", "number" | "phoneNumber") => json!(PhoneNumber().fake::<String>()),

        ("company", "name" | "companyName") => json!(CompanyName().fake::<String>()),

        ("lorem", "word") => json!(Word().fake::<String>()),
        ("lorem", "words") => json!(Words(2..5).fake::<Vec<String>>().join(" ")),
        ("lorem", "sentence") => json!(Sentence(3..10).fake::<String>()),
        ("lorem", "paragraph") => json!(Paragraph(2..4).fake::<String>()),

        ("string" | "datatype", "uuid") => json!(random_uuid()),

        ("number" | "datatype", "int" | "number") => {
            let min = call.min.unwrap_or(0.0) as i64;
            let max = call
                .max
                .map(|m| m as i64)
                .unwrap_or(min.max(0).saturating_add(1000));
            json!(rng.gen_range(min..=max.max(min)))
        }
        ("number" | "datatype", "float") => {
            let min = call.min.unwrap_or(0.0);
            let max = call.max.unwrap_or(min + 1000.0);
            let value = float_between(&mut rng, min, max);
            let rounded = (value * 100.0).round() / 100.0;
            json!(if rounded.is_finite() { rounded } else { value })
        }
        ("commerce", "price") => {
            let min = call.min.unwrap_or(1.0);
            let max = call.max.unwrap_or(1000.0);
            json!(format!("{:.2}", float_between(&mut rng, min, max)))
        }
        ("commerce", "productName") => json!(format!(
            "{} {}",
            Word().fake::<String>(),
            Word().fake::<String>()
        )),

        ("datatype", "boolean") => json!(rng.gen_bool(0.5)),

        ("date", "past") => {
            let days = rng.gen_range(1..=365);
            json!((Utc::now() - Duration::days(days)).to_rfc3339())
        }
        ("date", "future") => {
            let days = rng.gen_range(1..=365);
            json!((Utc::now() + Duration::days(days)).to_rfc3339())
        }
        ("date", "recent") => {
            let minutes = rng.gen_range(1..=60 * 24);
            json!((Utc::now() - Duration::minutes(minutes)).to_rfc3339())
        }

        _ => json!(Word().fake::<String>()),
    }
}

/// Uniform draw from `min..=max`; degenerate or overflowing spans yield `min`.
fn float_between(rng: &mut impl Rng, min: f64, max: f64) -> f64 {
    let max = max.max(min);
    if !(max - min).is_finite() || max == min {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Version 4 UUID string.
pub fn random_uuid() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        rng.gen::<u32>(),
        rng.gen::<u16>(),
        rng.gen::<u16>() & 0x0fff,
        (rng.gen::<u16>() & 0x3fff) | 0x8000,
        rng.gen::<u64>() & 0xffffffffffff,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call() {
        let call = FakerCall::parse("faker.number.int({ min: 5, max: 10 })").unwrap();
        assert_eq!(call.category(), "number.int");
        assert_eq!(call.min, Some(5.0));
        assert_eq!(call.max, Some(10.0));

        let call = FakerCall::parse("faker.person.firstName()").unwrap();
        assert_eq!(call.category(), "person.firstName");
        assert_eq!(call.min, None);

        assert!(FakerCall::parse("person.firstName()").is_none());
    }

    #[test]
    fn test_bounded_int() {
        for _ in 0..50 {
            let value = generate("faker.number.int({ min: 5, max: 10 })");
            assert!((5..=10).contains(&value.as_i64().unwrap()));
        }
    }

    #[test]
    fn test_extreme_bounds() {
        let value = generate("faker.number.int({ min: 9223372036854775807 })");
        assert_eq!(value.as_i64(), Some(i64::MAX));

        let value = generate("faker.number.int({ min: 50, max: 10 })");
        assert_eq!(value.as_i64(), Some(50));

        let huge = format!("faker.number.float({{ min: {} }})", "9".repeat(400));
        assert_eq!(FakerCall::parse(&huge).unwrap().min, None);
        assert!(generate(&huge).is_number());

        let wide = format!(
            "faker.number.float({{ min: -1{zeros}, max: 1{zeros} }})",
            zeros = "0".repeat(308)
        );
        assert!(generate(&wide).is_number());
        assert!(generate("faker.commerce.price({ min: 5, max: 1 })").is_string());
    }

    #[test]
    fn test_string_categories() {
        assert!(generate("faker.person.firstName()").is_string());
        assert!(generate("faker.internet.email()")
            .as_str()
            .unwrap()
            .contains('@'));
        assert!(generate("faker.datatype.boolean()").is_boolean());
        assert!(generate("faker.unknown.thing()").is_string());
    }

    #[test]
    fn test_uuid_format() {
        let uuid = random_uuid();
        assert_eq!(uuid.len(), 36);
        assert_eq!(uuid.chars().nth(14), Some('4'));
    }
}
