//! Listing value type and raw-record validation.
//!
//! External collaborators hand back loosely-shaped JSON records
//! (`{name, description, price, url}`); everything past the dispatcher works
//! with validated [`Listing`] values only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fingerprint::Fingerprint;

/// A marketplace listing. Equality is structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub url: String,
}

impl Listing {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: f64,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
            url: url.into(),
        }
    }

    /// Validate a raw listing record.
    ///
    /// `name` must be a non-empty string and `price` a finite, non-negative
    /// number (numeric strings such as `"1,250,000원"` are accepted).
    /// `description` and `url` default to empty. Returns `None` for anything else.
    pub fn from_record(record: &Value) -> Option<Self> {
        let obj = record.as_object()?;

        let name = obj.get("name")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }

        let price = parse_price(obj.get("price")?)?;

        let text_field = |key: &str| -> Option<String> {
            match obj.get(key) {
                None | Some(Value::Null) => Some(String::new()),
                Some(Value::String(s)) => Some(s.clone()),
                Some(_) => None,
            }
        };

        Some(Self {
            name: name.to_string(),
            description: text_field("description")?,
            price,
            url: text_field("url")?,
        })
    }

    /// Serialize back to the wire shape.
    pub fn to_record(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "price": self.price,
            "url": self.url,
        })
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

/// Parse a sequence of raw records, dropping malformed ones individually.
///
/// A single object is treated as a one-element sequence; any other shape
/// yields an empty result.
pub fn parse_records(raw: &Value) -> Vec<Listing> {
    match raw {
        Value::Array(items) => items.iter().filter_map(Listing::from_record).collect(),
        Value::Object(_) => Listing::from_record(raw).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Extract a price from a JSON number or a formatted price string.
pub fn parse_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if digits.is_empty() {
                return None;
            }
            digits.parse::<f64>().ok()?
        }
        _ => return None,
    };

    (price.is_finite() && price >= 0.0).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_record_parses() {
        let listing = Listing::from_record(&json!({
            "name": "iPad Air 5",
            "description": "Like new",
            "price": 550000,
            "url": "https://market.example/1"
        }))
        .unwrap();
        assert_eq!(listing.name, "iPad Air 5");
        assert_eq!(listing.price, 550000.0);
        assert_eq!(listing.url, "https://market.example/1");
    }

    #[test]
    fn optional_text_fields_default_to_empty() {
        let listing = Listing::from_record(&json!({"name": "X", "price": 100})).unwrap();
        assert!(listing.description.is_empty());
        assert!(listing.url.is_empty());
    }

    #[test]
    fn formatted_price_string_is_accepted() {
        let listing = Listing::from_record(&json!({"name": "X", "price": "1,250,000원"})).unwrap();
        assert_eq!(listing.price, 1_250_000.0);
    }

    #[test]
    fn malformed_records_are_rejected() {
        assert!(Listing::from_record(&json!({"price": 100})).is_none());
        assert!(Listing::from_record(&json!({"name": "", "price": 100})).is_none());
        assert!(Listing::from_record(&json!({"name": "X"})).is_none());
        assert!(Listing::from_record(&json!({"name": "X", "price": -5})).is_none());
        assert!(Listing::from_record(&json!({"name": "X", "price": "free"})).is_none());
        assert!(Listing::from_record(&json!({"name": "X", "price": 1, "url": 7})).is_none());
        assert!(Listing::from_record(&json!("X")).is_none());
    }

    #[test]
    fn parse_records_drops_only_bad_entries() {
        let raw = json!([
            {"name": "A", "price": 1},
            {"name": "B"},
            42,
            {"name": "C", "price": 3}
        ]);
        let parsed = parse_records(&raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "A");
        assert_eq!(parsed[1].name, "C");
    }

    #[test]
    fn parse_records_accepts_single_object() {
        assert_eq!(parse_records(&json!({"name": "A", "price": 1})).len(), 1);
        assert!(parse_records(&json!("nope")).is_empty());
        assert!(parse_records(&Value::Null).is_empty());
    }
}
