use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use super::price::sanitize_price;

/// Identity key of a wishlist entry.
///
/// Producers disagree on the representation: locally cached entries and
/// listing endpoints may carry numbers while other surfaces hand out strings.
/// Both shapes are kept as they arrive; see [`IdEquality`] for how they are
/// compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
}

impl ItemId {
    /// Reads an id out of an untyped JSON value.
    ///
    /// Integral floats (`101.0`) collapse to the numeric form. Null, booleans,
    /// fractional numbers, integers outside the `i64` range and containers
    /// are not ids.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Some(Self::Number(i));
                }
                let f = n.as_f64()?;
                if f.is_finite()
                    && f.fract() == 0.0
                    && f >= i64::MIN as f64
                    && f < i64::MAX as f64
                {
                    Some(Self::Number(f as i64))
                } else {
                    None
                }
            }
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn canonical_key(&self) -> Cow<'_, str> {
        match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "string",
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Integers become numeric ids, everything else a text id.
impl FromStr for ItemId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Text(s.to_string()),
        })
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ItemId {
    fn from(value: i32) -> Self {
        Self::Number(value as i64)
    }
}

impl From<u32> for ItemId {
    fn from(value: u32) -> Self {
        Self::Number(value as i64)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// How two ids are compared for membership and deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdEquality {
    /// Same representation and same value: `5` and `"5"` are different ids.
    #[default]
    Strict,
    /// Compare the canonical string form: `5` and `"5"` are the same id.
    Canonical,
}

impl IdEquality {
    pub fn matches(self, a: &ItemId, b: &ItemId) -> bool {
        match self {
            Self::Strict => a == b,
            Self::Canonical => a.canonical_key() == b.canonical_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WishlistItem {
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            price,
            image: None,
            description: None,
        }
    }

    /// An entry whose id was never resolved. `add` ignores these.
    pub fn without_id(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            image: None,
            description: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn has_id(&self, id: &ItemId, equality: IdEquality) -> bool {
        self.id
            .as_ref()
            .is_some_and(|own| equality.matches(own, id))
    }

    /// Clamps the price into the accepted range.
    pub(crate) fn sanitized(mut self) -> Self {
        self.price = sanitize_price(self.price);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_from_json() {
        assert_eq!(ItemId::from_json(&json!(101)), Some(ItemId::Number(101)));
        assert_eq!(ItemId::from_json(&json!(101.0)), Some(ItemId::Number(101)));
        assert_eq!(ItemId::from_json(&json!("202")), Some(ItemId::Text("202".into())));
        assert_eq!(ItemId::from_json(&json!(1.5)), None);
        assert_eq!(ItemId::from_json(&json!(null)), None);
        assert_eq!(ItemId::from_json(&json!(true)), None);
        assert_eq!(ItemId::from_json(&json!({"id": 1})), None);
    }

    #[test]
    fn test_out_of_range_numbers_are_not_ids() {
        let two_pow_63 = 2f64.powi(63);
        assert_eq!(ItemId::from_json(&json!(two_pow_63)), None);
        assert_eq!(ItemId::from_json(&json!(u64::MAX)), None);
        assert_eq!(
            ItemId::from_json(&json!(-two_pow_63)),
            Some(ItemId::Number(i64::MIN))
        );
    }

    #[test]
    fn test_strict_equality_keeps_types_apart() {
        let number = ItemId::from(5);
        let text = ItemId::from("5");
        assert!(IdEquality::Strict.matches(&number, &number.clone()));
        assert!(!IdEquality::Strict.matches(&number, &text));
        assert!(IdEquality::Canonical.matches(&number, &text));
        assert!(!IdEquality::Canonical.matches(&number, &ItemId::from("05")));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("42".parse::<ItemId>().unwrap(), ItemId::Number(42));
        assert_eq!("sku-42".parse::<ItemId>().unwrap(), ItemId::Text("sku-42".into()));
    }

    #[test]
    fn test_item_serialization_skips_absent_fields() {
        let item = WishlistItem::new(101, "Cá hồi", 50000.0);
        let encoded = serde_json::to_value(&item).unwrap();
        assert_eq!(encoded, json!({"id": 101, "name": "Cá hồi", "price": 50000.0}));

        let item = WishlistItem::new("202", "Tôm", 1.0).with_image("/uploads/tom.png");
        let encoded = serde_json::to_value(&item).unwrap();
        assert_eq!(encoded["id"], json!("202"));
        assert_eq!(encoded["image"], json!("/uploads/tom.png"));
    }

    #[test]
    fn test_sanitized_price() {
        assert_eq!(WishlistItem::new(1, "a", -3.0).sanitized().price, 0.0);
        assert_eq!(WishlistItem::new(1, "a", f64::NAN).sanitized().price, 0.0);
        assert_eq!(WishlistItem::new(1, "a", 12.5).sanitized().price, 12.5);
    }
}
