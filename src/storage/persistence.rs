//! Wire format of the persisted wishlist blob, plus load-time validation

use crate::core::{IdEquality, ItemId, Result, WishlistError, WishlistItem, resolve_price};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Highest envelope version this build understands.
pub const ENVELOPE_VERSION: u64 = 1;

// ============================================================================
// Formats
// ============================================================================

/// Shape used when writing the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistFormat {
    /// `{"version": 1, "saved_at": ..., "items": [...]}`
    #[default]
    Envelope,
    /// A bare JSON array of items, readable by older clients.
    BareArray,
}

/// Shape found when reading the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredFormat {
    BareArray,
    Envelope { version: u64 },
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u64,
    saved_at: DateTime<Utc>,
    items: &'a [WishlistItem],
}

// ============================================================================
// Encoding
// ============================================================================

pub fn encode_items(items: &[WishlistItem], format: PersistFormat) -> Result<Vec<u8>> {
    let bytes = match format {
        PersistFormat::Envelope => serde_json::to_vec(&EnvelopeRef {
            version: ENVELOPE_VERSION,
            saved_at: Utc::now(),
            items,
        })?,
        PersistFormat::BareArray => serde_json::to_vec(items)?,
    };
    Ok(bytes)
}

// ============================================================================
// Decoding / validation
// ============================================================================

/// Result of decoding a stored blob.
#[derive(Debug, Clone)]
pub struct DecodedWishlist {
    pub items: Vec<WishlistItem>,
    pub format: StoredFormat,
    /// Entries without a usable id (or not objects at all).
    pub dropped_invalid: usize,
    /// Entries whose id repeats an earlier one.
    pub dropped_duplicates: usize,
}

impl DecodedWishlist {
    pub fn dropped(&self) -> usize {
        self.dropped_invalid + self.dropped_duplicates
    }
}

/// Parses a stored blob into validated items.
///
/// Fails only when the blob as a whole is unusable: not JSON, not a
/// sequence, or an envelope of an unknown version. Individual bad entries are
/// dropped and counted instead.
pub fn decode_items(bytes: &[u8], equality: IdEquality) -> Result<DecodedWishlist> {
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|err| WishlistError::Malformed(format!("not valid JSON: {}", err)))?;

    let (entries, format) = match root {
        Value::Array(entries) => (entries, StoredFormat::BareArray),
        Value::Object(mut map) => {
            let version = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or_else(|| {
                    WishlistError::Malformed("expected a sequence, found an object".to_string())
                })?;
            if version == 0 || version > ENVELOPE_VERSION {
                return Err(WishlistError::Malformed(format!(
                    "unsupported envelope version {}",
                    version
                )));
            }
            match map.remove("items") {
                Some(Value::Array(entries)) => (entries, StoredFormat::Envelope { version }),
                _ => {
                    return Err(WishlistError::Malformed(
                        "envelope has no items sequence".to_string(),
                    ));
                }
            }
        }
        other => {
            return Err(WishlistError::Malformed(format!(
                "expected a sequence, found {}",
                json_kind(&other)
            )));
        }
    };

    let mut seen = HashSet::with_capacity(entries.len());
    let mut decoded = DecodedWishlist {
        items: Vec::with_capacity(entries.len()),
        format,
        dropped_invalid: 0,
        dropped_duplicates: 0,
    };

    for entry in &entries {
        let Some((id, item)) = validate_entry(entry) else {
            decoded.dropped_invalid += 1;
            continue;
        };
        if !seen.insert(dedup_key(&id, equality)) {
            decoded.dropped_duplicates += 1;
            continue;
        }
        decoded.items.push(item);
    }

    Ok(decoded)
}

fn validate_entry(entry: &Value) -> Option<(ItemId, WishlistItem)> {
    let fields = entry.as_object()?;
    let id = fields.get("id").and_then(ItemId::from_json)?;

    let item = WishlistItem {
        id: Some(id.clone()),
        name: fields
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        price: fields.get("price").map(resolve_price).unwrap_or(0.0),
        image: optional_text(fields.get("image")),
        description: optional_text(fields.get("description")),
    };
    Some((id, item))
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

/// Hashable form of an id under the given equality.
fn dedup_key(id: &ItemId, equality: IdEquality) -> (Option<&'static str>, String) {
    let key = id.canonical_key().into_owned();
    match equality {
        IdEquality::Strict => (Some(id.type_name()), key),
        IdEquality::Canonical => (None, key),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<DecodedWishlist> {
        decode_items(&serde_json::to_vec(&value).unwrap(), IdEquality::Strict)
    }

    #[test]
    fn test_bare_array_drops_missing_ids() {
        let decoded = decode(json!([
            {"id": 101, "name": "Cá hồi", "price": 50000},
            {"name": "no id", "price": 1},
            {"id": null, "name": "null id"},
            {"id": "202", "name": "Tôm", "price": "120000.50"},
            42
        ]))
        .unwrap();

        assert_eq!(decoded.format, StoredFormat::BareArray);
        assert_eq!(decoded.items.len(), 2);
        assert_eq!(decoded.dropped_invalid, 3);
        assert_eq!(decoded.items[0].id, Some(ItemId::Number(101)));
        assert_eq!(decoded.items[1].id, Some(ItemId::Text("202".into())));
        assert_eq!(decoded.items[1].price, 120000.5);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let decoded = decode(json!([
            {"id": 1, "name": "first"},
            {"id": 1, "name": "second"},
            {"id": "1", "name": "text one"}
        ]))
        .unwrap();
        assert_eq!(decoded.items.len(), 2);
        assert_eq!(decoded.items[0].name, "first");
        assert_eq!(decoded.dropped_duplicates, 1);

        let bytes = serde_json::to_vec(&json!([{"id": 1}, {"id": "1"}])).unwrap();
        let canonical = decode_items(&bytes, IdEquality::Canonical).unwrap();
        assert_eq!(canonical.items.len(), 1);
        assert_eq!(canonical.dropped(), 1);
    }

    #[test]
    fn test_fields_are_sanitized() {
        let decoded = decode(json!([
            {"id": 7, "name": 12, "price": -4, "image": 5, "description": "fresh"}
        ]))
        .unwrap();
        let item = &decoded.items[0];
        assert_eq!(item.name, "");
        assert_eq!(item.price, 0.0);
        assert_eq!(item.image, None);
        assert_eq!(item.description.as_deref(), Some("fresh"));
    }

    #[test]
    fn test_envelope_round_trip_preserves_order() {
        let items = vec![
            WishlistItem::new(3, "c", 3.0),
            WishlistItem::new("a", "a", 1.0).with_description("first letter"),
            WishlistItem::new(2, "b", 2.0).with_image("http://cdn/b.png"),
        ];
        let bytes = encode_items(&items, PersistFormat::Envelope).unwrap();
        let raw: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(raw["version"], json!(1));
        assert!(raw["saved_at"].is_string());

        let decoded = decode_items(&bytes, IdEquality::Strict).unwrap();
        assert_eq!(decoded.format, StoredFormat::Envelope { version: 1 });
        assert_eq!(decoded.items, items);
    }

    #[test]
    fn test_bare_array_format_is_plain_sequence() {
        let items = vec![WishlistItem::new(101, "Cá hồi", 50000.0)];
        let bytes = encode_items(&items, PersistFormat::BareArray).unwrap();
        let raw: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(raw, json!([{"id": 101, "name": "Cá hồi", "price": 50000.0}]));
    }

    #[test]
    fn test_unusable_blobs_are_malformed() {
        for blob in [
            &b"{not valid json"[..],
            b"null",
            b"\"[]\"",
            b"{\"id\": 1}",
            b"{\"version\": 2, \"items\": []}",
            b"{\"version\": 1, \"items\": {}}",
        ] {
            let result = decode_items(blob, IdEquality::Strict);
            assert!(
                matches!(result, Err(WishlistError::Malformed(_))),
                "blob {:?} should be malformed",
                String::from_utf8_lossy(blob)
            );
        }
    }
}
