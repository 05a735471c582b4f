//! Inventory record model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stock-keeping unit of a product, distinguished by size, with its own
/// quantity and storage location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeVariant {
    pub id: String,
    pub size: String,
    pub quantity: u32,
    pub in_stock: bool,
    pub location: String,
}

impl SizeVariant {
    /// Construct a variant with `in_stock` derived from the quantity.
    pub fn new(size: impl Into<String>, quantity: u32, location: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            size: size.into(),
            quantity,
            in_stock: quantity > 0,
            location: location.into(),
        }
    }

    /// Construct a variant with an explicit stock flag, as the codec does when
    /// importing rows whose IN_STOCK column disagrees with the quantity.
    pub fn with_stock_flag(
        size: impl Into<String>,
        quantity: u32,
        in_stock: bool,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            size: size.into(),
            quantity,
            in_stock,
            location: location.into(),
        }
    }
}

/// Value of a user-defined extra attribute on an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomFieldValue {
    Text(String),
    Number(f64),
}

/// A product identified by SKU with one or more size variants.
///
/// Invariant: `variants` is never empty; the mutation operations reject
/// removal of the sole remaining variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub sku: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub variants: Vec<SizeVariant>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, CustomFieldValue>,
}

/// Data type of a user-defined field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFieldType {
    Text,
    Number,
}

/// Definition of a user-defined extra attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldDefinition {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: CustomFieldType,
}

/// Derive a field id from its label: lowercase, whitespace to underscore.
pub fn field_id_from_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                '_'
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

/// Whether manual SKU edits must keep SKUs unique across items.
///
/// The import merge step always folds rows by SKU; this policy only governs
/// item-by-item edits, where the reference behavior allows collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkuPolicy {
    #[default]
    AllowDuplicates,
    EnforceUnique,
}

/// Validated input for creating a new item.
#[derive(Debug, Clone)]
pub struct NewItemInput {
    pub sku: String,
    pub title: String,
    /// One variant is created per size, all sharing quantity and location.
    pub sizes: Vec<String>,
    pub quantity: u32,
    pub location: String,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_id_is_lowercased_with_underscores() {
        assert_eq!(field_id_from_label("Purchase Price"), "purchase_price");
        assert_eq!(field_id_from_label("  Lead Time  "), "lead_time");
        assert_eq!(field_id_from_label("Notes"), "notes");
    }

    #[test]
    fn variant_stock_flag_derives_from_quantity() {
        assert!(SizeVariant::new("M", 3, "R1").in_stock);
        assert!(!SizeVariant::new("M", 0, "R1").in_stock);
    }

    #[test]
    fn custom_field_value_serializes_untagged() {
        let text = serde_json::to_string(&CustomFieldValue::Text("blue".to_string())).unwrap();
        assert_eq!(text, "\"blue\"");
        let number = serde_json::to_string(&CustomFieldValue::Number(12.5)).unwrap();
        assert_eq!(number, "12.5");
    }

    #[test]
    fn item_serializes_camel_case() {
        let item = InventoryItem {
            id: "i1".to_string(),
            sku: "A1".to_string(),
            title: "Shirt".to_string(),
            image_url: None,
            variants: vec![SizeVariant::new("M", 1, "R1")],
            custom_fields: BTreeMap::new(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("imageUrl").is_none());
        assert!(json["variants"][0]["inStock"].as_bool().unwrap());
    }
}
