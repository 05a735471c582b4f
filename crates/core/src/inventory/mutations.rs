//! Pure mutation operations over the in-memory inventory state.
//!
//! Every operation is a transformation of the [`InventoryBook`]: given the
//! current state and validated input it either applies the change or returns
//! a [`ValidationError`] with the state untouched. No operation performs I/O.

use uuid::Uuid;

use crate::errors::ValidationError;

use super::model::{
    field_id_from_label, CustomFieldDefinition, CustomFieldType, CustomFieldValue, InventoryItem,
    NewItemInput, SizeVariant, SkuPolicy,
};

/// The full in-memory inventory: items plus custom-field definitions.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryBook {
    pub items: Vec<InventoryItem>,
    pub custom_fields: Vec<CustomFieldDefinition>,
}

impl InventoryBook {
    pub fn new(items: Vec<InventoryItem>, custom_fields: Vec<CustomFieldDefinition>) -> Self {
        Self {
            items,
            custom_fields,
        }
    }

    fn item_mut(&mut self, item_id: &str) -> Result<&mut InventoryItem, ValidationError> {
        self.items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| ValidationError::UnknownItem(item_id.to_string()))
    }

    fn variant_mut<'a>(
        item: &'a mut InventoryItem,
        variant_id: &str,
    ) -> Result<&'a mut SizeVariant, ValidationError> {
        item.variants
            .iter_mut()
            .find(|variant| variant.id == variant_id)
            .ok_or_else(|| ValidationError::UnknownVariant(variant_id.to_string()))
    }

    fn check_sku_free(&self, sku: &str, except_item: Option<&str>) -> Result<(), ValidationError> {
        let taken = self
            .items
            .iter()
            .any(|item| item.sku == sku && Some(item.id.as_str()) != except_item);
        if taken {
            return Err(ValidationError::DuplicateSku(sku.to_string()));
        }
        Ok(())
    }

    /// Create an item with one variant per size. Returns the new item id.
    pub fn add_item(
        &mut self,
        input: NewItemInput,
        policy: SkuPolicy,
    ) -> Result<String, ValidationError> {
        let sku = input.sku.trim().to_string();
        let title = input.title.trim().to_string();
        if sku.is_empty() {
            return Err(ValidationError::EmptySku);
        }
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let sizes: Vec<String> = input
            .sizes
            .iter()
            .map(|size| size.trim().to_string())
            .filter(|size| !size.is_empty())
            .collect();
        if sizes.is_empty() {
            return Err(ValidationError::EmptySizes);
        }
        if policy == SkuPolicy::EnforceUnique {
            self.check_sku_free(&sku, None)?;
        }

        let variants = sizes
            .into_iter()
            .map(|size| SizeVariant::new(size, input.quantity, input.location.clone()))
            .collect();
        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            sku,
            title,
            image_url: input.image_url.filter(|url| !url.trim().is_empty()),
            variants,
            custom_fields: Default::default(),
        };
        let id = item.id.clone();
        self.items.push(item);
        Ok(id)
    }

    pub fn update_item_title(
        &mut self,
        item_id: &str,
        title: &str,
    ) -> Result<(), ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        self.item_mut(item_id)?.title = title.to_string();
        Ok(())
    }

    pub fn update_item_sku(
        &mut self,
        item_id: &str,
        sku: &str,
        policy: SkuPolicy,
    ) -> Result<(), ValidationError> {
        let sku = sku.trim();
        if sku.is_empty() {
            return Err(ValidationError::EmptySku);
        }
        if policy == SkuPolicy::EnforceUnique {
            self.check_sku_free(sku, Some(item_id))?;
        }
        self.item_mut(item_id)?.sku = sku.to_string();
        Ok(())
    }

    pub fn update_item_image_url(
        &mut self,
        item_id: &str,
        image_url: Option<String>,
    ) -> Result<(), ValidationError> {
        self.item_mut(item_id)?.image_url = image_url.filter(|url| !url.trim().is_empty());
        Ok(())
    }

    pub fn delete_item(&mut self, item_id: &str) -> Result<(), ValidationError> {
        let before = self.items.len();
        self.items.retain(|item| item.id != item_id);
        if self.items.len() == before {
            return Err(ValidationError::UnknownItem(item_id.to_string()));
        }
        Ok(())
    }

    /// Append a variant to an item. Returns the new variant id.
    pub fn add_variant(
        &mut self,
        item_id: &str,
        size: &str,
        quantity: u32,
        location: &str,
    ) -> Result<String, ValidationError> {
        let size = size.trim();
        if size.is_empty() {
            return Err(ValidationError::EmptySize);
        }
        let item = self.item_mut(item_id)?;
        let variant = SizeVariant::new(size, quantity, location.trim());
        let id = variant.id.clone();
        item.variants.push(variant);
        Ok(id)
    }

    /// Remove a variant. Removing the sole remaining variant is rejected, not
    /// performed: an item always keeps at least one variant.
    pub fn delete_variant(
        &mut self,
        item_id: &str,
        variant_id: &str,
    ) -> Result<(), ValidationError> {
        let item = self.item_mut(item_id)?;
        if !item.variants.iter().any(|variant| variant.id == variant_id) {
            return Err(ValidationError::UnknownVariant(variant_id.to_string()));
        }
        if item.variants.len() == 1 {
            return Err(ValidationError::LastVariant);
        }
        item.variants.retain(|variant| variant.id != variant_id);
        Ok(())
    }

    /// Set an absolute quantity, clamped to a non-negative integer. The stock
    /// flag is re-derived. Returns the resulting quantity.
    pub fn set_variant_quantity(
        &mut self,
        item_id: &str,
        variant_id: &str,
        quantity: i64,
    ) -> Result<u32, ValidationError> {
        let item = self.item_mut(item_id)?;
        let variant = Self::variant_mut(item, variant_id)?;
        variant.quantity = quantity.clamp(0, u32::MAX as i64) as u32;
        variant.in_stock = variant.quantity > 0;
        Ok(variant.quantity)
    }

    /// Apply a signed delta, saturating at zero. The stock flag is re-derived.
    pub fn adjust_variant_quantity(
        &mut self,
        item_id: &str,
        variant_id: &str,
        delta: i64,
    ) -> Result<u32, ValidationError> {
        let item = self.item_mut(item_id)?;
        let variant = Self::variant_mut(item, variant_id)?;
        let next = (variant.quantity as i64).saturating_add(delta);
        variant.quantity = next.clamp(0, u32::MAX as i64) as u32;
        variant.in_stock = variant.quantity > 0;
        Ok(variant.quantity)
    }

    pub fn set_variant_location(
        &mut self,
        item_id: &str,
        variant_id: &str,
        location: &str,
    ) -> Result<(), ValidationError> {
        let item = self.item_mut(item_id)?;
        Self::variant_mut(item, variant_id)?.location = location.trim().to_string();
        Ok(())
    }

    pub fn set_variant_size(
        &mut self,
        item_id: &str,
        variant_id: &str,
        size: &str,
    ) -> Result<(), ValidationError> {
        let size = size.trim();
        if size.is_empty() {
            return Err(ValidationError::EmptySize);
        }
        let item = self.item_mut(item_id)?;
        Self::variant_mut(item, variant_id)?.size = size.to_string();
        Ok(())
    }

    /// Define a custom field. The id is derived from the label; a collision
    /// with an existing id is rejected. Returns the new field id.
    pub fn add_custom_field(
        &mut self,
        label: &str,
        field_type: CustomFieldType,
    ) -> Result<String, ValidationError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ValidationError::EmptyLabel);
        }
        let id = field_id_from_label(label);
        if self.custom_fields.iter().any(|field| field.id == id) {
            return Err(ValidationError::DuplicateCustomField(id));
        }
        self.custom_fields.push(CustomFieldDefinition {
            id: id.clone(),
            label: label.to_string(),
            field_type,
        });
        Ok(id)
    }

    /// Remove a field definition and strip its values from every item.
    pub fn delete_custom_field(&mut self, field_id: &str) -> Result<(), ValidationError> {
        let before = self.custom_fields.len();
        self.custom_fields.retain(|field| field.id != field_id);
        if self.custom_fields.len() == before {
            return Err(ValidationError::UnknownCustomField(field_id.to_string()));
        }
        for item in &mut self.items {
            item.custom_fields.remove(field_id);
        }
        Ok(())
    }

    pub fn set_custom_field_value(
        &mut self,
        item_id: &str,
        field_id: &str,
        value: CustomFieldValue,
    ) -> Result<(), ValidationError> {
        if !self.custom_fields.iter().any(|field| field.id == field_id) {
            return Err(ValidationError::UnknownCustomField(field_id.to_string()));
        }
        self.item_mut(item_id)?
            .custom_fields
            .insert(field_id.to_string(), value);
        Ok(())
    }

    pub fn clear_custom_field_value(
        &mut self,
        item_id: &str,
        field_id: &str,
    ) -> Result<(), ValidationError> {
        self.item_mut(item_id)?.custom_fields.remove(field_id);
        Ok(())
    }
}
