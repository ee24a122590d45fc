use crate::catalog::{ContractDraft, ItemDraft};
use crate::registry::ResourceRegistry;
use std::fmt;

#[derive(Debug, Clone)]
pub struct CatalogValidationError {
    message: String,
}

impl CatalogValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CatalogValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CatalogValidationError {}

/// Checks an item before it reaches the store. When a registry is given,
/// every eligible id must name a known resource.
pub fn validate_item_draft(
    item: &ItemDraft,
    registry: Option<&ResourceRegistry>,
) -> Result<(), CatalogValidationError> {
    if item.name.trim().is_empty() {
        return Err(CatalogValidationError::new("item requires a non-empty name"));
    }
    if item.unit.trim().is_empty() {
        return Err(CatalogValidationError::new(format!(
            "item '{}' requires a non-empty unit",
            item.name
        )));
    }
    if item.unit_price.is_negative() {
        return Err(CatalogValidationError::new(format!(
            "item '{}' has negative unit price {}",
            item.name, item.unit_price
        )));
    }
    if item.eligible_resources.is_empty() {
        return Err(CatalogValidationError::new(format!(
            "item '{}' requires at least one eligible resource",
            item.name
        )));
    }
    for resource_id in &item.eligible_resources {
        if resource_id.contains(',') || resource_id.trim().is_empty() {
            return Err(CatalogValidationError::new(format!(
                "item '{}' has invalid resource id '{}'",
                item.name, resource_id
            )));
        }
        if let Some(registry) = registry {
            if !registry.contains(resource_id) {
                return Err(CatalogValidationError::new(format!(
                    "item '{}' references unknown resource '{}'",
                    item.name, resource_id
                )));
            }
        }
    }
    Ok(())
}

pub fn validate_contract_draft(
    contract: &ContractDraft,
    registry: Option<&ResourceRegistry>,
) -> Result<(), CatalogValidationError> {
    if contract.name.trim().is_empty() {
        return Err(CatalogValidationError::new(
            "contract requires a non-empty name",
        ));
    }
    for item in &contract.items {
        validate_item_draft(item, registry)?;
    }
    Ok(())
}
