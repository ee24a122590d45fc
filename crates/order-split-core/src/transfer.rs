//! Manual correction of a computed allocation.
//!
//! A transfer moves part of one item's quantity from a source resource to a
//! destination resource. The input result is never modified; a new value is
//! returned so callers can keep the previous one around.

use crate::allocation::{AllocatedItem, AllocationResult};
use crate::catalog::{Contract, ItemId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub item_id: ItemId,
    /// Signed so that non-positive input can be reported instead of parsed away.
    pub quantity: i64,
    pub from: String,
    pub to: String,
}

impl TransferRequest {
    pub fn new(
        item_id: ItemId,
        quantity: i64,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            quantity,
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A transfer that was refused. The result it was applied to is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferRejection {
    #[error("there is no allocation to transfer from")]
    EmptyResult,
    #[error("resource '{resource_id}' holds no units of item {item_id}")]
    ItemNotAtSource { item_id: ItemId, resource_id: String },
    #[error("transfer quantity must be positive (got {quantity})")]
    NonPositiveQuantity { quantity: i64 },
    #[error(
        "resource '{resource_id}' holds {available} units of item {item_id}, cannot move {requested}"
    )]
    InsufficientQuantity {
        item_id: ItemId,
        resource_id: String,
        available: u64,
        requested: u64,
    },
    #[error("item {item_id} is not part of contract '{contract}'")]
    UnknownItem { item_id: ItemId, contract: String },
    #[error("resource '{resource_id}' is not eligible for item {item_id}")]
    IneligibleDestination { item_id: ItemId, resource_id: String },
    #[error("source and destination are both '{resource_id}'")]
    SameResource { resource_id: String },
    #[error("resource '{resource_id}' is not part of the current selection")]
    DestinationNotSelected { resource_id: String },
}

/// Moves `request.quantity` units of an item between two resources.
///
/// Eligibility and unit price are read from `contract`, not from the copies
/// stored on the allocated items.
pub fn transfer(
    result: &AllocationResult,
    contract: &Contract,
    request: &TransferRequest,
) -> Result<AllocationResult, TransferRejection> {
    transfer_within(result, contract, request, |_| true)
}

/// [`transfer`] with one more guard: `destination_allowed` must accept
/// `request.to` once every other guard has passed.
pub(crate) fn transfer_within(
    result: &AllocationResult,
    contract: &Contract,
    request: &TransferRequest,
    destination_allowed: impl Fn(&str) -> bool,
) -> Result<AllocationResult, TransferRejection> {
    let outcome = apply(result, contract, request).and_then(|next| {
        if destination_allowed(&request.to) {
            Ok(next)
        } else {
            Err(TransferRejection::DestinationNotSelected {
                resource_id: request.to.clone(),
            })
        }
    });
    match &outcome {
        Ok(_) => info!(
            item_id = request.item_id,
            quantity = request.quantity,
            from = %request.from,
            to = %request.to,
            "transfer applied"
        ),
        Err(rejection) => warn!(
            item_id = request.item_id,
            from = %request.from,
            to = %request.to,
            %rejection,
            "transfer rejected"
        ),
    }
    outcome
}

/// Like [`transfer`], but hands back a copy of the input on rejection.
pub fn transfer_or_keep(
    result: &AllocationResult,
    contract: &Contract,
    request: &TransferRequest,
) -> AllocationResult {
    transfer(result, contract, request).unwrap_or_else(|_| result.clone())
}

fn apply(
    result: &AllocationResult,
    contract: &Contract,
    request: &TransferRequest,
) -> Result<AllocationResult, TransferRejection> {
    if result.is_empty() {
        return Err(TransferRejection::EmptyResult);
    }
    let source = result
        .item(&request.from, request.item_id)
        .ok_or_else(|| TransferRejection::ItemNotAtSource {
            item_id: request.item_id,
            resource_id: request.from.clone(),
        })?;
    if request.quantity <= 0 {
        return Err(TransferRejection::NonPositiveQuantity {
            quantity: request.quantity,
        });
    }
    let quantity = request.quantity as u64;
    if source.quantity < quantity {
        return Err(TransferRejection::InsufficientQuantity {
            item_id: request.item_id,
            resource_id: request.from.clone(),
            available: source.quantity,
            requested: quantity,
        });
    }
    let item = contract
        .item(request.item_id)
        .ok_or_else(|| TransferRejection::UnknownItem {
            item_id: request.item_id,
            contract: contract.name.clone(),
        })?;
    if !item.is_eligible(&request.to) {
        return Err(TransferRejection::IneligibleDestination {
            item_id: request.item_id,
            resource_id: request.to.clone(),
        });
    }
    if request.from == request.to {
        return Err(TransferRejection::SameResource {
            resource_id: request.to.clone(),
        });
    }

    // Touched resource totals are rebuilt from their item lines.
    let mut next = result.clone();

    if let Some(source_alloc) = next.resource_mut(&request.from) {
        if let Some(source_item) = source_alloc.items.get_mut(&item.id) {
            source_item.refresh_metadata(item);
            let remaining = source_item.quantity - quantity;
            source_item.set_quantity(remaining);
            if remaining == 0 {
                source_alloc.items.remove(&item.id);
            }
        }
        source_alloc.total_value = source_alloc.items_total();
    }

    let destination = next.resource_entry(&request.to);
    let dest_item = destination
        .items
        .entry(item.id)
        .or_insert_with(|| AllocatedItem::empty(item));
    dest_item.refresh_metadata(item);
    let accumulated = dest_item.quantity + quantity;
    dest_item.set_quantity(accumulated);
    destination.total_value = destination.items_total();

    Ok(next)
}
