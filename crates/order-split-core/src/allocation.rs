//! Splits staged order quantities across the selected resources.
//!
//! The split is integer-exact: every unit of a staged line ends up at exactly
//! one eligible resource. When both tiers are present the priority tier gets
//! `floor(q * share%)` and the standard tier gets whatever is left, each tier
//! split with [`split_evenly`] in registry order.

use crate::catalog::{Contract, Item, ItemId};
use crate::money::{Money, line_total};
use crate::registry::{Resource, ResourceRegistry};
use crate::staging::StagedLine;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

pub const DEFAULT_PRIORITY_SHARE_PERCENT: u32 = 70;

fn default_priority_share_percent() -> u32 {
    DEFAULT_PRIORITY_SHARE_PERCENT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPolicy {
    /// Percentage of each line reserved for the priority tier when both
    /// tiers are eligible. Must be within 0..=100.
    #[serde(default = "default_priority_share_percent")]
    pub priority_share_percent: u32,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            priority_share_percent: DEFAULT_PRIORITY_SHARE_PERCENT,
        }
    }
}

impl AllocationPolicy {
    pub fn with_priority_share_percent(percent: u32) -> Self {
        Self {
            priority_share_percent: percent,
        }
    }

    /// `floor(quantity * share)`, computed without floating point.
    pub fn priority_share(&self, quantity: u64) -> u64 {
        let percent = u128::from(self.priority_share_percent.min(100));
        ((u128::from(quantity) * percent) / 100) as u64
    }
}

/// Quantity of one item held by one resource.
///
/// Name, unit, price and eligibility are copied from the contract for
/// display; the transfer engine reads the contract itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedItem {
    pub quantity: u64,
    pub total_value: Money,
    pub name: String,
    pub unit: String,
    pub unit_price: Money,
    pub eligible_resources: BTreeSet<String>,
}

impl AllocatedItem {
    pub fn empty(item: &Item) -> Self {
        Self {
            quantity: 0,
            total_value: Money::ZERO,
            name: item.name.clone(),
            unit: item.unit.clone(),
            unit_price: item.unit_price,
            eligible_resources: item.eligible_resources.clone(),
        }
    }

    pub(crate) fn set_quantity(&mut self, quantity: u64) {
        self.quantity = quantity;
        self.total_value = line_total(self.unit_price, quantity);
    }

    pub(crate) fn refresh_metadata(&mut self, item: &Item) {
        self.name.clone_from(&item.name);
        self.unit.clone_from(&item.unit);
        self.unit_price = item.unit_price;
        self.eligible_resources.clone_from(&item.eligible_resources);
        self.total_value = line_total(self.unit_price, self.quantity);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub total_value: Money,
    #[serde(default)]
    pub items: BTreeMap<ItemId, AllocatedItem>,
}

impl ResourceAllocation {
    pub fn quantity_of(&self, item_id: ItemId) -> u64 {
        self.items.get(&item_id).map(|i| i.quantity).unwrap_or(0)
    }

    /// Sum of the item totals; equals `total_value` while invariants hold.
    pub fn items_total(&self) -> Money {
        self.items.values().map(|i| i.total_value).sum()
    }
}

/// Per-resource breakdown of an order, keyed by resource id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationResult {
    resources: BTreeMap<String, ResourceAllocation>,
}

impl AllocationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn get(&self, resource_id: &str) -> Option<&ResourceAllocation> {
        self.resources.get(resource_id)
    }

    pub fn item(&self, resource_id: &str, item_id: ItemId) -> Option<&AllocatedItem> {
        self.resources.get(resource_id)?.items.get(&item_id)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &ResourceAllocation)> {
        self.resources.iter().map(|(id, alloc)| (id.as_str(), alloc))
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn quantity_of(&self, resource_id: &str, item_id: ItemId) -> u64 {
        self.resources
            .get(resource_id)
            .map(|alloc| alloc.quantity_of(item_id))
            .unwrap_or(0)
    }

    /// Quantity of `item_id` summed over every resource.
    pub fn total_quantity_of(&self, item_id: ItemId) -> u64 {
        self.resources
            .values()
            .map(|alloc| alloc.quantity_of(item_id))
            .sum()
    }

    pub fn total_value(&self) -> Money {
        self.resources.values().map(|alloc| alloc.total_value).sum()
    }

    pub(crate) fn resource_mut(&mut self, resource_id: &str) -> Option<&mut ResourceAllocation> {
        self.resources.get_mut(resource_id)
    }

    pub(crate) fn resource_entry(&mut self, resource_id: &str) -> &mut ResourceAllocation {
        self.resources.entry(resource_id.to_string()).or_default()
    }

    fn add_quantity(&mut self, resource_id: &str, item: &Item, quantity: u64) {
        let allocation = self.resource_entry(resource_id);
        let entry = allocation
            .items
            .entry(item.id)
            .or_insert_with(|| AllocatedItem::empty(item));
        let accumulated = entry.quantity + quantity;
        entry.set_quantity(accumulated);
        allocation.total_value += line_total(item.unit_price, quantity);
    }
}

/// Why an allocation run produced no result at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    NoContract,
    NoPositiveQuantity,
    NoSelectedResources,
}

impl EmptyReason {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoContract => "select a contract first",
            EmptyReason::NoPositiveQuantity => "no item has a quantity above zero",
            EmptyReason::NoSelectedResources => "select at least one resource",
        }
    }
}

/// An order line that was left out of the split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationWarning {
    NoEligibleResource {
        item_id: ItemId,
        item_name: String,
        quantity: u64,
    },
    UnknownItem {
        item_id: ItemId,
        quantity: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub result: Option<AllocationResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<AllocationWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_reason: Option<EmptyReason>,
}

impl AllocationOutcome {
    fn empty(reason: EmptyReason) -> Self {
        info!(reason = reason.message(), "allocation skipped");
        Self {
            result: None,
            warnings: Vec::new(),
            empty_reason: Some(reason),
        }
    }
}

/// Splits `quantity` over `slots` positions: the first `quantity % slots`
/// positions get one unit more than the rest.
pub fn split_evenly(quantity: u64, slots: usize) -> Vec<u64> {
    if slots == 0 {
        return Vec::new();
    }
    let k = slots as u64;
    let base = quantity / k;
    let extra = (quantity % k) as usize;
    (0..slots)
        .map(|idx| if idx < extra { base + 1 } else { base })
        .collect()
}

/// Shares of one line across its eligible resources, in registry order.
/// `eligible` must already be in registry order.
pub fn tiered_shares<'a>(
    quantity: u64,
    eligible: &[&'a Resource],
    policy: &AllocationPolicy,
) -> Vec<(&'a Resource, u64)> {
    let (priority, standard): (Vec<&Resource>, Vec<&Resource>) =
        eligible.iter().copied().partition(|r| r.priority);

    let (priority_quantity, standard_quantity) = match (priority.is_empty(), standard.is_empty()) {
        (true, true) => return Vec::new(),
        (false, true) => (quantity, 0),
        (true, false) => (0, quantity),
        (false, false) => {
            let share = policy.priority_share(quantity);
            (share, quantity - share)
        }
    };

    let mut shares = Vec::with_capacity(eligible.len());
    if !priority.is_empty() {
        shares.extend(
            priority
                .iter()
                .copied()
                .zip(split_evenly(priority_quantity, priority.len())),
        );
    }
    if !standard.is_empty() {
        shares.extend(
            standard
                .iter()
                .copied()
                .zip(split_evenly(standard_quantity, standard.len())),
        );
    }
    shares
}

/// Computes a fresh allocation. Never fails: missing inputs give an outcome
/// with `empty_reason` set, lines that cannot be placed come back as warnings.
pub fn allocate(
    contract: Option<&Contract>,
    lines: &[StagedLine],
    selected: &BTreeSet<String>,
    registry: &ResourceRegistry,
    policy: &AllocationPolicy,
) -> AllocationOutcome {
    let Some(contract) = contract else {
        return AllocationOutcome::empty(EmptyReason::NoContract);
    };
    if !lines.iter().any(|line| line.quantity > 0) {
        return AllocationOutcome::empty(EmptyReason::NoPositiveQuantity);
    }
    if selected.is_empty() {
        return AllocationOutcome::empty(EmptyReason::NoSelectedResources);
    }

    let mut result = AllocationResult::new();
    let mut warnings = Vec::new();

    for line in lines.iter().filter(|line| line.quantity > 0) {
        let Some(item) = contract.item(line.item_id) else {
            warn!(item_id = line.item_id, "staged line references an unknown item");
            warnings.push(AllocationWarning::UnknownItem {
                item_id: line.item_id,
                quantity: line.quantity,
            });
            continue;
        };

        let eligible =
            registry.ordered_where(|r| selected.contains(&r.id) && item.is_eligible(&r.id));
        if eligible.is_empty() {
            warn!(item_id = item.id, item = %item.name, "no selected resource is eligible");
            warnings.push(AllocationWarning::NoEligibleResource {
                item_id: item.id,
                item_name: item.name.clone(),
                quantity: line.quantity,
            });
            continue;
        }

        for (resource, quantity) in tiered_shares(line.quantity, &eligible, policy) {
            if quantity == 0 {
                continue;
            }
            debug!(item_id = item.id, resource = %resource.id, quantity, "allocated");
            result.add_quantity(&resource.id, item, quantity);
        }
    }

    info!(
        contract = %contract.name,
        resources = result.len(),
        total = %result.total_value(),
        skipped = warnings.len(),
        "allocation computed"
    );

    AllocationOutcome {
        result: Some(result),
        warnings,
        empty_reason: None,
    }
}
