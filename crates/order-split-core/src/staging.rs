use crate::catalog::{Contract, ItemId};
use crate::registry::ResourceRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedLine {
    pub item_id: ItemId,
    pub quantity: u64,
}

impl StagedLine {
    pub fn new(item_id: ItemId, quantity: u64) -> Self {
        Self { item_id, quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StagingError {
    #[error("no contract selected")]
    NoContract,
    #[error("item {0} is not part of the selected contract")]
    UnknownItem(ItemId),
    #[error("unknown resource '{0}'")]
    UnknownResource(String),
}

/// The order being assembled: one line per item of the selected contract
/// plus the set of resources taking part in the split.
#[derive(Debug, Clone, Default)]
pub struct OrderStaging {
    contract: Option<Contract>,
    lines: Vec<StagedLine>,
    selected: BTreeSet<String>,
}

impl OrderStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contract(&self) -> Option<&Contract> {
        self.contract.as_ref()
    }

    pub fn lines(&self) -> &[StagedLine] {
        &self.lines
    }

    pub fn selected_resources(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, resource_id: &str) -> bool {
        self.selected.contains(resource_id)
    }

    /// Stages `contract` with every quantity reset to zero. Resource
    /// selection is kept.
    pub fn select_contract(&mut self, contract: Contract) {
        self.lines = contract
            .items
            .iter()
            .map(|item| StagedLine::new(item.id, 0))
            .collect();
        self.contract = Some(contract);
    }

    pub fn clear_contract(&mut self) {
        self.contract = None;
        self.lines.clear();
    }

    pub fn set_quantity(&mut self, item_id: ItemId, quantity: u64) -> Result<(), StagingError> {
        if self.contract.is_none() {
            return Err(StagingError::NoContract);
        }
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.item_id == item_id)
            .ok_or(StagingError::UnknownItem(item_id))?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn quantity_of(&self, item_id: ItemId) -> Option<u64> {
        self.lines
            .iter()
            .find(|line| line.item_id == item_id)
            .map(|line| line.quantity)
    }

    /// Flips membership of `resource_id`; returns whether it is now selected.
    pub fn toggle_resource(
        &mut self,
        registry: &ResourceRegistry,
        resource_id: &str,
    ) -> Result<bool, StagingError> {
        if !registry.contains(resource_id) {
            return Err(StagingError::UnknownResource(resource_id.to_string()));
        }
        if self.selected.remove(resource_id) {
            Ok(false)
        } else {
            self.selected.insert(resource_id.to_string());
            Ok(true)
        }
    }

    pub fn set_resources<I, S>(
        &mut self,
        registry: &ResourceRegistry,
        resource_ids: I,
    ) -> Result<(), StagingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected = BTreeSet::new();
        for id in resource_ids {
            let id = id.into();
            if !registry.contains(&id) {
                return Err(StagingError::UnknownResource(id));
            }
            selected.insert(id);
        }
        self.selected = selected;
        Ok(())
    }

    pub fn select_all_resources(&mut self, registry: &ResourceRegistry) {
        self.selected = registry.ids().map(str::to_string).collect();
    }

    pub fn clear_resources(&mut self) {
        self.selected.clear();
    }
}
