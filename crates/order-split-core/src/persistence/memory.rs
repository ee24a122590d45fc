use super::{CatalogError, CatalogResult, CatalogStore};
use crate::catalog::{ContractHeader, ContractId, Item, ItemDraft, ItemId};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    next_contract_id: ContractId,
    next_item_id: ItemId,
    contracts: Vec<ContractHeader>,
    items: Vec<(ContractId, Item)>,
}

/// Catalog kept in process memory. Ids start at 1, like the SQL store.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    state: Mutex<MemoryState>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> CatalogResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| CatalogError::Unavailable("memory store lock poisoned".into()))
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn list_contracts(&self) -> CatalogResult<Vec<ContractHeader>> {
        Ok(self.state()?.contracts.clone())
    }

    fn list_items_for_contract(&self, contract_id: ContractId) -> CatalogResult<Vec<Item>> {
        Ok(self
            .state()?
            .items
            .iter()
            .filter(|(owner, _)| *owner == contract_id)
            .map(|(_, item)| item.clone())
            .collect())
    }

    fn create_contract(&self, name: &str) -> CatalogResult<ContractId> {
        let mut state = self.state()?;
        state.next_contract_id += 1;
        let id = state.next_contract_id;
        state.contracts.push(ContractHeader {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    fn create_item(&self, contract_id: ContractId, item: &ItemDraft) -> CatalogResult<ItemId> {
        let mut state = self.state()?;
        if !state.contracts.iter().any(|c| c.id == contract_id) {
            return Err(CatalogError::ContractNotFound(contract_id));
        }
        state.next_item_id += 1;
        let id = state.next_item_id;
        state.items.push((contract_id, item.clone().into_item(id)));
        Ok(id)
    }

    fn delete_items_for_contract(&self, contract_id: ContractId) -> CatalogResult<()> {
        self.state()?
            .items
            .retain(|(owner, _)| *owner != contract_id);
        Ok(())
    }

    fn delete_contract(&self, contract_id: ContractId) -> CatalogResult<()> {
        let mut state = self.state()?;
        let before = state.contracts.len();
        state.contracts.retain(|c| c.id != contract_id);
        if state.contracts.len() == before {
            return Err(CatalogError::ContractNotFound(contract_id));
        }
        state.items.retain(|(owner, _)| *owner != contract_id);
        Ok(())
    }
}
