use crate::catalog::{Contract, ContractDraft, ContractHeader, ContractId, Item, ItemDraft, ItemId};
use crate::validation::{self, CatalogValidationError};
use std::io;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("contract {0} not found")]
    ContractNotFound(ContractId),
    #[error("catalog store unavailable: {0}")]
    Unavailable(String),
}

impl From<CatalogValidationError> for CatalogError {
    fn from(value: CatalogValidationError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Storage for contracts and their items.
///
/// Implementations keep contracts in creation order and items in insertion
/// order; deleting a contract deletes its items.
pub trait CatalogStore {
    fn list_contracts(&self) -> CatalogResult<Vec<ContractHeader>>;
    fn list_items_for_contract(&self, contract_id: ContractId) -> CatalogResult<Vec<Item>>;
    fn create_contract(&self, name: &str) -> CatalogResult<ContractId>;
    fn create_item(&self, contract_id: ContractId, item: &ItemDraft) -> CatalogResult<ItemId>;
    fn delete_items_for_contract(&self, contract_id: ContractId) -> CatalogResult<()>;
    fn delete_contract(&self, contract_id: ContractId) -> CatalogResult<()>;

    /// Stores a contract and its items. The default runs the individual
    /// operations in sequence and removes the contract again when an item
    /// insert fails.
    fn create_contract_with_items(&self, draft: &ContractDraft) -> CatalogResult<Contract> {
        validation::validate_contract_draft(draft, None)?;
        let contract_id = self.create_contract(&draft.name)?;
        let mut items = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            match self.create_item(contract_id, item) {
                Ok(id) => items.push(item.clone().into_item(id)),
                Err(err) => {
                    if let Err(cleanup) = self.delete_contract(contract_id) {
                        warn!(contract_id, error = %cleanup, "could not remove partial contract");
                    }
                    return Err(err);
                }
            }
        }
        Ok(Contract {
            id: contract_id,
            name: draft.name.clone(),
            items,
        })
    }
}

pub fn load_contract(store: &dyn CatalogStore, header: ContractHeader) -> CatalogResult<Contract> {
    let items = store.list_items_for_contract(header.id)?;
    Ok(Contract {
        id: header.id,
        name: header.name,
        items,
    })
}

/// Every contract with its items, in store order.
pub fn load_contracts(store: &dyn CatalogStore) -> CatalogResult<Vec<Contract>> {
    store
        .list_contracts()?
        .into_iter()
        .map(|header| load_contract(store, header))
        .collect()
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{import_catalog, load_catalog_from_json, save_catalog_to_json};
pub use memory::MemoryCatalogStore;
