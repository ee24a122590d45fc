use super::{CatalogResult, CatalogStore, load_contracts};
use crate::catalog::{Contract, ContractDraft};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::info;

#[derive(Serialize, Deserialize)]
struct CatalogSnapshot {
    contracts: Vec<Contract>,
}

/// Writes every contract of `store` to a JSON file.
pub fn save_catalog_to_json<P: AsRef<Path>>(store: &dyn CatalogStore, path: P) -> CatalogResult<()> {
    let snapshot = CatalogSnapshot {
        contracts: load_contracts(store)?,
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

/// Reads a snapshot written by [`save_catalog_to_json`]. Ids in the file are
/// informational; [`import_catalog`] assigns new ones.
pub fn load_catalog_from_json<P: AsRef<Path>>(path: P) -> CatalogResult<Vec<ContractDraft>> {
    let file = File::open(path)?;
    let snapshot: CatalogSnapshot = serde_json::from_reader(file)?;
    let drafts: Vec<ContractDraft> = snapshot.contracts.iter().map(ContractDraft::from).collect();
    for draft in &drafts {
        validation::validate_contract_draft(draft, None)?;
    }
    Ok(drafts)
}

pub fn import_catalog(store: &dyn CatalogStore, drafts: &[ContractDraft]) -> CatalogResult<Vec<Contract>> {
    let mut created = Vec::with_capacity(drafts.len());
    for draft in drafts {
        created.push(store.create_contract_with_items(draft)?);
    }
    info!(contracts = created.len(), "catalog imported");
    Ok(created)
}
