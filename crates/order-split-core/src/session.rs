use crate::allocation::{
    AllocationOutcome, AllocationPolicy, AllocationResult, AllocationWarning, allocate,
};
use crate::catalog::{Contract, ContractDraft, ContractId, ItemId};
use crate::config::AppConfig;
use crate::export::ExportBundle;
use crate::persistence::{CatalogError, CatalogStore, load_contracts};
use crate::registry::ResourceRegistry;
use crate::staging::{OrderStaging, StagingError};
use crate::transfer::{TransferRejection, TransferRequest, transfer_within};
use crate::validation::{self, CatalogValidationError};
use chrono::NaiveDate;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Transfer(#[from] TransferRejection),
    #[error(transparent)]
    Validation(#[from] CatalogValidationError),
    #[error("contract {0} not found")]
    ContractNotFound(ContractId),
    #[error("no allocation has been computed")]
    NoAllocation,
}

/// State of one user working on one order: the known contracts, the staged
/// order and the current allocation.
///
/// Store failures never leave this state half-updated.
#[derive(Debug, Clone)]
pub struct OrderSession {
    registry: ResourceRegistry,
    policy: AllocationPolicy,
    contracts: Vec<Contract>,
    staging: OrderStaging,
    result: Option<AllocationResult>,
    warnings: Vec<AllocationWarning>,
}

impl OrderSession {
    pub fn new(registry: ResourceRegistry, policy: AllocationPolicy) -> Self {
        Self {
            registry,
            policy,
            contracts: Vec::new(),
            staging: OrderStaging::new(),
            result: None,
            warnings: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.resources.clone(), config.allocation)
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    pub fn staging(&self) -> &OrderStaging {
        &self.staging
    }

    pub fn selected_contract(&self) -> Option<&Contract> {
        self.staging.contract()
    }

    pub fn result(&self) -> Option<&AllocationResult> {
        self.result.as_ref()
    }

    /// Lines skipped by the last [`compute`](Self::compute).
    pub fn warnings(&self) -> &[AllocationWarning] {
        &self.warnings
    }

    pub fn reload_contracts(&mut self, store: &dyn CatalogStore) -> Result<usize, SessionError> {
        let contracts = load_contracts(store).map_err(|err| {
            warn!(error = %err, "could not load contracts, keeping the current list");
            err
        })?;
        self.contracts = contracts;
        if let Some(selected) = self.staging.contract().map(|c| c.id) {
            if !self.contracts.iter().any(|c| c.id == selected) {
                self.reset_selection();
            }
        }
        Ok(self.contracts.len())
    }

    pub fn select_contract(&mut self, contract_id: ContractId) -> Result<&Contract, SessionError> {
        let contract = self
            .contracts
            .iter()
            .find(|c| c.id == contract_id)
            .cloned()
            .ok_or(SessionError::ContractNotFound(contract_id))?;
        self.staging.select_contract(contract);
        self.result = None;
        self.warnings.clear();
        self.staging
            .contract()
            .ok_or(SessionError::ContractNotFound(contract_id))
    }

    pub fn set_quantity(&mut self, item_id: ItemId, quantity: u64) -> Result<(), SessionError> {
        self.staging.set_quantity(item_id, quantity)?;
        Ok(())
    }

    pub fn toggle_resource(&mut self, resource_id: &str) -> Result<bool, SessionError> {
        Ok(self.staging.toggle_resource(&self.registry, resource_id)?)
    }

    pub fn set_resources<I, S>(&mut self, resource_ids: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.staging.set_resources(&self.registry, resource_ids)?;
        Ok(())
    }

    pub fn select_all_resources(&mut self) {
        self.staging.select_all_resources(&self.registry);
    }

    pub fn clear_resources(&mut self) {
        self.staging.clear_resources();
    }

    /// Replaces the current allocation with a fresh one.
    pub fn compute(&mut self) -> AllocationOutcome {
        let outcome = allocate(
            self.staging.contract(),
            self.staging.lines(),
            self.staging.selected_resources(),
            &self.registry,
            &self.policy,
        );
        self.result = outcome.result.clone();
        self.warnings = outcome.warnings.clone();
        outcome
    }

    /// Applies a manual correction to the current allocation. On rejection
    /// the allocation is left as it was.
    pub fn transfer(&mut self, request: &TransferRequest) -> Result<&AllocationResult, SessionError> {
        let (Some(current), Some(contract)) = (self.result.as_ref(), self.staging.contract())
        else {
            return Err(SessionError::NoAllocation);
        };
        let staging = &self.staging;
        let next = transfer_within(current, contract, request, |id| staging.is_selected(id))?;
        Ok(self.result.insert(next))
    }

    pub fn create_contract(
        &mut self,
        store: &dyn CatalogStore,
        draft: &ContractDraft,
    ) -> Result<ContractId, SessionError> {
        validation::validate_contract_draft(draft, Some(&self.registry))?;
        let contract = store.create_contract_with_items(draft).map_err(|err| {
            warn!(error = %err, contract = %draft.name, "could not store contract");
            err
        })?;
        let id = contract.id;
        info!(contract_id = id, items = contract.items.len(), "contract added");
        self.contracts.push(contract);
        Ok(id)
    }

    /// Deletes the items, then the contract. Clears the staged order when it
    /// belonged to the deleted contract.
    pub fn delete_contract(
        &mut self,
        store: &dyn CatalogStore,
        contract_id: ContractId,
    ) -> Result<(), SessionError> {
        store
            .delete_items_for_contract(contract_id)
            .and_then(|_| store.delete_contract(contract_id))
            .map_err(|err| {
                warn!(contract_id, error = %err, "could not delete contract");
                err
            })?;
        self.contracts.retain(|c| c.id != contract_id);
        if self.staging.contract().map(|c| c.id) == Some(contract_id) {
            self.reset_selection();
        }
        info!(contract_id, "contract removed");
        Ok(())
    }

    pub fn export(
        &self,
        reference_date: NaiveDate,
        include_consolidated: bool,
    ) -> Result<ExportBundle, SessionError> {
        let (Some(result), Some(contract)) = (self.result.as_ref(), self.staging.contract()) else {
            return Err(SessionError::NoAllocation);
        };
        Ok(ExportBundle::new(
            result,
            contract,
            &self.registry,
            reference_date,
            include_consolidated,
        ))
    }

    fn reset_selection(&mut self) {
        self.staging.clear_contract();
        self.result = None;
        self.warnings.clear();
    }
}
