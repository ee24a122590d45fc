pub mod allocation;
pub mod catalog;
pub mod config;
pub mod export;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod logging;
pub mod money;
pub mod persistence;
pub mod registry;
pub mod session;
pub mod staging;
pub mod transfer;
pub mod validation;

pub use allocation::{
    AllocatedItem, AllocationOutcome, AllocationPolicy, AllocationResult, AllocationWarning,
    EmptyReason, ResourceAllocation, allocate,
};
pub use catalog::{Contract, ContractDraft, ContractHeader, ContractId, Item, ItemDraft, ItemId};
pub use config::{AppConfig, ConfigError};
pub use export::{
    ExportBundle, ExportRow, ResourceSheet, RowKind, save_export_to_json, write_sheets_to_csv,
};
pub use money::{Money, round_currency};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteCatalogStore;
pub use persistence::{
    CatalogError, CatalogStore, MemoryCatalogStore, import_catalog, load_catalog_from_json,
    load_contracts, save_catalog_to_json,
};
pub use registry::{Resource, ResourceRegistry};
pub use session::{OrderSession, SessionError};
pub use staging::{OrderStaging, StagedLine, StagingError};
pub use transfer::{TransferRejection, TransferRequest, transfer, transfer_or_keep};
