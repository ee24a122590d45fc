use chrono::NaiveDate;
use order_split::{
    AllocationPolicy, CatalogError, CatalogStore, ContractDraft, ContractHeader, ItemDraft,
    MemoryCatalogStore, Money, OrderSession, Resource, ResourceRegistry, SessionError,
    StagingError, TransferRejection, TransferRequest, logging,
};
use order_split::catalog::{ContractId, Item, ItemId};
use order_split::persistence::CatalogResult;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

fn registry() -> ResourceRegistry {
    ResourceRegistry::new(vec![
        Resource::new("A", "Alpha", true),
        Resource::new("B", "Beta", false),
        Resource::new("C", "Gamma", false),
    ])
    .expect("valid registry")
}

fn draft() -> ContractDraft {
    ContractDraft::new("Cesta Básica")
        .with_item(
            ItemDraft::new("Arroz", "kg", Money::from_cents(1000)).with_eligible(["A", "B", "C"]),
        )
        .with_item(ItemDraft::new("Feijão", "kg", Money::from_cents(735)).with_eligible(["B"]))
}

/// Session with one stored contract, staged with 10 units of the first item.
fn staged_session(store: &MemoryCatalogStore) -> (OrderSession, ContractId, ItemId) {
    logging::init_test();
    let mut session = OrderSession::new(registry(), AllocationPolicy::default());
    let contract_id = session.create_contract(store, &draft()).expect("create");
    let item_id = session.contracts()[0].items[0].id;
    session.select_contract(contract_id).expect("select");
    session.set_quantity(item_id, 10).expect("quantity");
    session.select_all_resources();
    (session, contract_id, item_id)
}

struct UnavailableStore;

impl CatalogStore for UnavailableStore {
    fn list_contracts(&self) -> CatalogResult<Vec<ContractHeader>> {
        Err(CatalogError::Unavailable("offline".into()))
    }
    fn list_items_for_contract(&self, _: ContractId) -> CatalogResult<Vec<Item>> {
        Err(CatalogError::Unavailable("offline".into()))
    }
    fn create_contract(&self, _: &str) -> CatalogResult<ContractId> {
        Err(CatalogError::Unavailable("offline".into()))
    }
    fn create_item(&self, _: ContractId, _: &ItemDraft) -> CatalogResult<ItemId> {
        Err(CatalogError::Unavailable("offline".into()))
    }
    fn delete_items_for_contract(&self, _: ContractId) -> CatalogResult<()> {
        Err(CatalogError::Unavailable("offline".into()))
    }
    fn delete_contract(&self, _: ContractId) -> CatalogResult<()> {
        Err(CatalogError::Unavailable("offline".into()))
    }
}

#[test]
fn compute_stores_the_allocation() {
    let store = MemoryCatalogStore::new();
    let (mut session, _, item_id) = staged_session(&store);

    let outcome = session.compute();
    let result = outcome.result.expect("allocation result");
    assert_eq!(result.quantity_of("A", item_id), 7);
    assert_eq!(result.quantity_of("B", item_id), 2);
    assert_eq!(result.quantity_of("C", item_id), 1);
    assert_eq!(session.result(), Some(&result));
}

#[test]
fn selecting_a_contract_resets_quantities_and_result() {
    let store = MemoryCatalogStore::new();
    let (mut session, contract_id, item_id) = staged_session(&store);
    session.compute();
    assert!(session.result().is_some());

    session.select_contract(contract_id).unwrap();
    assert!(session.result().is_none());
    assert_eq!(session.staging().quantity_of(item_id), Some(0));
    assert_eq!(session.staging().selected_resources().len(), 3);
}

#[test]
fn staging_rejects_unknown_items_and_resources() {
    let store = MemoryCatalogStore::new();
    let (mut session, _, _) = staged_session(&store);
    assert!(matches!(
        session.set_quantity(999, 1),
        Err(SessionError::Staging(StagingError::UnknownItem(999)))
    ));
    assert!(matches!(
        session.toggle_resource("Z"),
        Err(SessionError::Staging(StagingError::UnknownResource(_)))
    ));
    assert!(!session.toggle_resource("C").unwrap());
    assert!(session.toggle_resource("C").unwrap());
}

#[test]
fn transfer_requires_a_computed_allocation() {
    let store = MemoryCatalogStore::new();
    let (mut session, _, item_id) = staged_session(&store);
    assert!(matches!(
        session.transfer(&TransferRequest::new(item_id, 1, "A", "B")),
        Err(SessionError::NoAllocation)
    ));
}

#[test]
fn transfer_updates_the_current_allocation() {
    let store = MemoryCatalogStore::new();
    let (mut session, _, item_id) = staged_session(&store);
    session.compute();

    let updated = session
        .transfer(&TransferRequest::new(item_id, 2, "A", "C"))
        .expect("transfer")
        .clone();
    assert_eq!(updated.quantity_of("A", item_id), 5);
    assert_eq!(updated.quantity_of("C", item_id), 3);
    assert_eq!(session.result(), Some(&updated));
}

#[test]
fn transfer_to_an_unselected_resource_is_rejected() {
    let store = MemoryCatalogStore::new();
    let (mut session, _, item_id) = staged_session(&store);
    session.compute();
    session.toggle_resource("C").unwrap();
    let before = session.result().cloned();

    let err = session
        .transfer(&TransferRequest::new(item_id, 1, "A", "C"))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Transfer(TransferRejection::DestinationNotSelected { .. })
    ));
    assert_eq!(session.result().cloned(), before);
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn unselected_destination_is_only_logged_as_rejected() {
    let store = MemoryCatalogStore::new();
    let (mut session, _, item_id) = staged_session(&store);
    session.compute();
    session.toggle_resource("C").unwrap();

    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, || {
        session
            .transfer(&TransferRequest::new(item_id, 1, "A", "C"))
            .map(|_| ())
    });

    assert!(result.is_err());
    let output = log.contents();
    assert!(output.contains("transfer rejected"), "log was:\n{output}");
    assert!(!output.contains("transfer applied"), "log was:\n{output}");
}

#[test]
fn rejected_transfer_keeps_the_allocation() {
    let store = MemoryCatalogStore::new();
    let (mut session, _, item_id) = staged_session(&store);
    session.compute();
    let before = session.result().cloned();

    let err = session
        .transfer(&TransferRequest::new(item_id, 50, "A", "B"))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Transfer(TransferRejection::InsufficientQuantity { .. })
    ));
    assert_eq!(session.result().cloned(), before);
}

#[test]
fn deleting_the_selected_contract_clears_the_order() {
    let store = MemoryCatalogStore::new();
    let (mut session, contract_id, _) = staged_session(&store);
    session.compute();

    session.delete_contract(&store, contract_id).expect("delete");
    assert!(session.contracts().is_empty());
    assert!(session.selected_contract().is_none());
    assert!(session.result().is_none());
    assert!(store.list_contracts().unwrap().is_empty());
}

#[test]
fn contracts_are_validated_against_the_registry() {
    let store = MemoryCatalogStore::new();
    let mut session = OrderSession::new(registry(), AllocationPolicy::default());
    let unknown = ContractDraft::new("Outro").with_item(
        ItemDraft::new("Sal", "kg", Money::from_cents(200)).with_eligible(["saude"]),
    );
    assert!(matches!(
        session.create_contract(&store, &unknown),
        Err(SessionError::Validation(_))
    ));
    assert!(store.list_contracts().unwrap().is_empty());
}

#[test]
fn store_failures_leave_the_session_unchanged() {
    let store = MemoryCatalogStore::new();
    let (mut session, contract_id, _) = staged_session(&store);
    session.compute();
    let contracts_before = session.contracts().to_vec();
    let result_before = session.result().cloned();

    assert!(session.reload_contracts(&UnavailableStore).is_err());
    assert!(session.create_contract(&UnavailableStore, &draft()).is_err());
    assert!(session.delete_contract(&UnavailableStore, contract_id).is_err());

    assert_eq!(session.contracts(), contracts_before.as_slice());
    assert_eq!(session.result().cloned(), result_before);
    assert_eq!(session.selected_contract().map(|c| c.id), Some(contract_id));
}

#[test]
fn reload_drops_a_selection_that_no_longer_exists() {
    let store = MemoryCatalogStore::new();
    let (mut session, contract_id, _) = staged_session(&store);
    store.delete_contract(contract_id).unwrap();

    assert_eq!(session.reload_contracts(&store).unwrap(), 0);
    assert!(session.selected_contract().is_none());
}

#[test]
fn export_projects_the_current_allocation() {
    let store = MemoryCatalogStore::new();
    let (mut session, _, _) = staged_session(&store);
    let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
    assert!(matches!(
        session.export(date, true),
        Err(SessionError::NoAllocation)
    ));

    session.compute();
    let bundle = session.export(date, true).expect("export");
    assert_eq!(bundle.sheets.len(), 3);
    assert_eq!(bundle.sheets[0].title, "Alpha");
    assert_eq!(
        bundle.consolidated.as_ref().map(|s| s.total()),
        Some(Money::from_cents(10000))
    );
}
