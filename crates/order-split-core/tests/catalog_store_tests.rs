use order_split::{
    CatalogError, CatalogStore, ContractDraft, ItemDraft, MemoryCatalogStore, Money,
    import_catalog, load_catalog_from_json, load_contracts, save_catalog_to_json,
};

fn draft() -> ContractDraft {
    ContractDraft::new("Cesta Básica")
        .with_item(
            ItemDraft::new("Arroz", "kg", Money::from_cents(1000))
                .with_eligible(["saude", "educacao", "obras"]),
        )
        .with_item(
            ItemDraft::new("Feijão", "kg", Money::from_cents(735)).with_eligible(["saude"]),
        )
}

fn assert_round_trip(store: &dyn CatalogStore) {
    let created = store.create_contract_with_items(&draft()).expect("create");
    assert_eq!(created.items.len(), 2);

    let contracts = load_contracts(store).expect("load");
    assert_eq!(contracts.len(), 1);
    let loaded = &contracts[0];
    assert_eq!(loaded, &created);
    assert_eq!(loaded.items[1].unit_price, Money::from_cents(735));
    assert!(loaded.items[0].is_eligible("obras"));
    assert!(!loaded.items[1].is_eligible("obras"));
}

#[test]
fn memory_store_round_trips_contracts() {
    assert_round_trip(&MemoryCatalogStore::new());
}

#[test]
fn memory_store_delete_removes_items() {
    let store = MemoryCatalogStore::new();
    let created = store.create_contract_with_items(&draft()).unwrap();
    store.delete_contract(created.id).unwrap();
    assert!(store.list_contracts().unwrap().is_empty());
    assert!(store.list_items_for_contract(created.id).unwrap().is_empty());
    assert!(matches!(
        store.delete_contract(created.id),
        Err(CatalogError::ContractNotFound(_))
    ));
}

#[test]
fn invalid_drafts_are_not_stored() {
    let store = MemoryCatalogStore::new();
    let bad = ContractDraft::new("Sem recursos")
        .with_item(ItemDraft::new("Óleo", "un", Money::from_cents(899)));
    assert!(matches!(
        store.create_contract_with_items(&bad),
        Err(CatalogError::InvalidData(_))
    ));
    assert!(store.list_contracts().unwrap().is_empty());
}

#[test]
fn items_require_an_existing_contract() {
    let store = MemoryCatalogStore::new();
    let item = ItemDraft::new("Óleo", "un", Money::from_cents(899)).with_eligible(["saude"]);
    assert!(matches!(
        store.create_item(42, &item),
        Err(CatalogError::ContractNotFound(42))
    ));
}

#[test]
fn catalog_snapshot_imports_into_another_store() {
    let source = MemoryCatalogStore::new();
    source.create_contract_with_items(&draft()).unwrap();
    source
        .create_contract_with_items(&ContractDraft::new("Vazio"))
        .unwrap();
    let file = tempfile::NamedTempFile::new().expect("temp file");

    save_catalog_to_json(&source, file.path()).expect("save snapshot");
    let drafts = load_catalog_from_json(file.path()).expect("load snapshot");
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0], draft());

    let target = MemoryCatalogStore::new();
    let imported = import_catalog(&target, &drafts).expect("import");
    assert_eq!(imported.len(), 2);
    assert_eq!(load_contracts(&target).unwrap(), imported);
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use order_split::SqliteCatalogStore;
    use tempfile::NamedTempFile;

    #[test]
    fn sqlite_store_round_trips_contracts() {
        assert_round_trip(&SqliteCatalogStore::in_memory().unwrap());
    }

    #[test]
    fn sqlite_store_persists_to_disk() {
        let file = NamedTempFile::new().expect("temp db");
        let id = {
            let store = SqliteCatalogStore::new(file.path()).expect("open db");
            store.create_contract_with_items(&draft()).unwrap().id
        };
        let reopened = SqliteCatalogStore::new(file.path()).expect("reopen db");
        let items = reopened.list_items_for_contract(id).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Arroz");
        assert_eq!(items[0].unit_price, Money::from_cents(1000));
    }

    #[test]
    fn sqlite_delete_contract_cascades_to_items() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let created = store.create_contract_with_items(&draft()).unwrap();
        store.delete_contract(created.id).unwrap();
        assert!(store.list_contracts().unwrap().is_empty());
        assert!(store.list_items_for_contract(created.id).unwrap().is_empty());
    }

    #[test]
    fn sqlite_reports_missing_contracts() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        assert!(matches!(
            store.delete_contract(5),
            Err(CatalogError::ContractNotFound(5))
        ));
        let item = ItemDraft::new("Óleo", "un", Money::from_cents(899)).with_eligible(["saude"]);
        assert!(matches!(
            store.create_item(5, &item),
            Err(CatalogError::ContractNotFound(5))
        ));
    }

    #[test]
    fn sqlite_items_can_be_deleted_separately() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let created = store.create_contract_with_items(&draft()).unwrap();
        store.delete_items_for_contract(created.id).unwrap();
        assert!(store.list_items_for_contract(created.id).unwrap().is_empty());
        assert_eq!(store.list_contracts().unwrap().len(), 1);
    }
}
