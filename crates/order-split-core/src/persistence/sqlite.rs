use super::{CatalogError, CatalogResult, CatalogStore};
use crate::catalog::{
    Contract, ContractDraft, ContractHeader, ContractId, Item, ItemDraft, ItemId,
    join_eligibility, split_eligibility,
};
use crate::money::round_currency;
use crate::validation;
use rusqlite::{Connection, params};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub struct SqliteCatalogStore {
    connection: Mutex<Connection>,
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> CatalogResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> CatalogResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> CatalogResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> CatalogResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS contratos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nome VARCHAR(255) NOT NULL
            );
            CREATE TABLE IF NOT EXISTS itens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                contrato_id INTEGER NOT NULL REFERENCES contratos(id) ON DELETE CASCADE,
                nome VARCHAR(255) NOT NULL,
                unidade VARCHAR(50) NOT NULL,
                valor_unitario DECIMAL(10, 2) NOT NULL,
                recursos_elegiveis TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn connection(&self) -> CatalogResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| CatalogError::Unavailable("sqlite mutex poisoned".into()))
    }

    fn contract_exists(conn: &Connection, contract_id: ContractId) -> CatalogResult<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM contratos WHERE id = ?1",
            params![contract_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert_item(
        conn: &Connection,
        contract_id: ContractId,
        item: &ItemDraft,
    ) -> CatalogResult<ItemId> {
        conn.execute(
            "INSERT INTO itens (contrato_id, nome, unidade, valor_unitario, recursos_elegiveis)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                contract_id,
                item.name,
                item.unit,
                item.unit_price.as_f64(),
                join_eligibility(&item.eligible_resources)
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn list_contracts(&self) -> CatalogResult<Vec<ContractHeader>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT id, nome FROM contratos ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(ContractHeader {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut contracts = Vec::new();
        for header in rows {
            contracts.push(header?);
        }
        Ok(contracts)
    }

    fn list_items_for_contract(&self, contract_id: ContractId) -> CatalogResult<Vec<Item>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, nome, unidade, valor_unitario, recursos_elegiveis
             FROM itens WHERE contrato_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![contract_id], |row| {
            let price: f64 = row.get(3)?;
            let eligible: String = row.get(4)?;
            Ok(Item {
                id: row.get(0)?,
                name: row.get(1)?,
                unit: row.get(2)?,
                unit_price: round_currency(price),
                eligible_resources: split_eligibility(&eligible),
            })
        })?;

        let mut items = Vec::new();
        for item in rows {
            items.push(item?);
        }
        Ok(items)
    }

    fn create_contract(&self, name: &str) -> CatalogResult<ContractId> {
        let conn = self.connection()?;
        conn.execute("INSERT INTO contratos (nome) VALUES (?1)", params![name])?;
        let id = conn.last_insert_rowid();
        info!(contract_id = id, name, "contract created");
        Ok(id)
    }

    fn create_item(&self, contract_id: ContractId, item: &ItemDraft) -> CatalogResult<ItemId> {
        validation::validate_item_draft(item, None)?;
        let conn = self.connection()?;
        if !Self::contract_exists(&conn, contract_id)? {
            return Err(CatalogError::ContractNotFound(contract_id));
        }
        Self::insert_item(&conn, contract_id, item)
    }

    fn delete_items_for_contract(&self, contract_id: ContractId) -> CatalogResult<()> {
        let conn = self.connection()?;
        conn.execute(
            "DELETE FROM itens WHERE contrato_id = ?1",
            params![contract_id],
        )?;
        Ok(())
    }

    fn delete_contract(&self, contract_id: ContractId) -> CatalogResult<()> {
        let conn = self.connection()?;
        let removed = conn.execute("DELETE FROM contratos WHERE id = ?1", params![contract_id])?;
        if removed == 0 {
            return Err(CatalogError::ContractNotFound(contract_id));
        }
        info!(contract_id, "contract deleted");
        Ok(())
    }

    /// Contract and items are written in one transaction.
    fn create_contract_with_items(&self, draft: &ContractDraft) -> CatalogResult<Contract> {
        validation::validate_contract_draft(draft, None)?;
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO contratos (nome) VALUES (?1)", params![draft.name])?;
        let contract_id = tx.last_insert_rowid();
        let mut items = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            let id = Self::insert_item(&tx, contract_id, item)?;
            items.push(item.clone().into_item(id));
        }
        tx.commit()?;
        info!(contract_id, items = items.len(), "contract created");
        Ok(Contract {
            id: contract_id,
            name: draft.name.clone(),
            items,
        })
    }
}
