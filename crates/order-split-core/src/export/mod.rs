//! Shapes an allocation into spreadsheet rows: one sheet per resource and an
//! optional consolidated sheet. Cell styling and currency formatting belong to
//! whoever writes the file.

use crate::allocation::{AllocatedItem, AllocationResult, ResourceAllocation};
use crate::catalog::{Contract, ItemId};
use crate::money::{Money, line_total};
use crate::registry::ResourceRegistry;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub mod writer;

pub use writer::{save_export_to_json, write_sheets_to_csv};

pub const HEADER: [&str; 6] = [
    "#",
    "Item",
    "Unidade",
    "Quantidade",
    "Valor Unitário",
    "Valor Total",
];

pub const TOTAL_LABEL: &str = "TOTAL";
pub const CONSOLIDATED_TITLE: &str = "TOTAL GERAL";

const MONTHS_PT_BR: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Item,
    Total,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub kind: RowKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<usize>,
    pub item_name: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Money>,
    pub line_total: Money,
}

impl ExportRow {
    fn item(sequence_number: usize, allocated: &AllocatedItem) -> Self {
        Self {
            kind: RowKind::Item,
            sequence_number: Some(sequence_number),
            item_name: allocated.name.clone(),
            unit: allocated.unit.clone(),
            quantity: Some(allocated.quantity),
            unit_price: Some(allocated.unit_price),
            line_total: allocated.total_value,
        }
    }

    fn total(line_total: Money) -> Self {
        Self {
            kind: RowKind::Total,
            sequence_number: None,
            item_name: TOTAL_LABEL.to_string(),
            unit: String::new(),
            quantity: None,
            unit_price: None,
            line_total,
        }
    }
}

/// Rows for one resource, titled with its display name. The last row is
/// always the total row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSheet {
    pub resource_id: String,
    pub title: String,
    pub rows: Vec<ExportRow>,
}

impl ResourceSheet {
    pub fn item_rows(&self) -> impl Iterator<Item = &ExportRow> {
        self.rows.iter().filter(|row| row.kind == RowKind::Item)
    }

    pub fn total(&self) -> Money {
        self.rows
            .iter()
            .rev()
            .find(|row| row.kind == RowKind::Total)
            .map(|row| row.line_total)
            .unwrap_or(Money::ZERO)
    }
}

/// Everything a file writer needs for one workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub contract_name: String,
    pub file_stem: String,
    pub sheets: Vec<ResourceSheet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidated: Option<ResourceSheet>,
}

impl ExportBundle {
    pub fn new(
        result: &AllocationResult,
        contract: &Contract,
        registry: &ResourceRegistry,
        reference_date: NaiveDate,
        include_consolidated: bool,
    ) -> Self {
        Self {
            contract_name: contract.name.clone(),
            file_stem: export_file_stem(&contract.name, reference_date),
            sheets: project(result, contract, registry),
            consolidated: include_consolidated
                .then(|| project_consolidated(result, contract, registry)),
        }
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.file_stem, extension.trim_start_matches('.'))
    }

    pub fn all_sheets(&self) -> impl Iterator<Item = &ResourceSheet> {
        self.sheets.iter().chain(self.consolidated.iter())
    }
}

/// Resource ids of `result` in registry order; ids the registry does not
/// know come last, sorted.
fn ordered_resources<'a>(
    result: &'a AllocationResult,
    registry: &ResourceRegistry,
) -> Vec<(&'a str, &'a ResourceAllocation)> {
    let mut entries: Vec<_> = result.resources().collect();
    entries.sort_by_key(|(id, _)| (registry.position(id).unwrap_or(usize::MAX), *id));
    entries
}

/// Items of one resource in contract order; items the contract no longer
/// lists come last, by id.
fn ordered_items<'a>(
    allocation: &'a ResourceAllocation,
    contract: &Contract,
) -> Vec<(ItemId, &'a AllocatedItem)> {
    let mut entries: Vec<_> = allocation.items.iter().map(|(id, item)| (*id, item)).collect();
    entries.sort_by_key(|(id, _)| (contract.item_position(*id).unwrap_or(usize::MAX), *id));
    entries
}

/// One sheet per resource present in `result`.
pub fn project(
    result: &AllocationResult,
    contract: &Contract,
    registry: &ResourceRegistry,
) -> Vec<ResourceSheet> {
    ordered_resources(result, registry)
        .into_iter()
        .map(|(resource_id, allocation)| {
            let mut rows: Vec<ExportRow> = ordered_items(allocation, contract)
                .into_iter()
                .enumerate()
                .map(|(idx, (_, allocated))| ExportRow::item(idx + 1, allocated))
                .collect();
            rows.push(ExportRow::total(allocation.total_value));
            ResourceSheet {
                resource_id: resource_id.to_string(),
                title: registry.display_name(resource_id).to_string(),
                rows,
            }
        })
        .collect()
}

/// Merges items with the same name and unit price across all resources.
/// The trailing row carries the sum of the resource totals.
pub fn project_consolidated(
    result: &AllocationResult,
    contract: &Contract,
    registry: &ResourceRegistry,
) -> ResourceSheet {
    let mut merged: Vec<ExportRow> = Vec::new();
    for (_, allocation) in ordered_resources(result, registry) {
        for (_, allocated) in ordered_items(allocation, contract) {
            let existing = merged.iter_mut().find(|row| {
                row.item_name == allocated.name && row.unit_price == Some(allocated.unit_price)
            });
            match existing {
                Some(row) => {
                    let quantity = row.quantity.unwrap_or(0) + allocated.quantity;
                    row.quantity = Some(quantity);
                    row.line_total = line_total(allocated.unit_price, quantity);
                }
                None => merged.push(ExportRow::item(merged.len() + 1, allocated)),
            }
        }
    }
    let grand_total: Money = result.resources().map(|(_, alloc)| alloc.total_value).sum();
    merged.push(ExportRow::total(grand_total));
    ResourceSheet {
        resource_id: String::new(),
        title: CONSOLIDATED_TITLE.to_string(),
        rows: merged,
    }
}

/// `OUTUBRO DE 2026` for any date in October 2026.
pub fn month_year_label(date: NaiveDate) -> String {
    let month = MONTHS_PT_BR[date.month0() as usize];
    format!("{} de {}", month, date.year()).to_uppercase()
}

pub fn export_file_stem(contract_name: &str, reference_date: NaiveDate) -> String {
    format!(
        "PEDIDOS {} - {} - CONFERIR",
        contract_name.trim().to_uppercase(),
        month_year_label(reference_date)
    )
}

pub fn export_file_name(contract_name: &str, reference_date: NaiveDate, extension: &str) -> String {
    format!(
        "{}.{}",
        export_file_stem(contract_name, reference_date),
        extension.trim_start_matches('.')
    )
}
