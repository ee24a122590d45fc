use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type ContractId = i64;
pub type ItemId = i64;

/// A purchasable item owned by exactly one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Unit of measure label (kg, cx, un...).
    pub unit: String,
    pub unit_price: Money,
    /// Resource ids allowed to receive this item.
    #[serde(default)]
    pub eligible_resources: BTreeSet<String>,
}

impl Item {
    pub fn is_eligible(&self, resource_id: &str) -> bool {
        self.eligible_resources.contains(resource_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Contract {
    pub fn item(&self, item_id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_position(&self, item_id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == item_id)
    }
}

/// Row of the `contratos` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractHeader {
    pub id: ContractId,
    pub name: String,
}

/// An item that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub unit: String,
    pub unit_price: Money,
    #[serde(default)]
    pub eligible_resources: BTreeSet<String>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, unit_price: Money) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            unit_price,
            eligible_resources: BTreeSet::new(),
        }
    }

    pub fn with_eligible<I, S>(mut self, resource_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eligible_resources
            .extend(resource_ids.into_iter().map(Into::into));
        self
    }

    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            name: self.name,
            unit: self.unit,
            unit_price: self.unit_price,
            eligible_resources: self.eligible_resources,
        }
    }
}

impl From<&Item> for ItemDraft {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            unit: item.unit.clone(),
            unit_price: item.unit_price,
            eligible_resources: item.eligible_resources.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContractDraft {
    pub name: String,
    #[serde(default)]
    pub items: Vec<ItemDraft>,
}

impl ContractDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: ItemDraft) -> Self {
        self.items.push(item);
        self
    }
}

impl From<&Contract> for ContractDraft {
    fn from(contract: &Contract) -> Self {
        Self {
            name: contract.name.clone(),
            items: contract.items.iter().map(ItemDraft::from).collect(),
        }
    }
}

/// Serializes an eligibility set the way the `itens.recursos_elegiveis`
/// column stores it.
pub fn join_eligibility(resource_ids: &BTreeSet<String>) -> String {
    resource_ids
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn split_eligibility(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_split_ignores_blanks_and_whitespace() {
        let set = split_eligibility(" saude, ,educacao,saude ");
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["educacao".to_string(), "saude".to_string()]
        );
        assert!(split_eligibility("").is_empty());
    }

    #[test]
    fn eligibility_join_is_sorted() {
        let set: BTreeSet<String> = ["obras", "agricultura"].iter().map(|s| s.to_string()).collect();
        assert_eq!(join_eligibility(&set), "agricultura,obras");
    }
}
