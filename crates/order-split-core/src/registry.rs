use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A department or unit that can receive part of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Stable key used in item eligibility lists and allocation results.
    pub id: String,
    /// Display name, also used as the export sheet title.
    pub name: String,
    /// Members of the priority tier receive the priority share first.
    #[serde(default)]
    pub priority: bool,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, priority: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("resource #{0} requires a non-empty id")]
    EmptyId(usize),
    #[error("resource id '{0}' contains a comma")]
    CommaInId(String),
    #[error("duplicate resource id '{0}'")]
    DuplicateId(String),
}

/// The fixed, ordered list of known resources.
///
/// Registry order is the tie-break order of the remainder rule and the order
/// of export sheets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Resource>", into = "Vec<Resource>")]
pub struct ResourceRegistry {
    resources: Vec<Resource>,
}

impl ResourceRegistry {
    pub fn new(resources: Vec<Resource>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::with_capacity(resources.len());
        for (idx, resource) in resources.iter().enumerate() {
            if resource.id.trim().is_empty() {
                return Err(RegistryError::EmptyId(idx));
            }
            // Ids are stored comma-joined in the items table.
            if resource.id.contains(',') {
                return Err(RegistryError::CommaInId(resource.id.clone()));
            }
            if !seen.insert(resource.id.as_str()) {
                return Err(RegistryError::DuplicateId(resource.id.clone()));
            }
        }
        Ok(Self { resources })
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.id == id)
    }

    /// Display name for `id`, falling back to the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|r| r.name.as_str()).unwrap_or(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.id.as_str())
    }

    /// Registry entries accepted by `filter`, in registry order.
    pub fn ordered_where<F>(&self, mut filter: F) -> Vec<&Resource>
    where
        F: FnMut(&Resource) -> bool,
    {
        self.resources.iter().filter(|r| filter(r)).collect()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self {
            resources: vec![
                Resource::new("saude", "Saúde", true),
                Resource::new("educacao", "Educação", true),
                Resource::new("assistencia", "Assistência Social", false),
                Resource::new("administracao", "Administração", false),
                Resource::new("obras", "Obras e Serviços Urbanos", false),
                Resource::new("agricultura", "Agricultura", false),
            ],
        }
    }
}

impl TryFrom<Vec<Resource>> for ResourceRegistry {
    type Error = RegistryError;

    fn try_from(value: Vec<Resource>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceRegistry> for Vec<Resource> {
    fn from(value: ResourceRegistry) -> Self {
        value.resources
    }
}
