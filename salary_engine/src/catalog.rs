//! The catalog of salary components and structures.
//!
//! The catalog is the in-process stand-in for the backend's
//! component and structure tables.  It assigns ids, rejects
//! duplicate component codes and structures that point at unknown
//! components, and supports cloning.  Deleting a component that is
//! still referenced is allowed: referential checks belong to the
//! backend, and [`ComponentCatalog::audit`] reports the dangling
//! references afterwards.

use crate::error::CatalogError;
use crate::evaluator::{self, ValidationWarning};
use crate::models::{ComponentId, SalaryComponentDefinition, SalaryStructure, StructureId};
use crate::wire::Page;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const CLONE_SUFFIX: &str = "_CLONE";

/// Seed document for a catalog.  Either list may be a bare array or
/// a paginated backend response.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub components: Page<SalaryComponentDefinition>,
    #[serde(default)]
    pub structures: Page<SalaryStructure>,
}

#[derive(Debug, Clone)]
pub struct ComponentCatalog {
    components: BTreeMap<ComponentId, SalaryComponentDefinition>,
    structures: BTreeMap<StructureId, SalaryStructure>,
    next_id: u64,
}

impl Default for ComponentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
            structures: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Builds a catalog from a seed, keeping non-zero ids as given.
    pub fn from_seed(seed: CatalogSeed) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        catalog.next_id = seed
            .components
            .items
            .iter()
            .map(|component| component.id)
            .chain(seed.structures.items.iter().map(|structure| structure.id))
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| CatalogError::Invalid {
                field: "id",
                reason: format!("seed ids must be below {}", u64::MAX),
            })?;

        for mut component in seed.components.into_items() {
            validate_code(&component.code)?;
            catalog.ensure_code_free(&component.code, None)?;
            if component.id == 0 {
                component.id = catalog.allocate_id();
            } else if catalog.components.contains_key(&component.id) {
                return Err(CatalogError::DuplicateId {
                    kind: "component",
                    id: component.id,
                });
            }
            catalog.components.insert(component.id, component);
        }

        for mut structure in seed.structures.into_items() {
            catalog.ensure_components_exist(&structure)?;
            if structure.id == 0 {
                structure.id = catalog.allocate_id();
            } else if catalog.structures.contains_key(&structure.id) {
                return Err(CatalogError::DuplicateId {
                    kind: "structure",
                    id: structure.id,
                });
            }
            catalog.structures.insert(structure.id, structure);
        }

        tracing::info!(
            components = catalog.components.len(),
            structures = catalog.structures.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Self::from_seed(serde_json::from_str(json)?)
    }

    /// Loads a catalog seed from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn ensure_code_free(&self, code: &str, except: Option<ComponentId>) -> Result<(), CatalogError> {
        let taken = self
            .components
            .values()
            .any(|component| Some(component.id) != except && component.code.eq_ignore_ascii_case(code));
        if taken {
            Err(CatalogError::DuplicateCode {
                code: code.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn ensure_components_exist(&self, structure: &SalaryStructure) -> Result<(), CatalogError> {
        if structure.name.trim().is_empty() {
            return Err(CatalogError::Invalid {
                field: "name",
                reason: "structure name must not be empty".into(),
            });
        }
        let mut seen = BTreeSet::new();
        for entry in &structure.components {
            if !self.components.contains_key(&entry.component_id) {
                return Err(CatalogError::UnknownComponent {
                    id: entry.component_id,
                });
            }
            if !seen.insert(entry.component_id) {
                return Err(CatalogError::Invalid {
                    field: "components",
                    reason: format!("component {} is listed more than once", entry.component_id),
                });
            }
        }
        Ok(())
    }

    pub fn components(&self) -> impl Iterator<Item = &SalaryComponentDefinition> {
        self.components.values()
    }

    pub fn component(&self, id: ComponentId) -> Option<&SalaryComponentDefinition> {
        self.components.get(&id)
    }

    pub fn component_by_code(&self, code: &str) -> Option<&SalaryComponentDefinition> {
        self.components
            .values()
            .find(|component| component.code.eq_ignore_ascii_case(code))
    }

    pub fn create_component(
        &mut self,
        mut definition: SalaryComponentDefinition,
    ) -> Result<SalaryComponentDefinition, CatalogError> {
        validate_code(&definition.code)?;
        self.ensure_code_free(&definition.code, None)?;
        definition.id = self.allocate_id();
        tracing::info!(id = definition.id, code = %definition.code, "component created");
        self.components.insert(definition.id, definition.clone());
        Ok(definition)
    }

    pub fn update_component(
        &mut self,
        id: ComponentId,
        mut definition: SalaryComponentDefinition,
    ) -> Result<SalaryComponentDefinition, CatalogError> {
        if !self.components.contains_key(&id) {
            return Err(CatalogError::NotFound {
                kind: "component",
                id,
            });
        }
        validate_code(&definition.code)?;
        self.ensure_code_free(&definition.code, Some(id))?;
        definition.id = id;
        tracing::info!(id, code = %definition.code, "component updated");
        self.components.insert(id, definition.clone());
        Ok(definition)
    }

    pub fn delete_component(
        &mut self,
        id: ComponentId,
    ) -> Result<SalaryComponentDefinition, CatalogError> {
        let removed = self.components.remove(&id).ok_or(CatalogError::NotFound {
            kind: "component",
            id,
        })?;
        let referencing = self
            .structures
            .values()
            .filter(|structure| structure.components.iter().any(|entry| entry.component_id == id))
            .count();
        if referencing > 0 {
            tracing::warn!(id, code = %removed.code, referencing, "deleted component is still referenced by structures");
        } else {
            tracing::info!(id, code = %removed.code, "component deleted");
        }
        Ok(removed)
    }

    /// Copies a component under a new id and a new code.  The code
    /// gets a `_CLONE` suffix, numbered if that is already taken.
    pub fn clone_component(
        &mut self,
        id: ComponentId,
    ) -> Result<SalaryComponentDefinition, CatalogError> {
        let mut copy = self
            .components
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound {
                kind: "component",
                id,
            })?;

        let stem = format!("{}{}", copy.code, CLONE_SUFFIX);
        let mut code = stem.clone();
        let mut attempt = 2;
        while self.component_by_code(&code).is_some() {
            code = format!("{stem}_{attempt}");
            attempt += 1;
        }
        copy.code = code;
        copy.id = self.allocate_id();
        tracing::info!(source = id, id = copy.id, code = %copy.code, "component cloned");
        self.components.insert(copy.id, copy.clone());
        Ok(copy)
    }

    pub fn structures(&self) -> impl Iterator<Item = &SalaryStructure> {
        self.structures.values()
    }

    pub fn structure(&self, id: StructureId) -> Option<&SalaryStructure> {
        self.structures.get(&id)
    }

    pub fn create_structure(
        &mut self,
        mut structure: SalaryStructure,
    ) -> Result<SalaryStructure, CatalogError> {
        self.ensure_components_exist(&structure)?;
        structure.id = self.allocate_id();
        tracing::info!(id = structure.id, name = %structure.name, "structure created");
        self.structures.insert(structure.id, structure.clone());
        Ok(structure)
    }

    pub fn update_structure(
        &mut self,
        id: StructureId,
        mut structure: SalaryStructure,
    ) -> Result<SalaryStructure, CatalogError> {
        if !self.structures.contains_key(&id) {
            return Err(CatalogError::NotFound {
                kind: "structure",
                id,
            });
        }
        self.ensure_components_exist(&structure)?;
        structure.id = id;
        tracing::info!(id, name = %structure.name, "structure updated");
        self.structures.insert(id, structure.clone());
        Ok(structure)
    }

    pub fn delete_structure(&mut self, id: StructureId) -> Result<SalaryStructure, CatalogError> {
        let removed = self.structures.remove(&id).ok_or(CatalogError::NotFound {
            kind: "structure",
            id,
        })?;
        tracing::info!(id, name = %removed.name, "structure deleted");
        Ok(removed)
    }

    /// Copies a structure under a new id; every other field is kept.
    pub fn clone_structure(&mut self, id: StructureId) -> Result<SalaryStructure, CatalogError> {
        let mut copy = self
            .structures
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound {
                kind: "structure",
                id,
            })?;
        copy.id = self.allocate_id();
        tracing::info!(source = id, id = copy.id, "structure cloned");
        self.structures.insert(copy.id, copy.clone());
        Ok(copy)
    }

    /// Configuration problems across all structures.
    pub fn audit(&self) -> Vec<ValidationWarning> {
        self.structures
            .values()
            .flat_map(|structure| evaluator::audit_structure(self, structure))
            .collect()
    }
}

fn validate_code(code: &str) -> Result<(), CatalogError> {
    if code.trim().is_empty() {
        return Err(CatalogError::Invalid {
            field: "code",
            reason: "component code must not be empty".into(),
        });
    }
    Ok(())
}
