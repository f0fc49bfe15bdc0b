use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::electrode::{Electrode, Placement};
use crate::error::ConstructionError;
use crate::geometry::{Point, Polygon};

/// One named electrode of a peripheral template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateElectrode {
    pub id: String,
    #[serde(default)]
    pub origin: Point,
    pub polygon: Polygon,
}

/// A device definition (e.g. a reservoir) before it is placed on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeripheralTemplate {
    pub class: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub electrodes: Vec<TemplateElectrode>,
}

impl PeripheralTemplate {
    /// Display name used in diagnostics, `class/type`.
    pub fn name(&self) -> String {
        format!("{}/{}", self.class, self.kind)
    }

    /// Check electrode ids are unique and every polygon is a valid electrode.
    pub fn validate(&self) -> Result<(), ConstructionError> {
        if self.electrodes.is_empty() {
            return Err(ConstructionError::EmptyTemplate(self.name()));
        }
        let mut seen = BTreeSet::new();
        for e in &self.electrodes {
            if !seen.insert(e.id.as_str()) {
                return Err(ConstructionError::DuplicateElectrodeId {
                    template: self.name(),
                    id: e.id.clone(),
                });
            }
            e.polygon
                .validate()
                .map_err(|source| ConstructionError::InvalidElectrode {
                    template: self.name(),
                    id: e.id.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

/// An electrode of a placed peripheral, keyed by its symbolic id.
#[derive(Debug, Clone, PartialEq)]
pub struct PeripheralElectrode {
    pub id: String,
    pub electrode: Electrode,
}

/// A placed instance of a peripheral template.
#[derive(Debug, Clone, PartialEq)]
pub struct Peripheral {
    pub class: String,
    pub kind: String,
    /// Instance id, unique within a board.
    pub id: u32,
    pub placement: Placement,
    electrodes: Vec<PeripheralElectrode>,
}

impl Peripheral {
    pub fn new(
        class: &str,
        kind: &str,
        id: u32,
        placement: Placement,
        electrodes: Vec<PeripheralElectrode>,
    ) -> Self {
        Self {
            class: class.to_string(),
            kind: kind.to_string(),
            id,
            placement,
            electrodes,
        }
    }

    pub fn global_origin(&self) -> Point {
        self.placement.origin
    }

    /// Look up an electrode by its symbolic id (e.g. `"A"`).
    pub fn electrode(&self, id: &str) -> Option<&Electrode> {
        self.electrodes
            .iter()
            .find(|e| e.id == id)
            .map(|e| &e.electrode)
    }

    pub fn electrode_mut(&mut self, id: &str) -> Option<&mut Electrode> {
        self.electrodes
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| &mut e.electrode)
    }

    /// Electrodes in template order.
    pub fn electrodes(&self) -> &[PeripheralElectrode] {
        &self.electrodes
    }

    pub fn electrode_count(&self) -> usize {
        self.electrodes.len()
    }
}
