use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::error::EditError;
use crate::ground_truth::{
    DepthRange, GroundTruthBorehole, MaterialDescription, NumericField, SourceBorehole,
    SourceDocument, SourceGroundwater, SourceLayer, SourceMetadata, simplify, write_ground_truth,
};

macro_rules! entity_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(raw: &str) -> Result<Self> {
                let trimmed = raw.trim();
                let digits = trimmed
                    .strip_prefix($prefix)
                    .or_else(|| trimmed.strip_prefix(&$prefix.to_ascii_lowercase()))
                    .unwrap_or(trimmed);
                let value = digits
                    .parse::<u64>()
                    .with_context(|| format!("invalid {} reference: {raw:?}", $prefix))?;
                Ok(Self(value))
            }
        }
    };
}

entity_id!(BoreholeId, "B");
entity_id!(LayerId, "L");
entity_id!(GroundwaterId, "G");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerInput {
    pub start: String,
    pub end: String,
    pub material: String,
}

impl LayerInput {
    pub fn new(
        start: impl Into<String>,
        end: impl Into<String>,
        material: impl Into<String>,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            material: material.into(),
        }
    }

    fn validate(&self) -> Result<SourceLayer, EditError> {
        let start = parse_optional_number("start depth", &self.start)?;
        let end = parse_optional_number("end depth", &self.end)?;
        let material = self.material.trim();
        if material.is_empty() {
            return Err(EditError::MissingField {
                field: "material description",
            });
        }

        Ok(SourceLayer {
            material_description: MaterialDescription::Wrapped {
                text: material.to_string(),
            },
            depths: DepthRange {
                start: start.map_or(NumericField::Absent, NumericField::Wrapped),
                end: end.map_or(NumericField::Absent, NumericField::Wrapped),
            },
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundwaterInput {
    pub date: String,
    pub depth: String,
    pub elevation: String,
}

impl GroundwaterInput {
    pub fn new(
        date: impl Into<String>,
        depth: impl Into<String>,
        elevation: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            depth: depth.into(),
            elevation: elevation.into(),
        }
    }

    fn validate(&self) -> Result<SourceGroundwater, EditError> {
        let depth = parse_optional_number("depth", &self.depth)?;
        let elevation = parse_optional_number("elevation", &self.elevation)?;

        Ok(SourceGroundwater {
            date: Value::String(self.date.trim().to_string()),
            depth: depth.map_or(Value::Null, Value::from),
            elevation: elevation.map_or(Value::Null, Value::from),
        })
    }
}

fn parse_optional_number(field: &'static str, raw: &str) -> Result<Option<f64>, EditError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(EditError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditableLayer {
    pub id: LayerId,
    pub record: SourceLayer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditableGroundwater {
    pub id: GroundwaterId,
    pub record: SourceGroundwater,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditableBorehole {
    pub id: BoreholeId,
    pub borehole_index: u32,
    pub metadata: SourceMetadata,
    pub layers: Vec<EditableLayer>,
    pub groundwater: Vec<EditableGroundwater>,
}

/// In-memory borehole tree whose entries carry ids that stay valid across
/// structural edits; positions are only looked up when an edit is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditableDocument {
    boreholes: Vec<EditableBorehole>,
    next_id: u64,
}

impl EditableDocument {
    pub fn from_source(source: SourceDocument) -> Self {
        let mut document = Self::default();
        for borehole in source.boreholes {
            let id = BoreholeId(document.allocate());
            let layers = borehole
                .layers
                .into_iter()
                .map(|record| EditableLayer {
                    id: LayerId(document.allocate()),
                    record,
                })
                .collect();
            let groundwater = borehole
                .groundwater
                .into_iter()
                .map(|record| EditableGroundwater {
                    id: GroundwaterId(document.allocate()),
                    record,
                })
                .collect();
            document.boreholes.push(EditableBorehole {
                id,
                borehole_index: borehole.borehole_index,
                metadata: borehole.metadata,
                layers,
                groundwater,
            });
        }
        document
    }

    pub fn to_source(&self) -> SourceDocument {
        SourceDocument {
            boreholes: self
                .boreholes
                .iter()
                .map(|borehole| SourceBorehole {
                    borehole_index: borehole.borehole_index,
                    metadata: borehole.metadata.clone(),
                    layers: borehole
                        .layers
                        .iter()
                        .map(|layer| layer.record.clone())
                        .collect(),
                    groundwater: borehole
                        .groundwater
                        .iter()
                        .map(|entry| entry.record.clone())
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn boreholes(&self) -> &[EditableBorehole] {
        &self.boreholes
    }

    pub fn entry_count(&self) -> usize {
        self.boreholes
            .iter()
            .map(|borehole| borehole.layers.len() + borehole.groundwater.len())
            .sum()
    }

    pub fn layer(&self, id: LayerId) -> Option<&EditableLayer> {
        let (borehole, layer) = self.locate_layer(id).ok()?;
        Some(&self.boreholes[borehole].layers[layer])
    }

    pub fn groundwater(&self, id: GroundwaterId) -> Option<&EditableGroundwater> {
        let (borehole, entry) = self.locate_groundwater(id).ok()?;
        Some(&self.boreholes[borehole].groundwater[entry])
    }

    pub fn add_layer(
        &mut self,
        target: Option<BoreholeId>,
        input: &LayerInput,
    ) -> Result<LayerId, EditError> {
        let record = input.validate()?;
        let borehole = self.target_borehole(target)?;
        let id = LayerId(self.allocate());
        self.boreholes[borehole]
            .layers
            .push(EditableLayer { id, record });
        Ok(id)
    }

    pub fn edit_layer(&mut self, id: LayerId, input: &LayerInput) -> Result<(), EditError> {
        let record = input.validate()?;
        let (borehole, layer) = self.locate_layer(id)?;
        self.boreholes[borehole].layers[layer].record = record;
        Ok(())
    }

    pub fn delete_layer(&mut self, id: LayerId) -> Result<(), EditError> {
        let (borehole, layer) = self.locate_layer(id)?;
        self.boreholes[borehole].layers.remove(layer);
        Ok(())
    }

    /// Swaps the layer with its neighbour. Returns `false` when it already sits
    /// at the boundary in that direction.
    pub fn move_layer(&mut self, id: LayerId, direction: MoveDirection) -> Result<bool, EditError> {
        let (borehole, layer) = self.locate_layer(id)?;
        let layers = &mut self.boreholes[borehole].layers;

        let neighbour = match direction {
            MoveDirection::Up => layer.checked_sub(1),
            MoveDirection::Down => (layer + 1 < layers.len()).then_some(layer + 1),
        };
        let Some(neighbour) = neighbour else {
            return Ok(false);
        };

        layers.swap(layer, neighbour);
        Ok(true)
    }

    pub fn add_groundwater(
        &mut self,
        target: Option<BoreholeId>,
        input: &GroundwaterInput,
    ) -> Result<GroundwaterId, EditError> {
        let record = input.validate()?;
        let borehole = self.target_borehole(target)?;
        let id = GroundwaterId(self.allocate());
        self.boreholes[borehole]
            .groundwater
            .push(EditableGroundwater { id, record });
        Ok(id)
    }

    pub fn edit_groundwater(
        &mut self,
        id: GroundwaterId,
        input: &GroundwaterInput,
    ) -> Result<(), EditError> {
        let record = input.validate()?;
        let (borehole, entry) = self.locate_groundwater(id)?;
        self.boreholes[borehole].groundwater[entry].record = record;
        Ok(())
    }

    pub fn delete_groundwater(&mut self, id: GroundwaterId) -> Result<(), EditError> {
        let (borehole, entry) = self.locate_groundwater(id)?;
        self.boreholes[borehole].groundwater.remove(entry);
        Ok(())
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn target_borehole(&mut self, target: Option<BoreholeId>) -> Result<usize, EditError> {
        match target {
            Some(id) => self
                .boreholes
                .iter()
                .position(|borehole| borehole.id == id)
                .ok_or(EditError::UnknownBorehole(id)),
            None => {
                if self.boreholes.is_empty() {
                    let id = BoreholeId(self.allocate());
                    self.boreholes.push(EditableBorehole {
                        id,
                        borehole_index: 0,
                        metadata: SourceMetadata::default(),
                        layers: Vec::new(),
                        groundwater: Vec::new(),
                    });
                }
                Ok(0)
            }
        }
    }

    fn locate_layer(&self, id: LayerId) -> Result<(usize, usize), EditError> {
        self.boreholes
            .iter()
            .enumerate()
            .find_map(|(borehole_pos, borehole)| {
                borehole
                    .layers
                    .iter()
                    .position(|layer| layer.id == id)
                    .map(|layer_pos| (borehole_pos, layer_pos))
            })
            .ok_or(EditError::UnknownLayer(id))
    }

    fn locate_groundwater(&self, id: GroundwaterId) -> Result<(usize, usize), EditError> {
        self.boreholes
            .iter()
            .enumerate()
            .find_map(|(borehole_pos, borehole)| {
                borehole
                    .groundwater
                    .iter()
                    .position(|entry| entry.id == id)
                    .map(|entry_pos| (borehole_pos, entry_pos))
            })
            .ok_or(EditError::UnknownGroundwater(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unmodified,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    NothingToSave,
}

/// Editing context for one dataset document.
#[derive(Debug, Clone)]
pub struct EditorSession {
    document_name: String,
    document: EditableDocument,
    source_loaded: bool,
    state: SessionState,
}

impl EditorSession {
    pub fn new(document_name: impl Into<String>, source: Option<SourceDocument>) -> Self {
        let source_loaded = source.is_some();
        Self {
            document_name: document_name.into(),
            document: EditableDocument::from_source(source.unwrap_or_default()),
            source_loaded,
            state: SessionState::Unmodified,
        }
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn document(&self) -> &EditableDocument {
        &self.document
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_modified(&self) -> bool {
        self.state == SessionState::Modified
    }

    pub fn source_loaded(&self) -> bool {
        self.source_loaded
    }

    pub fn add_layer(
        &mut self,
        target: Option<BoreholeId>,
        input: &LayerInput,
    ) -> Result<LayerId, EditError> {
        let id = self.document.add_layer(target, input)?;
        self.mark_modified("add_layer");
        Ok(id)
    }

    pub fn edit_layer(&mut self, id: LayerId, input: &LayerInput) -> Result<(), EditError> {
        self.document.edit_layer(id, input)?;
        self.mark_modified("edit_layer");
        Ok(())
    }

    pub fn delete_layer(&mut self, id: LayerId) -> Result<(), EditError> {
        self.document.delete_layer(id)?;
        self.mark_modified("delete_layer");
        Ok(())
    }

    pub fn move_layer(&mut self, id: LayerId, direction: MoveDirection) -> Result<bool, EditError> {
        let moved = self.document.move_layer(id, direction)?;
        if moved {
            self.mark_modified("move_layer");
        }
        Ok(moved)
    }

    pub fn add_groundwater(
        &mut self,
        target: Option<BoreholeId>,
        input: &GroundwaterInput,
    ) -> Result<GroundwaterId, EditError> {
        let id = self.document.add_groundwater(target, input)?;
        self.mark_modified("add_groundwater");
        Ok(id)
    }

    pub fn edit_groundwater(
        &mut self,
        id: GroundwaterId,
        input: &GroundwaterInput,
    ) -> Result<(), EditError> {
        self.document.edit_groundwater(id, input)?;
        self.mark_modified("edit_groundwater");
        Ok(())
    }

    pub fn delete_groundwater(&mut self, id: GroundwaterId) -> Result<(), EditError> {
        self.document.delete_groundwater(id)?;
        self.mark_modified("delete_groundwater");
        Ok(())
    }

    pub fn simplified(&self) -> Vec<GroundTruthBorehole> {
        simplify(&self.document.to_source())
    }

    pub fn has_data(&self) -> bool {
        self.source_loaded || self.document.entry_count() > 0
    }

    pub fn save(&mut self, output_dir: &Path) -> Result<SaveOutcome> {
        if !self.is_modified() && !self.has_data() {
            return Ok(SaveOutcome::NothingToSave);
        }

        let path = write_ground_truth(output_dir, &self.document_name, &self.simplified())?;
        self.state = SessionState::Unmodified;
        Ok(SaveOutcome::Saved(path))
    }

    fn mark_modified(&mut self, operation: &'static str) {
        debug!(document = %self.document_name, operation, "ground truth modified");
        self.state = SessionState::Modified;
    }
}
