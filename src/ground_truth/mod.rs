use std::path::{Path, PathBuf};

use anyhow::Result;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::util::write_json_pretty;

mod editor;

pub use editor::{
    BoreholeId, EditorSession, GroundwaterId, GroundwaterInput, LayerId, LayerInput,
    MoveDirection, SaveOutcome,
};

pub const GROUND_TRUTH_DIR: &str = "ground_truth";
pub const GROUND_TRUTH_SUFFIX: &str = "_ground_truth.json";

/// A numeric value as it appears in extracted predictions: a bare number, a
/// provenance wrapper `{"value": x, ...}`, or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NumericField {
    Raw(f64),
    Wrapped(f64),
    #[default]
    Absent,
}

impl NumericField {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Raw(value) | Self::Wrapped(value) => Some(*value),
            Self::Absent => None,
        }
    }

    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::Object(map)) => map
                .get("value")
                .and_then(json_number)
                .map_or(Self::Absent, Self::Wrapped),
            Some(other) => json_number(other).map_or(Self::Absent, Self::Raw),
        }
    }
}

fn json_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

impl Serialize for NumericField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Raw(value) => serializer.serialize_f64(*value),
            Self::Wrapped(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Self::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for NumericField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(Self::from_json(value.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MaterialDescription {
    Wrapped { text: String },
    Raw(String),
}

impl MaterialDescription {
    pub fn text(&self) -> &str {
        match self {
            Self::Wrapped { text } | Self::Raw(text) => text,
        }
    }
}

impl Default for MaterialDescription {
    fn default() -> Self {
        Self::Raw(String::new())
    }
}

impl<'de> Deserialize<'de> for MaterialDescription {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => Self::default(),
            Some(Value::Object(map)) => Self::Wrapped {
                text: map
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            Some(Value::String(text)) => Self::Raw(text),
            Some(other) => Self::Raw(other.to_string()),
        })
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<NumericField>, D::Error>
where
    D: Deserializer<'de>,
{
    NumericField::deserialize(deserializer).map(Some)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub boreholes: Vec<SourceBorehole>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBorehole {
    #[serde(default, deserialize_with = "null_as_default")]
    pub borehole_index: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: SourceMetadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub layers: Vec<SourceLayer>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub groundwater: Vec<SourceGroundwater>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub elevation: NumericField,
    #[serde(default, deserialize_with = "null_as_default")]
    pub coordinates: SourceCoordinates,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceCoordinates {
    #[serde(
        rename = "E",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub east: Option<NumericField>,
    #[serde(
        rename = "N",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub north: Option<NumericField>,
}

impl SourceCoordinates {
    /// True when either axis key appears in the source, even with a null value.
    pub fn is_present(&self) -> bool {
        self.east.is_some() || self.north.is_some()
    }

    pub fn east(&self) -> Option<f64> {
        self.east.and_then(|field| field.value())
    }

    pub fn north(&self) -> Option<f64> {
        self.north.and_then(|field| field.value())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceLayer {
    #[serde(default)]
    pub material_description: MaterialDescription,
    #[serde(
        default,
        alias = "depth_interval",
        deserialize_with = "null_as_default"
    )]
    pub depths: DepthRange,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    #[serde(default)]
    pub start: NumericField,
    #[serde(default)]
    pub end: NumericField,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceGroundwater {
    #[serde(default)]
    pub date: Value,
    #[serde(default)]
    pub depth: Value,
    #[serde(default)]
    pub elevation: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthBorehole {
    pub borehole_index: u32,
    pub layers: Vec<GroundTruthLayer>,
    pub groundwater: Vec<GroundTruthGroundwater>,
    pub metadata: GroundTruthMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthLayer {
    pub material_description: String,
    pub depth_interval: GroundTruthDepthInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthDepthInterval {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthGroundwater {
    pub date: Value,
    pub depth: Value,
    pub elevation: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GroundTruthCoordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthCoordinates {
    #[serde(rename = "E")]
    pub east: Option<f64>,
    #[serde(rename = "N")]
    pub north: Option<f64>,
}

/// Projects an extracted document onto the persisted ground-truth shape.
pub fn simplify(document: &SourceDocument) -> Vec<GroundTruthBorehole> {
    document.boreholes.iter().map(simplify_borehole).collect()
}

fn simplify_borehole(borehole: &SourceBorehole) -> GroundTruthBorehole {
    let layers = borehole
        .layers
        .iter()
        .map(|layer| GroundTruthLayer {
            material_description: layer.material_description.text().to_string(),
            depth_interval: GroundTruthDepthInterval {
                start: layer.depths.start.value(),
                end: layer.depths.end.value(),
            },
        })
        .collect();

    let groundwater = borehole
        .groundwater
        .iter()
        .map(|entry| GroundTruthGroundwater {
            date: entry.date.clone(),
            depth: entry.depth.clone(),
            elevation: entry.elevation.clone(),
        })
        .collect();

    let coordinates = &borehole.metadata.coordinates;
    let metadata = GroundTruthMetadata {
        elevation: borehole
            .metadata
            .elevation
            .value()
            .filter(|elevation| *elevation != 0.0),
        coordinates: coordinates
            .is_present()
            .then(|| GroundTruthCoordinates {
                east: coordinates.east(),
                north: coordinates.north(),
            }),
    };

    GroundTruthBorehole {
        borehole_index: borehole.borehole_index,
        layers,
        groundwater,
        metadata,
    }
}

pub fn ground_truth_file_name(document_name: &str) -> String {
    let stem = document_name.strip_suffix(".pdf").unwrap_or(document_name);
    format!("{stem}{GROUND_TRUTH_SUFFIX}")
}

pub fn ground_truth_path(output_dir: &Path, document_name: &str) -> PathBuf {
    output_dir
        .join(GROUND_TRUTH_DIR)
        .join(ground_truth_file_name(document_name))
}

pub fn write_ground_truth(
    output_dir: &Path,
    document_name: &str,
    boreholes: &[GroundTruthBorehole],
) -> Result<PathBuf> {
    let path = ground_truth_path(output_dir, document_name);
    let payload = IndexMap::from([(document_name, boreholes)]);
    write_json_pretty(&path, &payload)?;
    Ok(path)
}
