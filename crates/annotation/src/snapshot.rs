//! Plain-data snapshots of the annotation state and their restore.
//!
//! Snapshots serialize to the camelCase layout the session stores persist.
//! Restoring reads a `serde_json::Value` field by field: a malformed field
//! falls back to its neutral value and a malformed record is skipped, so a
//! restore never fails as a whole.
//!
//! Landmarks are restored first. Distances and the selected group only keep
//! ids in the snapshot and are re-resolved against the restored landmarks.

use std::collections::BTreeMap;

use foundation::Rgb;
use foundation::math::{Coordinates, Position, Vec2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::collection::LandmarkCollection;
use crate::distance::Distance;
use crate::landmark::{INITIAL_VERSION, Landmark, PoseMap};
use crate::landmark_image::{LandmarkImage, Reprojection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkRecord {
    pub id: String,
    pub label: String,
    pub version: u64,
    /// `#RRGGBB`.
    pub color: String,
    pub position: Option<Position>,
    pub poses: PoseMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceRecord {
    pub label: String,
    pub landmark_left: LandmarkRef,
    pub landmark_right: LandmarkRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedGroupRecord {
    /// Oldest first.
    pub deque: Vec<LandmarkRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkCollectionSnapshot {
    pub landmarks: Vec<LandmarkRecord>,
    pub selected_group: SelectedGroupRecord,
    pub distances: Vec<DistanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkImageRecord {
    pub name: String,
    pub image: String,
    pub zoom: f64,
    pub offset: Vec2,
    pub versions: BTreeMap<String, u64>,
    pub reprojections: BTreeMap<String, Coordinates>,
}

impl Landmark {
    pub fn to_record(&self) -> LandmarkRecord {
        LandmarkRecord {
            id: self.id().to_string(),
            label: self.label().to_string(),
            version: self.version(),
            color: self.color_hex(),
            position: self.position(),
            poses: self.poses().clone(),
        }
    }

    /// Restores one landmark; `None` when the record has no usable id.
    pub(crate) fn rehydrate(value: &Value) -> Option<Landmark> {
        let id = str_field(value, "id").filter(|id| !id.is_empty())?;
        let label = str_field(value, "label").unwrap_or_default();
        let version = value
            .get("version")
            .and_then(Value::as_u64)
            .unwrap_or(INITIAL_VERSION);
        let color = match str_field(value, "color").map(Rgb::parse) {
            Some(Ok(color)) => Some(color),
            Some(Err(err)) => {
                warn!(landmark = %id, error = %err, "unreadable landmark color, drawing a new one");
                None
            }
            None => None,
        };
        let position = value.get("position").and_then(parse::<Position>);
        let poses = value
            .get("poses")
            .and_then(Value::as_object)
            .map(|poses| {
                poses
                    .iter()
                    .filter_map(|(image, pose)| Some((image.clone(), parse::<Coordinates>(pose)?)))
                    .collect()
            })
            .unwrap_or_default();
        Some(Landmark::from_parts(
            id.to_string(),
            label,
            version,
            color,
            poses,
            position,
        ))
    }
}

impl LandmarkCollection {
    pub fn to_snapshot(&self) -> LandmarkCollectionSnapshot {
        LandmarkCollectionSnapshot {
            landmarks: self.landmarks().iter().map(|l| l.read().to_record()).collect(),
            selected_group: SelectedGroupRecord {
                deque: self
                    .selected_group()
                    .ids()
                    .into_iter()
                    .map(|id| LandmarkRef { id })
                    .collect(),
            },
            distances: self
                .distances()
                .iter()
                .map(|d| DistanceRecord {
                    label: d.label().to_string(),
                    landmark_left: LandmarkRef { id: d.left_id() },
                    landmark_right: LandmarkRef { id: d.right_id() },
                })
                .collect(),
        }
    }

    /// Rebuilds a collection from persisted data.
    ///
    /// Records that cannot be resolved are skipped with a warning.
    pub fn rehydrate(value: &Value) -> LandmarkCollection {
        let mut collection = LandmarkCollection::new();

        for record in array_field(value, "landmarks") {
            match Landmark::rehydrate(record) {
                Some(landmark) => {
                    let id = landmark.id().to_string();
                    if collection.insert_landmark(landmark).is_none() {
                        warn!(landmark = %id, "duplicate landmark id in snapshot, skipping");
                    }
                }
                None => warn!("landmark record without id, skipping"),
            }
        }

        for record in array_field(value, "distances") {
            let left = ref_id(record.get("landmarkLeft"));
            let right = ref_id(record.get("landmarkRight"));
            let (Some(left_id), Some(right_id)) = (left, right) else {
                warn!("distance record without endpoints, skipping");
                continue;
            };
            let (Some(left), Some(right)) = (
                collection.get(left_id).cloned(),
                collection.get(right_id).cloned(),
            ) else {
                warn!(left = %left_id, right = %right_id, "distance references unknown landmark, skipping");
                continue;
            };
            if left_id == right_id {
                warn!(landmark = %left_id, "distance between a landmark and itself, skipping");
                continue;
            }
            let label = str_field(record, "label")
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| collection.next_distance_label());
            collection.insert_distance(Distance::new(label, left, right));
        }

        for entry in selected_entries(value.get("selectedGroup")) {
            match ref_id(Some(entry)) {
                Some(id) if collection.select(id) => {}
                Some(id) => warn!(landmark = %id, "selected landmark not found, skipping"),
                None => warn!("unreadable selected group entry, skipping"),
            }
        }

        collection
    }
}

impl LandmarkImage {
    pub fn to_record(&self) -> LandmarkImageRecord {
        let reprojections = self.reprojections();
        LandmarkImageRecord {
            name: self.name().to_string(),
            image: self.image().to_string(),
            zoom: self.zoom(),
            offset: self.offset(),
            versions: reprojections
                .iter()
                .map(|(id, r)| (id.clone(), r.version))
                .collect(),
            reprojections: reprojections
                .iter()
                .map(|(id, r)| (id.clone(), r.coordinates))
                .collect(),
        }
    }

    /// Restores one image; `None` when the record has no name.
    ///
    /// Reprojections without a recorded version are dropped.
    pub fn rehydrate(value: &Value) -> Option<LandmarkImage> {
        let name = str_field(value, "name").filter(|name| !name.is_empty())?;
        let image = str_field(value, "image").unwrap_or_default();
        let zoom = value
            .get("zoom")
            .and_then(Value::as_f64)
            .filter(|z| z.is_finite() && *z > 0.0)
            .unwrap_or(1.0);
        let offset = value
            .get("offset")
            .and_then(parse::<Vec2>)
            .unwrap_or_default();

        let versions = value.get("versions").and_then(Value::as_object);
        let mut reprojections = BTreeMap::new();
        if let Some(entries) = value.get("reprojections").and_then(Value::as_object) {
            for (id, coordinates) in entries {
                let version = versions.and_then(|v| v.get(id)).and_then(Value::as_u64);
                match (version, parse::<Coordinates>(coordinates)) {
                    (Some(version), Some(coordinates)) => {
                        reprojections.insert(
                            id.clone(),
                            Reprojection {
                                coordinates,
                                version,
                            },
                        );
                    }
                    _ => warn!(image = %name, landmark = %id, "unusable cached reprojection, dropping"),
                }
            }
        }

        Some(LandmarkImage::from_parts(
            name.to_string(),
            image.to_string(),
            zoom,
            offset,
            reprojections,
        ))
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn parse<T: DeserializeOwned>(value: &Value) -> Option<T> {
    serde_json::from_value(value.clone()).ok()
}

/// Id of a `{ "id": .. }` reference or of a bare id string.
fn ref_id(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(id) => Some(id),
        other => str_field(other, "id"),
    }
}

/// Selected group entries, oldest first.
///
/// Accepts `{ "deque": [..] }`, `{ "deque": { "0": .., "1": .. } }` or a bare array.
fn selected_entries(value: Option<&Value>) -> Vec<&Value> {
    let deque = match value {
        Some(Value::Array(_)) => value,
        Some(other) => other.get("deque"),
        None => None,
    };
    match deque {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(items)) => {
            let mut indexed: Vec<(usize, &Value)> = items
                .iter()
                .filter_map(|(k, v)| Some((k.parse().ok()?, v)))
                .collect();
            indexed.sort_by_key(|(i, _)| *i);
            indexed.into_iter().map(|(_, v)| v).collect()
        }
        _ => Vec::new(),
    }
}
