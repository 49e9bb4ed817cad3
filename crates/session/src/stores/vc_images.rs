use annotation::{VirtualCameraImage, nearest_image};
use foundation::math::LonLat;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{PersistedStore, f64_field, string_field};

/// Study loaded when nothing else was chosen.
pub const DEFAULT_OBJECT_PATH: &str = "geonemus-geoffroyii";

pub const LATITUDE_MIN: f64 = -90.0;
pub const LATITUDE_MAX: f64 = 90.0;

/// Catalogue of reference photographs of the current study and the one
/// currently displayed in the virtual-camera view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VcImagesStore {
    lat_min: f64,
    lat_max: f64,
    images: Vec<VirtualCameraImage>,
    object_path: String,
    selected_image: Option<String>,
    selected_image_name: Option<String>,
}

impl Default for VcImagesStore {
    fn default() -> Self {
        Self {
            lat_min: LATITUDE_MIN,
            lat_max: LATITUDE_MAX,
            images: Vec::new(),
            object_path: DEFAULT_OBJECT_PATH.to_string(),
            selected_image: None,
            selected_image_name: None,
        }
    }
}

impl VcImagesStore {
    pub fn images(&self) -> &[VirtualCameraImage] {
        &self.images
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    /// Switches study; the catalogue and selection of the previous one are dropped.
    pub fn set_object_path(&mut self, object_path: impl Into<String>) {
        let object_path = object_path.into();
        if object_path != self.object_path {
            *self = Self {
                object_path,
                ..Self::default()
            };
        }
    }

    /// Latitude range the camera may move in, in degrees.
    pub fn latitude_bounds(&self) -> (f64, f64) {
        (self.lat_min, self.lat_max)
    }

    pub fn selected_image(&self) -> Option<&str> {
        self.selected_image.as_deref()
    }

    pub fn selected_image_name(&self) -> Option<&str> {
        self.selected_image_name.as_deref()
    }

    /// Replaces the catalogue and narrows the latitude bounds to it.
    pub fn set_images(&mut self, images: Vec<VirtualCameraImage>) {
        let (lat_min, lat_max) = images
            .iter()
            .map(|i| i.latitude)
            .filter(|lat| lat.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, lat| match acc {
                Some((lo, hi)) => Some((lo.min(lat), hi.max(lat))),
                None => Some((lat, lat)),
            })
            .unwrap_or((LATITUDE_MIN, LATITUDE_MAX));
        self.lat_min = lat_min;
        self.lat_max = lat_max;
        self.images = images;
    }

    /// Displays the catalogue image closest to `orientation`.
    ///
    /// With an empty catalogue the current selection is kept.
    pub fn set_nearest_image(&mut self, orientation: LonLat) -> Option<&VirtualCameraImage> {
        let Some(best) = nearest_image(&self.images, orientation) else {
            debug!("no catalogue image at a finite angle, keeping selection");
            return None;
        };
        self.selected_image = Some(best.image.clone());
        self.selected_image_name = Some(best.name.clone());
        Some(best)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl PersistedStore for VcImagesStore {
    const KEY: &'static str = "vc_images";

    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    fn rehydrate(value: &Value) -> Self {
        let mut store = Self::default();
        let images = value
            .get("images")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|raw| match serde_json::from_value(raw.clone()) {
                Ok(image) => Some(image),
                Err(err) => {
                    warn!(error = %err, "unreadable catalogue image, skipping");
                    None
                }
            })
            .collect();
        store.images = images;
        store.lat_min = f64_field(value, "latMin").unwrap_or(LATITUDE_MIN);
        store.lat_max = f64_field(value, "latMax").unwrap_or(LATITUDE_MAX);
        if store.lat_min > store.lat_max {
            store.lat_min = LATITUDE_MIN;
            store.lat_max = LATITUDE_MAX;
        }
        if let Some(object_path) = string_field(value, "objectPath").filter(|p| !p.is_empty()) {
            store.object_path = object_path;
        }
        store.selected_image = string_field(value, "selectedImage");
        store.selected_image_name = string_field(value, "selectedImageName");
        store
    }
}
