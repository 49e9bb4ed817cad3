use foundation::math::{LonLat, central_angle};
use serde::{Deserialize, Serialize};

/// A reference photograph placed on the sphere of camera positions around the object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualCameraImage {
    pub name: String,
    /// Image locator (URL or data URL).
    pub image: String,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl VirtualCameraImage {
    pub fn new(name: impl Into<String>, image: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            latitude,
            longitude,
            format: None,
            width: None,
            height: None,
        }
    }

    pub fn direction(&self) -> LonLat {
        LonLat::from_degrees(self.longitude, self.latitude)
    }
}

/// A named camera orientation offered as a quick jump (degrees).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortcut {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// Catalogue image closest in angle to `orientation`.
///
/// Linear scan; the first strict minimum wins so ties keep the earlier image.
/// Candidates whose angle is not finite are never chosen, so `None` is returned
/// for an empty catalogue or a non-finite orientation.
pub fn nearest_image(images: &[VirtualCameraImage], orientation: LonLat) -> Option<&VirtualCameraImage> {
    let mut best: Option<(&VirtualCameraImage, f64)> = None;
    for image in images {
        let angle = central_angle(image.direction(), orientation);
        if !angle.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, best_angle)| angle < best_angle) {
            best = Some((image, angle));
        }
    }
    best.map(|(image, _)| image)
}
