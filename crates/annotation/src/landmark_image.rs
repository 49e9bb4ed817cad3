use std::collections::BTreeMap;

use foundation::math::{Coordinates, Vec2};
use tracing::debug;

use crate::landmark::{Landmark, SharedLandmark};
use crate::repository::{Repository, RepositoryError};

/// Cached reprojection tagged with the landmark version that produced it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Reprojection {
    pub coordinates: Coordinates,
    pub version: u64,
}

/// A reference image opened for annotation.
///
/// Reprojections are never invalidated eagerly: an entry is valid only while
/// its recorded version equals the landmark's current version, which is
/// checked on every read.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkImage {
    name: String,
    image: String,
    zoom: f64,
    offset: Vec2,
    reprojections: BTreeMap<String, Reprojection>,
}

impl LandmarkImage {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            zoom: 1.0,
            offset: Vec2::default(),
            reprojections: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(
        name: String,
        image: String,
        zoom: f64,
        offset: Vec2,
        reprojections: BTreeMap<String, Reprojection>,
    ) -> Self {
        Self {
            name,
            image,
            zoom,
            offset,
            reprojections,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// All cache entries, valid or not.
    pub fn reprojections(&self) -> &BTreeMap<String, Reprojection> {
        &self.reprojections
    }

    /// Cached reprojection of `landmark`, if it is still current.
    pub fn reprojection(&self, landmark: &Landmark) -> Option<Coordinates> {
        self.reprojections
            .get(landmark.id())
            .filter(|r| r.version == landmark.version())
            .map(|r| r.coordinates)
    }

    pub fn is_stale(&self, landmark: &Landmark) -> bool {
        self.reprojection(landmark).is_none()
    }

    pub fn set_reprojection(&mut self, landmark_id: impl Into<String>, coordinates: Coordinates, version: u64) {
        self.reprojections.insert(
            landmark_id.into(),
            Reprojection {
                coordinates,
                version,
            },
        );
    }

    pub fn forget(&mut self, landmark_id: &str) -> bool {
        self.reprojections.remove(landmark_id).is_some()
    }

    /// Returns the current reprojection of `landmark`, asking the repository
    /// only when the cache is stale.
    ///
    /// `Ok(None)` when the landmark has no position to project.
    pub async fn refresh_reprojection(
        &mut self,
        repository: &dyn Repository,
        object_path: &str,
        landmark: &SharedLandmark,
    ) -> Result<Option<Coordinates>, RepositoryError> {
        let (id, version, position) = {
            let l = landmark.read();
            if let Some(cached) = self.reprojection(&l) {
                return Ok(Some(cached));
            }
            (l.id().to_string(), l.version(), l.position())
        };
        let Some(position) = position else {
            return Ok(None);
        };

        debug!(landmark = %id, image = %self.name, "reprojecting");
        let coordinates = repository
            .compute_reprojection(object_path, position, &self.name)
            .await?;
        self.set_reprojection(id, coordinates, version);
        Ok(Some(coordinates))
    }
}
