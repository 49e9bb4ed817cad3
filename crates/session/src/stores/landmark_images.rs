use annotation::LandmarkImage;
use serde_json::{Value, json};
use tracing::warn;

use super::PersistedStore;

/// Tab shown when no landmark image is selected.
pub const DEFAULT_TAB: &str = "viewer";

/// Reference images opened for annotation, one tab each.
#[derive(Debug, Default)]
pub struct LandmarkImagesStore {
    images: Vec<LandmarkImage>,
    selected: Option<usize>,
}

impl LandmarkImagesStore {
    pub fn images(&self) -> &[LandmarkImage] {
        &self.images
    }

    pub fn image(&self, name: &str) -> Option<&LandmarkImage> {
        self.images.iter().find(|i| i.name() == name)
    }

    pub fn image_mut(&mut self, name: &str) -> Option<&mut LandmarkImage> {
        self.images.iter_mut().find(|i| i.name() == name)
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn reset(&mut self) {
        self.images.clear();
        self.selected = None;
    }

    /// Selects the tab of image `name`; an unknown name selects the viewer.
    pub fn set_tab(&mut self, name: &str) {
        self.selected = self.images.iter().position(|i| i.name() == name);
    }

    pub fn tab_name(&self) -> &str {
        self.selected
            .and_then(|idx| self.images.get(idx))
            .map_or(DEFAULT_TAB, |i| i.name())
    }

    /// Returns `false` when an image with the same name is already open.
    pub fn add_image(&mut self, image: LandmarkImage) -> bool {
        if self.image(image.name()).is_some() {
            return false;
        }
        self.images.push(image);
        true
    }

    /// Closes the image at `index`. The selection keeps pointing at the same
    /// image, or falls back to the viewer if that image was closed.
    pub fn remove_image(&mut self, index: usize) -> Option<LandmarkImage> {
        if index >= self.images.len() {
            return None;
        }
        let removed = self.images.remove(index);
        self.selected = match self.selected {
            Some(sel) if sel == index => None,
            Some(sel) if sel > index => Some(sel - 1),
            other => other,
        };
        Some(removed)
    }

    /// Forgets every cached reprojection of landmark `id`.
    pub fn forget_landmark(&mut self, id: &str) {
        for image in &mut self.images {
            image.forget(id);
        }
    }
}

impl PersistedStore for LandmarkImagesStore {
    const KEY: &'static str = "landmarks_images";

    fn to_value(&self) -> serde_json::Result<Value> {
        let images = self
            .images
            .iter()
            .map(|i| serde_json::to_value(i.to_record()))
            .collect::<serde_json::Result<Vec<_>>>()?;
        let selected = self.selected.map_or(-1, |s| s as i64);
        Ok(json!({ "images": images, "selected": selected }))
    }

    fn rehydrate(value: &Value) -> Self {
        let mut store = Self::default();
        for record in value.get("images").and_then(Value::as_array).into_iter().flatten() {
            match LandmarkImage::rehydrate(record) {
                Some(image) => {
                    if !store.add_image(image) {
                        warn!("duplicate landmark image in snapshot, skipping");
                    }
                }
                None => warn!("landmark image record without name, skipping"),
            }
        }
        store.selected = value
            .get("selected")
            .and_then(Value::as_u64)
            .map(|s| s as usize)
            .filter(|&s| s < store.images.len());
        store
    }
}
