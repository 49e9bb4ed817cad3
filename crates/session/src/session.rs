use tracing::{info, warn};

use crate::error::SessionError;
use crate::storage::SessionStorage;
use crate::stores::{CameraStore, LandmarkImagesStore, LandmarksStore, PersistedStore, VcImagesStore};

/// The four stores of one annotation session bound to their storage.
///
/// Every `update_*` call persists the touched store once the mutation is done,
/// so storage always reflects the last completed action.
pub struct Session<S: SessionStorage> {
    storage: S,
    landmarks: LandmarksStore,
    landmark_images: LandmarkImagesStore,
    vc_images: VcImagesStore,
    camera: CameraStore,
}

impl<S: SessionStorage> Session<S> {
    /// Rehydrates every store from `storage` before anything can read them.
    ///
    /// Stores restore independently: an unreadable payload only resets its own store.
    pub fn restore(storage: S) -> Self {
        let landmarks = LandmarksStore::restore(&storage);
        let landmark_images = LandmarkImagesStore::restore(&storage);
        let vc_images = VcImagesStore::restore(&storage);
        let camera = CameraStore::restore(&storage);
        info!(
            landmarks = landmarks.collection().len(),
            images = landmark_images.images().len(),
            study = %vc_images.object_path(),
            "session restored"
        );
        Self {
            storage,
            landmarks,
            landmark_images,
            vc_images,
            camera,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn landmarks(&self) -> &LandmarksStore {
        &self.landmarks
    }

    pub fn landmark_images(&self) -> &LandmarkImagesStore {
        &self.landmark_images
    }

    pub fn vc_images(&self) -> &VcImagesStore {
        &self.vc_images
    }

    pub fn camera(&self) -> &CameraStore {
        &self.camera
    }

    pub fn update_landmarks<R>(
        &mut self,
        f: impl FnOnce(&mut LandmarksStore) -> R,
    ) -> Result<R, SessionError> {
        let out = f(&mut self.landmarks);
        persist(&self.landmarks, &mut self.storage)?;
        Ok(out)
    }

    pub fn update_landmark_images<R>(
        &mut self,
        f: impl FnOnce(&mut LandmarkImagesStore) -> R,
    ) -> Result<R, SessionError> {
        let out = f(&mut self.landmark_images);
        persist(&self.landmark_images, &mut self.storage)?;
        Ok(out)
    }

    pub fn update_vc_images<R>(
        &mut self,
        f: impl FnOnce(&mut VcImagesStore) -> R,
    ) -> Result<R, SessionError> {
        let out = f(&mut self.vc_images);
        persist(&self.vc_images, &mut self.storage)?;
        Ok(out)
    }

    pub fn update_camera<R>(
        &mut self,
        f: impl FnOnce(&mut CameraStore) -> R,
    ) -> Result<R, SessionError> {
        let out = f(&mut self.camera);
        persist(&self.camera, &mut self.storage)?;
        Ok(out)
    }

    /// Persists the landmarks after work that mutated shared landmarks
    /// outside an `update_*` call, such as an awaited triangulation.
    pub fn persist_landmarks(&mut self) -> Result<(), SessionError> {
        persist(&self.landmarks, &mut self.storage)
    }

    pub fn persist_all(&mut self) -> Result<(), SessionError> {
        persist(&self.landmarks, &mut self.storage)?;
        persist(&self.landmark_images, &mut self.storage)?;
        persist(&self.vc_images, &mut self.storage)?;
        persist(&self.camera, &mut self.storage)
    }

    /// Clears all four stores and persists the empty state.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.landmarks.reset();
        self.landmark_images.reset();
        self.vc_images.reset();
        self.camera.reset();
        self.persist_all()
    }
}

fn persist<T: PersistedStore>(store: &T, storage: &mut impl SessionStorage) -> Result<(), SessionError> {
    store.persist(storage).inspect_err(|err| {
        warn!(key = T::KEY, error = %err, "failed to persist store");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemorySessionStorage, JsonFileSessionStorage};
    use annotation::LandmarkImage;
    use foundation::math::{Position, Vec2};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn every_update_is_persisted() {
        let mut session = Session::restore(InMemorySessionStorage::new());
        session
            .update_camera(|c| c.set_latitude(10.0, -90.0, 90.0))
            .unwrap();
        let id = session
            .update_landmarks(|s| {
                let landmark = s.collection_mut().add_landmark("nasion", None);
                let id = landmark.read().id().to_string();
                id
            })
            .unwrap();

        let restored = Session::restore(session.into_storage());
        assert_eq!(restored.camera().latitude(), 10.0);
        assert!(restored.landmarks().collection().contains(&id));
    }

    #[test]
    fn full_session_survives_restart_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = Session::restore(JsonFileSessionStorage::open(&path).unwrap());
        let (a_id, b_id) = session
            .update_landmarks(|s| {
                let c = s.collection_mut();
                let a = c.add_landmark("a", None);
                let b = c.add_landmark("b", None);
                a.write().add_pose("img1", Vec2::new(10.0, 20.0));
                a.write().set_position(Some(Position::new(1.0, 2.0, 3.0)));
                c.add_distance(&a, &b);
                let ids = (a.read().id().to_string(), b.read().id().to_string());
                c.select(&ids.0);
                c.select(&ids.1);
                ids
            })
            .unwrap();
        session
            .update_landmark_images(|s| {
                s.add_image(LandmarkImage::new("img1", "/img1.jpg"));
                s.set_tab("img1");
            })
            .unwrap();
        drop(session);

        let restored = Session::restore(JsonFileSessionStorage::open(&path).unwrap());
        let c = restored.landmarks().collection();
        assert_eq!(c.selected_group().ids(), vec![a_id.clone(), b_id]);
        let a = c.get(&a_id).unwrap();
        assert!(Arc::ptr_eq(c.distances()[0].left(), a));
        assert_eq!(a.read().position(), Some(Position::new(1.0, 2.0, 3.0)));
        assert_eq!(restored.landmark_images().tab_name(), "img1");
    }

    #[test]
    fn corrupt_store_leaves_others_intact() {
        let mut session = Session::restore(InMemorySessionStorage::new());
        session
            .update_camera(|c| c.set_longitude(-30.0, 0.0, 360.0))
            .unwrap();
        session
            .update_landmarks(|s| {
                s.collection_mut().add_landmark("a", None);
            })
            .unwrap();
        let mut storage = session.into_storage();
        storage.set_item(LandmarksStore::KEY, "[[[").unwrap();

        let restored = Session::restore(storage);
        assert!(restored.landmarks().collection().is_empty());
        assert_eq!(restored.camera().longitude(), 30.0);
    }

    #[test]
    fn reset_clears_and_persists() {
        let mut session = Session::restore(InMemorySessionStorage::new());
        session
            .update_landmarks(|s| {
                s.collection_mut().add_landmark("a", None);
            })
            .unwrap();
        session
            .update_vc_images(|s| s.set_object_path("skull"))
            .unwrap();
        session.reset().unwrap();

        let restored = Session::restore(session.into_storage());
        assert!(restored.landmarks().collection().is_empty());
        assert_eq!(restored.vc_images().object_path(), crate::stores::DEFAULT_OBJECT_PATH);
    }
}
