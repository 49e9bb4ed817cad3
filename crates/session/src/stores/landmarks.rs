use annotation::LandmarkCollection;
use serde_json::Value;

use super::PersistedStore;

/// Landmarks, distances and the selected group of the session.
#[derive(Debug, Default)]
pub struct LandmarksStore {
    collection: LandmarkCollection,
}

impl LandmarksStore {
    pub fn collection(&self) -> &LandmarkCollection {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut LandmarkCollection {
        &mut self.collection
    }

    pub fn reset(&mut self) {
        self.collection.reset();
    }
}

impl PersistedStore for LandmarksStore {
    const KEY: &'static str = "landmarks";

    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self.collection.to_snapshot())
    }

    fn rehydrate(value: &Value) -> Self {
        Self {
            collection: LandmarkCollection::rehydrate(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemorySessionStorage, SessionStorage};
    use foundation::math::Vec2;
    use std::sync::Arc;

    #[test]
    fn restore_round_trip_keeps_references() {
        let mut store = LandmarksStore::default();
        let c = store.collection_mut();
        let a = c.add_landmark("a", None);
        let b = c.add_landmark("b", None);
        a.write().add_pose("img1", Vec2::new(1.0, 2.0));
        c.add_distance(&a, &b);

        let mut storage = InMemorySessionStorage::new();
        store.persist(&mut storage).unwrap();
        let restored = LandmarksStore::restore(&storage);

        let c = restored.collection();
        assert_eq!(c.len(), 2);
        let d = &c.distances()[0];
        assert!(Arc::ptr_eq(d.left(), &c.landmarks()[0]));
        assert!(Arc::ptr_eq(d.right(), &c.landmarks()[1]));
    }

    #[test]
    fn unreadable_payload_restores_empty() {
        let mut storage = InMemorySessionStorage::new();
        storage.set_item(LandmarksStore::KEY, "{ nope").unwrap();
        assert!(LandmarksStore::restore(&storage).collection().is_empty());
    }
}
