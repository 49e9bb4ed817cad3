use std::collections::HashSet;
use std::sync::Arc;

use foundation::{Rgb, unique_id};
use tracing::debug;

use crate::distance::Distance;
use crate::landmark::{Landmark, SharedLandmark};
use crate::selection::SelectedGroup;

pub const DISTANCE_LABEL_PREFIX: &str = "distance_";

/// Canonical owner of the landmarks of one session.
///
/// This is the only place landmarks and distances are created, so it is the
/// single gate for id uniqueness and distance deduplication. Distances and the
/// selected group hold handles to the instances stored here.
#[derive(Debug, Default)]
pub struct LandmarkCollection {
    landmarks: Vec<SharedLandmark>,
    selected_group: SelectedGroup,
    distances: Vec<Distance>,
    /// Ids of removed landmarks; never handed out again.
    retired_ids: HashSet<String>,
}

impl LandmarkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn landmarks(&self) -> &[SharedLandmark] {
        &self.landmarks
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SharedLandmark> {
        self.landmarks.iter().find(|l| l.read().id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Fresh id not used by any current or removed landmark of this collection.
    pub fn generate_id(&self) -> String {
        unique_id(&mut rand::thread_rng(), |id| self.id_taken(id))
    }

    fn id_taken(&self, id: &str) -> bool {
        self.retired_ids.contains(id) || self.contains(id)
    }

    /// Creates a landmark with a fresh id; a random color is drawn when `color` is `None`.
    pub fn add_landmark(&mut self, label: impl Into<String>, color: Option<Rgb>) -> SharedLandmark {
        let landmark = Landmark::new(self.generate_id(), label, color).into_shared();
        self.landmarks.push(landmark.clone());
        landmark
    }

    /// Removes the landmark, its distances and its selection.
    ///
    /// The removed instance is marked detached so in-flight work bound to it
    /// can tell it no longer belongs to the session.
    pub fn remove_landmark(&mut self, id: &str) -> Option<SharedLandmark> {
        let idx = self.landmarks.iter().position(|l| l.read().id() == id)?;
        let removed = self.landmarks.remove(idx);
        removed.write().detach();
        self.retired_ids.insert(id.to_string());
        self.selected_group.remove(id);
        self.distances.retain(|d| !d.involves(id));
        Some(removed)
    }

    pub fn selected_group(&self) -> &SelectedGroup {
        &self.selected_group
    }

    /// Selects the landmark `id`. Returns `false` for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        let Some(landmark) = self.get(id).cloned() else {
            return false;
        };
        self.selected_group.add(landmark);
        true
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        self.selected_group.remove(id)
    }

    pub fn distances(&self) -> &[Distance] {
        &self.distances
    }

    pub fn distance(&self, label: &str) -> Option<&Distance> {
        self.distances.iter().find(|d| d.label() == label)
    }

    /// Adds a distance between two landmarks of this collection unless an
    /// equal (unordered) distance already exists.
    ///
    /// Returns `true` if a distance was inserted.
    pub fn add_distance(&mut self, left: &SharedLandmark, right: &SharedLandmark) -> bool {
        if Arc::ptr_eq(left, right) {
            debug!("distance rejected: both ends are the same landmark");
            return false;
        }
        if !self.owns(left) || !self.owns(right) {
            debug!("distance rejected: landmark not owned by this collection");
            return false;
        }
        let candidate = Distance::new(self.next_distance_label(), left.clone(), right.clone());
        self.insert_distance(candidate)
    }

    pub fn add_distance_by_id(&mut self, left_id: &str, right_id: &str) -> bool {
        let (Some(left), Some(right)) = (self.get(left_id).cloned(), self.get(right_id).cloned())
        else {
            return false;
        };
        self.add_distance(&left, &right)
    }

    /// Adds a distance between the two currently selected landmarks.
    pub fn add_selected_distance(&mut self) -> bool {
        let Some((left, right)) = self
            .selected_group
            .pair()
            .map(|(l, r)| (l.clone(), r.clone()))
        else {
            return false;
        };
        self.add_distance(&left, &right)
    }

    pub fn remove_distance(&mut self, label: &str) -> Option<Distance> {
        let idx = self.distances.iter().position(|d| d.label() == label)?;
        Some(self.distances.remove(idx))
    }

    /// `distance_<n>` with the smallest free `n`, starting at the current count.
    pub fn next_distance_label(&self) -> String {
        let mut n = self.distances.len();
        loop {
            let label = format!("{DISTANCE_LABEL_PREFIX}{n}");
            if self.distance(&label).is_none() {
                return label;
            }
            n += 1;
        }
    }

    pub fn reset(&mut self) {
        for landmark in self.landmarks.drain(..) {
            let mut landmark = landmark.write();
            landmark.detach();
            self.retired_ids.insert(landmark.id().to_string());
        }
        self.selected_group.clear();
        self.distances.clear();
    }

    /// Inserts a restored landmark; duplicate ids are refused.
    pub(crate) fn insert_landmark(&mut self, landmark: Landmark) -> Option<SharedLandmark> {
        if self.contains(landmark.id()) {
            return None;
        }
        let shared = landmark.into_shared();
        self.landmarks.push(shared.clone());
        Some(shared)
    }

    pub(crate) fn insert_distance(&mut self, distance: Distance) -> bool {
        if self.distances.iter().any(|d| d.equals(&distance)) {
            return false;
        }
        if self.distance(distance.label()).is_some() {
            let label = self.next_distance_label();
            self.distances
                .push(Distance::new(label, distance.left().clone(), distance.right().clone()));
            return true;
        }
        self.distances.push(distance);
        true
    }

    fn owns(&self, landmark: &SharedLandmark) -> bool {
        self.landmarks.iter().any(|l| Arc::ptr_eq(l, landmark))
    }
}

#[cfg(test)]
mod tests {
    use super::LandmarkCollection;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn generated_ids_are_unique() {
        let mut c = LandmarkCollection::new();
        for i in 0..50 {
            c.add_landmark(format!("l{i}"), None);
        }
        let ids: HashSet<String> = c.landmarks().iter().map(|l| l.read().id().to_string()).collect();
        assert_eq!(ids.len(), 50);
        assert!(!c.contains(&c.generate_id()));
    }

    #[test]
    fn add_distance_deduplicates_unordered_pairs() {
        let mut c = LandmarkCollection::new();
        let a = c.add_landmark("a", None);
        let b = c.add_landmark("b", None);
        let d = c.add_landmark("d", None);

        assert!(c.add_distance(&a, &b));
        assert!(!c.add_distance(&b, &a));
        assert!(!c.add_distance(&a, &b));
        assert!(c.add_distance(&a, &d));
        assert_eq!(c.distances().len(), 2);

        for (i, x) in c.distances().iter().enumerate() {
            for y in &c.distances()[i + 1..] {
                assert!(!x.equals(y));
            }
        }
        let labels: Vec<&str> = c.distances().iter().map(|d| d.label()).collect();
        assert_eq!(labels, vec!["distance_0", "distance_1"]);
    }

    #[test]
    fn add_distance_rejects_self_and_foreign_landmarks() {
        let mut c = LandmarkCollection::new();
        let a = c.add_landmark("a", None);
        let mut other = LandmarkCollection::new();
        let foreign = other.add_landmark("f", None);

        assert!(!c.add_distance(&a, &a));
        assert!(!c.add_distance(&a, &foreign));
        assert!(c.distances().is_empty());
    }

    #[test]
    fn distance_labels_stay_unique_after_removal() {
        let mut c = LandmarkCollection::new();
        let a = c.add_landmark("a", None);
        let b = c.add_landmark("b", None);
        let d = c.add_landmark("d", None);
        c.add_distance(&a, &b);
        c.add_distance(&a, &d);
        assert!(c.remove_distance("distance_0").is_some());
        assert!(c.add_distance(&b, &d));
        let labels: Vec<&str> = c.distances().iter().map(|d| d.label()).collect();
        assert_eq!(labels, vec!["distance_1", "distance_2"]);
    }

    #[test]
    fn remove_landmark_cascades() {
        let mut c = LandmarkCollection::new();
        let a = c.add_landmark("a", None);
        let b = c.add_landmark("b", None);
        let id_a = a.read().id().to_string();
        let id_b = b.read().id().to_string();
        c.select(&id_a);
        c.select(&id_b);
        c.add_distance(&a, &b);

        let removed = c.remove_landmark(&id_a).unwrap();
        assert!(Arc::ptr_eq(&removed, &a));
        assert!(!a.read().is_attached());
        assert!(c.distances().is_empty());
        assert_eq!(c.selected_group().ids(), vec![id_b]);
        assert!(c.remove_landmark(&id_a).is_none());
    }

    #[test]
    fn removed_ids_are_never_reissued() {
        let mut c = LandmarkCollection::new();
        let a = c.add_landmark("a", None);
        let b = c.add_landmark("b", None);
        let id_a = a.read().id().to_string();
        let id_b = b.read().id().to_string();

        c.remove_landmark(&id_a);
        assert!(!c.contains(&id_a));
        assert!(c.id_taken(&id_a));

        c.reset();
        assert!(c.is_empty());
        assert!(c.id_taken(&id_b));
        assert!(!c.id_taken("never-used"));
    }

    #[test]
    fn selected_pair_becomes_distance() {
        let mut c = LandmarkCollection::new();
        let a = c.add_landmark("a", None);
        let b = c.add_landmark("b", None);
        let (id_a, id_b) = (a.read().id().to_string(), b.read().id().to_string());
        assert!(!c.add_selected_distance());
        c.select(&id_a);
        c.select(&id_b);
        assert!(c.add_selected_distance());
        assert!(!c.add_selected_distance());
        assert!(!c.select("missing"));
    }
}
