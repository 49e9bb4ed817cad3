use std::collections::VecDeque;

use crate::landmark::SharedLandmark;

/// Maximum number of landmarks selected at once (the two ends of a distance).
pub const SELECTED_GROUP_CAPACITY: usize = 2;

/// Recency-ordered selection of at most [`SELECTED_GROUP_CAPACITY`] landmarks.
///
/// Ordering contract:
/// - Iteration yields the oldest selection first.
/// - Adding a new landmark at capacity evicts the oldest one.
/// - Adding a landmark that is already selected moves it to most-recent and
///   evicts nothing.
///
/// Restored state goes through [`SelectedGroup::add`] as well, so the same
/// rules hold for live and rehydrated groups.
#[derive(Debug, Clone, Default)]
pub struct SelectedGroup {
    deque: VecDeque<SharedLandmark>,
}

impl SelectedGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.deque.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    pub fn clear(&mut self) {
        self.deque.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position_of(id).is_some()
    }

    /// Selects `landmark` as most recent.
    ///
    /// Returns the evicted landmark, if any.
    pub fn add(&mut self, landmark: SharedLandmark) -> Option<SharedLandmark> {
        let id = landmark.read().id().to_string();
        if let Some(idx) = self.position_of(&id) {
            self.deque.remove(idx);
        }
        self.deque.push_back(landmark);
        if self.deque.len() > SELECTED_GROUP_CAPACITY {
            return self.deque.pop_front();
        }
        None
    }

    /// Returns `true` if the group changed.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.position_of(id) {
            Some(idx) => {
                self.deque.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedLandmark> + '_ {
        self.deque.iter()
    }

    /// Selected ids, oldest first.
    pub fn ids(&self) -> Vec<String> {
        self.deque.iter().map(|l| l.read().id().to_string()).collect()
    }

    /// The two selected landmarks (oldest first) once the group is full.
    pub fn pair(&self) -> Option<(&SharedLandmark, &SharedLandmark)> {
        match (self.deque.front(), self.deque.back()) {
            (Some(a), Some(b)) if self.deque.len() == SELECTED_GROUP_CAPACITY => Some((a, b)),
            _ => None,
        }
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.deque.iter().position(|l| l.read().id() == id)
    }
}
