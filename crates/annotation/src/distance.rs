use crate::landmark::SharedLandmark;

/// A named measurement between two landmarks.
///
/// The endpoints are shared handles into the owning collection, never copies.
/// Equality ignores both the label and the endpoint order.
#[derive(Debug, Clone)]
pub struct Distance {
    label: String,
    left: SharedLandmark,
    right: SharedLandmark,
}

impl Distance {
    pub fn new(label: impl Into<String>, left: SharedLandmark, right: SharedLandmark) -> Self {
        Self {
            label: label.into(),
            left,
            right,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn left(&self) -> &SharedLandmark {
        &self.left
    }

    pub fn right(&self) -> &SharedLandmark {
        &self.right
    }

    pub fn left_id(&self) -> String {
        self.left.read().id().to_string()
    }

    pub fn right_id(&self) -> String {
        self.right.read().id().to_string()
    }

    /// `true` if either endpoint is the landmark `id`.
    pub fn involves(&self, id: &str) -> bool {
        self.left.read().id() == id || self.right.read().id() == id
    }

    /// Unordered endpoint equality.
    pub fn equals(&self, other: &Distance) -> bool {
        let (a, b) = (self.left_id(), self.right_id());
        let (c, d) = (other.left_id(), other.right_id());
        (a == c && b == d) || (a == d && b == c)
    }

    /// Euclidean length once both endpoints are triangulated.
    pub fn length(&self) -> Option<f64> {
        let left = self.left.read().position()?;
        let right = self.right.read().position()?;
        Some(left.distance(right))
    }
}

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}
