use std::collections::BTreeMap;
use std::sync::Arc;

use foundation::Rgb;
use foundation::math::{Coordinates, Position};
use parking_lot::RwLock;

/// Poses of one landmark, keyed by image name.
pub type PoseMap = BTreeMap<String, Coordinates>;

/// Landmarks are shared between the collection, its distances and the
/// selected group; all of them must observe the same instance.
pub type SharedLandmark = Arc<RwLock<Landmark>>;

/// Version assigned to freshly created landmarks.
pub const INITIAL_VERSION: u64 = 1;

/// Minimum number of poses needed to triangulate a position.
pub const MIN_TRIANGULATION_POSES: usize = 2;

/// A physical feature marked across several photographs.
///
/// Invariants:
/// - `version` never decreases; every change that can invalidate a derived
///   position (pose edits, position set/reset) bumps it by exactly one.
/// - `position` is cleared whenever the pose set changes.
///
/// Landmarks are only constructed by [`crate::LandmarkCollection`], which owns
/// id uniqueness.
#[derive(Debug, Clone)]
pub struct Landmark {
    id: String,
    version: u64,
    label: String,
    poses: PoseMap,
    color: Rgb,
    position: Option<Position>,
    edit: bool,
    attached: bool,
}

impl Landmark {
    pub(crate) fn new(id: String, label: impl Into<String>, color: Option<Rgb>) -> Self {
        Self::from_parts(id, label, INITIAL_VERSION, color, PoseMap::new(), None)
    }

    pub(crate) fn from_parts(
        id: String,
        label: impl Into<String>,
        version: u64,
        color: Option<Rgb>,
        poses: PoseMap,
        position: Option<Position>,
    ) -> Self {
        let color = color.unwrap_or_else(|| Rgb::random(&mut rand::thread_rng()));
        Self {
            id,
            version,
            label: label.into(),
            poses,
            color,
            position,
            edit: false,
            attached: true,
        }
    }

    pub(crate) fn into_shared(self) -> SharedLandmark {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn color_hex(&self) -> String {
        self.color.to_hex()
    }

    pub fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    pub fn set_color_hex(&mut self, hex: &str) -> Result<(), foundation::ColorParseError> {
        self.color = Rgb::parse(hex)?;
        Ok(())
    }

    /// Ignored when fewer than three components are given.
    pub fn set_color_rgb(&mut self, components: &[u8]) {
        if let Some(color) = Rgb::from_components(components) {
            self.color = color;
        }
    }

    pub fn poses(&self) -> &PoseMap {
        &self.poses
    }

    pub fn pose(&self, image: &str) -> Option<Coordinates> {
        self.poses.get(image).copied()
    }

    /// Sets the pose for `image`. A changed pose set clears the position and
    /// bumps the version.
    pub fn add_pose(&mut self, image: impl Into<String>, pose: Coordinates) {
        let previous = self.poses.insert(image.into(), pose);
        if previous != Some(pose) {
            self.invalidate_position();
        }
    }

    pub fn remove_pose(&mut self, image: &str) -> Option<Coordinates> {
        let removed = self.poses.remove(image);
        if removed.is_some() {
            self.invalidate_position();
        }
        removed
    }

    /// Drops every pose and the position.
    pub fn reset_poses(&mut self) {
        self.poses.clear();
        self.invalidate_position();
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Assigns the position; the version is bumped even when clearing.
    pub fn set_position(&mut self, position: Option<Position>) {
        self.position = position;
        self.version += 1;
    }

    pub fn edit(&self) -> bool {
        self.edit
    }

    pub fn set_edit(&mut self, edit: bool) {
        self.edit = edit;
    }

    pub fn check_triangulation(&self) -> bool {
        self.poses.len() >= MIN_TRIANGULATION_POSES
    }

    /// `false` once the owning collection removed this landmark.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn detach(&mut self) {
        self.attached = false;
    }

    /// Identity comparison against a landmark, an id, or nothing.
    pub fn equals<K: LandmarkKey + ?Sized>(&self, other: &K) -> bool {
        other.landmark_id() == Some(self.id.as_str())
    }

    fn invalidate_position(&mut self) {
        self.position = None;
        self.version += 1;
    }
}

impl PartialEq for Landmark {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Landmark {}

impl PartialEq<str> for Landmark {
    fn eq(&self, other: &str) -> bool {
        self.id == other
    }
}

impl PartialEq<&str> for Landmark {
    fn eq(&self, other: &&str) -> bool {
        self.id == *other
    }
}

/// Anything a landmark can be compared with by identity.
pub trait LandmarkKey {
    fn landmark_id(&self) -> Option<&str>;
}

impl LandmarkKey for Landmark {
    fn landmark_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl LandmarkKey for str {
    fn landmark_id(&self) -> Option<&str> {
        Some(self)
    }
}

impl LandmarkKey for String {
    fn landmark_id(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: LandmarkKey + ?Sized> LandmarkKey for &T {
    fn landmark_id(&self) -> Option<&str> {
        (**self).landmark_id()
    }
}

impl<T: LandmarkKey> LandmarkKey for Option<T> {
    fn landmark_id(&self) -> Option<&str> {
        self.as_ref().and_then(|k| k.landmark_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::math::Vec2;

    fn landmark() -> Landmark {
        Landmark::new("abc".to_string(), "nasion", Some(Rgb::new(1, 2, 3)))
    }

    #[test]
    fn new_landmark_defaults() {
        let l = landmark();
        assert_eq!(l.version(), INITIAL_VERSION);
        assert!(l.poses().is_empty());
        assert_eq!(l.position(), None);
        assert!(!l.edit());
        assert!(l.is_attached());
        assert_eq!(l.color_hex(), "#010203");
    }

    #[test]
    fn check_triangulation_needs_two_poses() {
        let mut l = landmark();
        assert!(!l.check_triangulation());
        l.add_pose("img1", Vec2::new(1.0, 2.0));
        assert!(!l.check_triangulation());
        l.add_pose("img2", Vec2::new(3.0, 4.0));
        assert!(l.check_triangulation());
        assert_eq!(l.check_triangulation(), l.poses().len() >= 2);
    }

    #[test]
    fn set_position_and_reset_bump_version_once() {
        let mut l = landmark();
        l.set_position(Some(Position::new(1.0, 2.0, 3.0)));
        assert_eq!(l.version(), 2);
        l.set_position(None);
        assert_eq!(l.version(), 3);
        l.reset_poses();
        assert_eq!(l.version(), 4);
        assert!(l.poses().is_empty());
        assert_eq!(l.position(), None);
    }

    #[test]
    fn pose_edits_clear_position() {
        let mut l = landmark();
        l.add_pose("img1", Vec2::new(1.0, 2.0));
        l.add_pose("img2", Vec2::new(3.0, 4.0));
        l.set_position(Some(Position::new(1.0, 1.0, 1.0)));
        let before = l.version();

        l.add_pose("img3", Vec2::new(5.0, 6.0));
        assert_eq!(l.position(), None);
        assert_eq!(l.version(), before + 1);

        l.set_position(Some(Position::new(1.0, 1.0, 1.0)));
        let before = l.version();
        assert_eq!(l.remove_pose("img1"), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(l.position(), None);
        assert_eq!(l.version(), before + 1);
    }

    #[test]
    fn noop_pose_edits_keep_version() {
        let mut l = landmark();
        l.add_pose("img1", Vec2::new(1.0, 2.0));
        let v = l.version();
        l.add_pose("img1", Vec2::new(1.0, 2.0));
        assert_eq!(l.remove_pose("missing"), None);
        assert_eq!(l.version(), v);
    }

    #[test]
    fn equality_by_id_string_or_none() {
        let a = landmark();
        let mut b = Landmark::new("abc".to_string(), "other label", None);
        b.add_pose("img", Vec2::new(0.0, 0.0));
        let c = Landmark::new("xyz".to_string(), "nasion", None);

        assert!(a.equals(&b));
        assert!(!a.equals(&c));
        assert!(a.equals("abc"));
        assert!(a.equals(&"abc".to_string()));
        assert!(!a.equals(&None::<&Landmark>));
        assert!(a.equals(&Some(&b)));
        assert_eq!(a, b);
        assert!(a == "abc");
    }

    #[test]
    fn color_setters() {
        let mut l = landmark();
        l.set_color_rgb(&[9, 9]);
        assert_eq!(l.color(), Rgb::new(1, 2, 3));
        l.set_color_rgb(&[9, 8, 7]);
        assert_eq!(l.color(), Rgb::new(9, 8, 7));
        l.set_color_hex("#ffffff").unwrap();
        assert_eq!(l.color_hex(), "#FFFFFF");
        assert!(l.set_color_hex("nope").is_err());
        assert_eq!(l.color_hex(), "#FFFFFF");
    }
}
