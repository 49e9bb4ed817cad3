use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 2-D pixel coordinates, serialized as `{ "x": .., "y": .. }`.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

/// A landmark pose inside one image.
pub type Coordinates = Vec2;

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// 3-D point in the object's calibration frame.
///
/// Serialized as a flat `[x, y, z]` list. Deserialization also accepts the
/// shapes a matrix-oriented solver produces: a column `[[x], [y], [z]]` and
/// homogeneous 4-vectors (divided through by `w`).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A triangulated landmark position.
pub type Position = Vec3;

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    pub fn as_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Interprets a flattened coordinate list (3 or homogeneous 4 components).
    pub fn from_components(components: &[f64]) -> Option<Self> {
        match *components {
            [x, y, z] => Some(Self::new(x, y, z)),
            [x, y, z, w] if w != 0.0 && w.is_finite() => Some(Self::new(x / w, y / w, z / w)),
            _ => None,
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Vec3Repr {
    Flat(Vec<f64>),
    Column(Vec<Vec<f64>>),
    Object { x: f64, y: f64, z: f64 },
}

impl Serialize for Vec3 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Vec3 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let components = match Vec3Repr::deserialize(deserializer)? {
            Vec3Repr::Flat(v) => v,
            Vec3Repr::Column(rows) => rows.into_iter().flatten().collect(),
            Vec3Repr::Object { x, y, z } => vec![x, y, z],
        };
        Vec3::from_components(&components).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "expected 3 or 4 (homogeneous) components, got {}",
                components.len()
            ))
        })
    }
}
