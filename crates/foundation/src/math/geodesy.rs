/// A direction on the unit sphere around the studied object, in radians.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LonLat {
    pub lon_rad: f64,
    pub lat_rad: f64,
}

impl LonLat {
    pub fn new(lon_rad: f64, lat_rad: f64) -> Self {
        Self { lon_rad, lat_rad }
    }

    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self::new(lon_deg.to_radians(), lat_deg.to_radians())
    }

    pub fn lon_deg(self) -> f64 {
        self.lon_rad.to_degrees()
    }

    pub fn lat_deg(self) -> f64 {
        self.lat_rad.to_degrees()
    }
}

/// Central angle between two directions (spherical law of cosines), in radians.
///
/// The cosine is clamped to `[-1, 1]` so nearly identical directions yield `0`
/// instead of `NaN`.
pub fn central_angle(a: LonLat, b: LonLat) -> f64 {
    let sin_term = a.lat_rad.sin() * b.lat_rad.sin();
    let cos_term = a.lat_rad.cos() * b.lat_rad.cos() * (a.lon_rad - b.lon_rad).abs().cos();
    (sin_term + cos_term).clamp(-1.0, 1.0).acos()
}

/// Wraps `value` into `[min, max)`. An empty or inverted range returns `min`.
pub fn wrap_into(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if !(span > 0.0) || !value.is_finite() {
        return min;
    }
    let wrapped = (value - min).rem_euclid(span) + min;
    // rem_euclid can round up to `span` for tiny negative inputs.
    if wrapped >= max { min } else { wrapped }
}
