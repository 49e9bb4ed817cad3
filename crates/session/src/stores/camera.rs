use foundation::math::{LonLat, wrap_into};
use serde::Serialize;
use serde_json::Value;

use super::{PersistedStore, f64_field};

pub const LONGITUDE_MIN: f64 = 0.0;
pub const LONGITUDE_MAX: f64 = 360.0;

/// Orientation of the virtual camera around the object, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CameraStore {
    longitude: f64,
    latitude: f64,
}

impl CameraStore {
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Rotates by `-movement` and wraps into `[min, max)`.
    pub fn set_longitude(&mut self, movement: f64, min: f64, max: f64) {
        self.longitude = wrap_into(self.longitude - movement, min, max);
    }

    /// Tilts by `movement`, clamped into `[min, max]`.
    pub fn set_latitude(&mut self, movement: f64, min: f64, max: f64) {
        self.latitude = (self.latitude + movement).max(min).min(max);
    }

    pub fn to_rad(&self) -> LonLat {
        LonLat::from_degrees(self.longitude, self.latitude)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl PersistedStore for CameraStore {
    const KEY: &'static str = "camera";

    fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    fn rehydrate(value: &Value) -> Self {
        Self {
            longitude: f64_field(value, "longitude").unwrap_or_default(),
            latitude: f64_field(value, "latitude").unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() <= 1e-9, "expected {a} ~= {b}");
    }

    #[test]
    fn longitude_wraps_both_ways() {
        let mut c = CameraStore::default();
        c.set_longitude(10.0, LONGITUDE_MIN, LONGITUDE_MAX);
        assert_close(c.longitude(), 350.0);
        c.set_longitude(-15.0, LONGITUDE_MIN, LONGITUDE_MAX);
        assert_close(c.longitude(), 5.0);
        c.set_longitude(-720.0, LONGITUDE_MIN, LONGITUDE_MAX);
        assert_close(c.longitude(), 5.0);
    }

    #[test]
    fn repeated_large_moves_stay_in_range() {
        let mut c = CameraStore::rehydrate(&json!({"longitude": 10.0, "latitude": 0.0}));
        for _ in 0..20 {
            c.set_longitude(400.0, 0.0, 360.0);
            assert!((0.0..360.0).contains(&c.longitude()), "{}", c.longitude());
        }
    }

    #[test]
    fn latitude_saturates_at_pole() {
        let mut c = CameraStore::rehydrate(&json!({"longitude": 0.0, "latitude": 80.0}));
        c.set_latitude(100.0, -90.0, 90.0);
        assert_eq!(c.latitude(), 90.0);
    }

    #[test]
    fn latitude_is_clamped() {
        let mut c = CameraStore::default();
        c.set_latitude(100.0, -90.0, 90.0);
        assert_eq!(c.latitude(), 90.0);
        c.set_latitude(-30.0, -20.0, 35.0);
        assert_eq!(c.latitude(), 35.0);
        c.set_latitude(-100.0, -20.0, 35.0);
        assert_eq!(c.latitude(), -20.0);
    }

    #[test]
    fn to_rad_converts_degrees() {
        let mut c = CameraStore::default();
        c.set_longitude(-90.0, LONGITUDE_MIN, LONGITUDE_MAX);
        c.set_latitude(45.0, -90.0, 90.0);
        let rad = c.to_rad();
        assert_close(rad.lon_rad, std::f64::consts::FRAC_PI_2);
        assert_close(rad.lat_rad, std::f64::consts::FRAC_PI_4);
        c.reset();
        assert_eq!(c, CameraStore::default());
    }

    #[test]
    fn restores_leniently() {
        let c = CameraStore::rehydrate(&json!({"longitude": 12.5, "latitude": null}));
        assert_eq!(c.longitude(), 12.5);
        assert_eq!(c.latitude(), 0.0);
        assert_eq!(CameraStore::rehydrate(&c.to_value().unwrap()), c);
    }
}
