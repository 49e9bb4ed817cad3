//! JSON bodies exchanged with the photogrammetry backend.
//!
//! Every response wraps its payload in `{ "result": .. }`.

use annotation::{PoseMap, Shortcut, VirtualCameraImage};
use foundation::math::{Coordinates, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub result: T,
}

/// `POST /{study}/triangulate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangulateRequest {
    pub study: String,
    pub poses: PoseMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangulateResult {
    /// Flat, column or homogeneous list; absent when the solver gave up.
    #[serde(default)]
    pub position: Option<Position>,
}

/// `POST /{study}/reproject`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReprojectRequest {
    pub position: Position,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReprojectResult {
    pub pose: Coordinates,
}

/// `GET /{study}/images`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagesResult {
    pub images: Vec<VirtualCameraImage>,
}

/// `GET /{study}/shortcuts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortcutsResult {
    pub commands: Vec<Shortcut>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::math::Vec2;
    use serde_json::json;

    #[test]
    fn triangulate_request_shape() {
        let mut poses = PoseMap::new();
        poses.insert("img1".into(), Vec2::new(10.0, 20.0));
        let body = serde_json::to_value(TriangulateRequest {
            study: "skull".into(),
            poses,
        })
        .unwrap();
        assert_eq!(body, json!({"study": "skull", "poses": {"img1": {"x": 10.0, "y": 20.0}}}));
    }

    #[test]
    fn triangulate_result_accepts_solver_shapes() {
        let column: Envelope<TriangulateResult> =
            serde_json::from_value(json!({"result": {"position": [[1.0], [2.0], [3.0]]}})).unwrap();
        assert_eq!(column.result.position, Some(Position::new(1.0, 2.0, 3.0)));

        let homogeneous: Envelope<TriangulateResult> =
            serde_json::from_value(json!({"result": {"position": [2.0, 4.0, 6.0, 2.0]}})).unwrap();
        assert_eq!(homogeneous.result.position, Some(Position::new(1.0, 2.0, 3.0)));

        let missing: Envelope<TriangulateResult> =
            serde_json::from_value(json!({"result": {}})).unwrap();
        assert_eq!(missing.result.position, None);
    }

    #[test]
    fn shortcuts_use_commands_key() {
        let parsed: Envelope<ShortcutsResult> = serde_json::from_value(json!({
            "result": {"commands": [{"name": "front", "longitude": 0.0, "latitude": 0.0}]}
        }))
        .unwrap();
        assert_eq!(parsed.result.commands[0].name, "front");
    }
}
