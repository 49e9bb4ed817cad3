use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use annotation::{
    LandmarkCollection, Repository, TriangulationOutcome, spawn_triangulation, triangulate_position,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use foundation::math::{Position, Vec2};
use pretty_assertions::assert_eq;
use remote::HttpRepository;
use remote::protocol::{ReprojectRequest, TriangulateRequest};
use serde_json::json;

#[derive(Clone, Default)]
struct Backend {
    triangulate_calls: Arc<AtomicUsize>,
}

async fn triangulate(
    State(backend): State<Backend>,
    Path(study): Path<String>,
    Json(body): Json<TriangulateRequest>,
) -> Response {
    backend.triangulate_calls.fetch_add(1, Ordering::SeqCst);
    if study == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "calibration missing").into_response();
    }
    assert_eq!(body.study, study);
    if body.poses.len() < 2 {
        return Json(json!({"result": {}})).into_response();
    }
    Json(json!({"result": {"position": [[1.0], [2.0], [3.0]]}})).into_response()
}

async fn reproject(Json(body): Json<ReprojectRequest>) -> Response {
    let x = body.position.x * 10.0;
    Json(json!({"result": {"pose": {"x": x, "y": body.image.len() as f64}}})).into_response()
}

async fn images(Path(study): Path<String>) -> Response {
    Json(json!({"result": {"images": [
        {"name": format!("{study}_front.jpg"), "image": "data:image/jpeg;base64, AAA",
         "format": "jpeg", "width": 640, "height": 480, "longitude": 0.0, "latitude": -10.0},
        {"name": format!("{study}_side.jpg"), "image": "data:image/jpeg;base64, BBB",
         "format": "jpeg", "width": 640, "height": 480, "longitude": 90.0, "latitude": 20.0}
    ]}}))
    .into_response()
}

async fn shortcuts() -> Response {
    Json(json!({"result": {"commands": [
        {"name": "front", "longitude": 0.0, "latitude": 0.0},
        {"name": "top", "longitude": 0.0, "latitude": 90.0}
    ]}}))
    .into_response()
}

async fn image(Path((_study, name)): Path<(String, String)>) -> Response {
    if name == "missing.jpg" {
        return StatusCode::NOT_FOUND.into_response();
    }
    format!("data:image/jpeg;base64, {name}").into_response()
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/:study/triangulate", post(triangulate))
        .route("/:study/reproject", post(reproject))
        .route("/:study/images", get(images))
        .route("/:study/shortcuts", get(shortcuts))
        .route("/:study/:image", get(image))
        .with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), backend)
}

fn repository(base_url: &str) -> HttpRepository {
    HttpRepository::new(base_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn lists_images_and_shortcuts() {
    let (url, _) = spawn_backend().await;
    let repo = repository(&url);

    let images = repo.get_images("skull").await.unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[1].name, "skull_side.jpg");
    assert_eq!(images[1].width, Some(640));

    let shortcuts = repo.get_shortcuts("skull").await.unwrap();
    let names: Vec<&str> = shortcuts.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["front", "top"]);
}

#[tokio::test]
async fn fetches_single_image_as_data_url() {
    let (url, _) = spawn_backend().await;
    let repo = repository(&url);

    let image = repo.get_image("skull", "a.jpg").await.unwrap();
    assert_eq!(image.name(), "a.jpg");
    assert_eq!(image.image(), "data:image/jpeg;base64, a.jpg");
    assert_eq!(image.zoom(), 1.0);

    assert!(repo.get_image("skull", "missing.jpg").await.is_err());
}

#[tokio::test]
async fn image_names_with_reserved_characters_stay_one_segment() {
    let (url, _) = spawn_backend().await;
    let repo = repository(&url);

    let image = repo.get_image("skull", "front #2?.jpg").await.unwrap();
    assert_eq!(image.name(), "front #2?.jpg");
    assert_eq!(image.image(), "data:image/jpeg;base64, front #2?.jpg");

    // Would otherwise route to the catalogue listing.
    let image = repo.get_image("skull", "x/images").await.unwrap();
    assert_eq!(image.image(), "data:image/jpeg;base64, x/images");
}

#[tokio::test]
async fn reprojects_position() {
    let (url, _) = spawn_backend().await;
    let repo = repository(&url);
    let pose = repo
        .compute_reprojection("skull", Position::new(1.5, 0.0, 0.0), "abcd")
        .await
        .unwrap();
    assert_eq!(pose, Vec2::new(15.0, 4.0));
}

#[tokio::test]
async fn triangulation_round_trip_updates_landmark() {
    let (url, backend) = spawn_backend().await;
    let repo = repository(&url);

    let mut collection = LandmarkCollection::new();
    let landmark = collection.add_landmark("nasion", None);
    landmark.write().add_pose("img1", Vec2::new(10.0, 20.0));
    landmark.write().add_pose("img2", Vec2::new(30.0, 40.0));
    let before = landmark.read().version();

    let outcome = triangulate_position(&landmark, &repo, "skull").await.unwrap();
    assert_eq!(
        outcome,
        TriangulationOutcome::Applied {
            position: Position::new(1.0, 2.0, 3.0),
            version: before + 1,
        }
    );
    assert_eq!(landmark.read().position(), Some(Position::new(1.0, 2.0, 3.0)));
    assert_eq!(backend.triangulate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_error_leaves_landmark_untouched() {
    let (url, _) = spawn_backend().await;
    let repo: Arc<dyn Repository> = Arc::new(repository(&url));

    let mut collection = LandmarkCollection::new();
    let landmark = collection.add_landmark("nasion", None);
    landmark.write().add_pose("img1", Vec2::new(10.0, 20.0));
    landmark.write().add_pose("img2", Vec2::new(30.0, 40.0));
    let before = landmark.read().version();

    let task = spawn_triangulation(&landmark, repo, "broken");
    let err = task.join().await.unwrap_err();
    assert!(err.to_string().contains("500"), "{err}");
    assert_eq!(landmark.read().position(), None);
    assert_eq!(landmark.read().version(), before);
}

#[tokio::test]
async fn unreachable_backend_is_an_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let repo = repository(&format!("http://{addr}"));
    assert!(repo.get_images("skull").await.is_err());
}
