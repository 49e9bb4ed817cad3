//! Backend abstraction for the photogrammetry services.
//!
//! The annotation core never talks to the network directly. Everything it needs
//! from the backend goes through the [`Repository`] trait:
//! - listing the reference images of a study
//! - loading one image for annotation
//! - listing orientation shortcuts
//! - reprojecting a 3-D position into an image
//! - triangulating a position from poses
//!
//! Every call is asynchronous and fallible, and no ordering between concurrent
//! calls is assumed.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use foundation::math::{Coordinates, Position};
use tokio::sync::RwLock;

use crate::landmark::PoseMap;
use crate::landmark_image::LandmarkImage;
use crate::virtual_camera::{Shortcut, VirtualCameraImage};

/// Error type for repository operations.
#[derive(Debug)]
pub struct RepositoryError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl RepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Photogrammetry backend for one or more studies.
///
/// `object_path` names the study (the photographed object).
/// Methods return boxed futures for dyn-compatibility.
pub trait Repository: Send + Sync {
    fn get_images<'a>(&'a self, object_path: &'a str)
        -> BoxFuture<'a, RepositoryResult<Vec<VirtualCameraImage>>>;

    fn get_image<'a>(
        &'a self,
        object_path: &'a str,
        image_name: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<LandmarkImage>>;

    fn get_shortcuts<'a>(&'a self, object_path: &'a str)
        -> BoxFuture<'a, RepositoryResult<Vec<Shortcut>>>;

    fn compute_reprojection<'a>(
        &'a self,
        object_path: &'a str,
        position: Position,
        image_name: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Coordinates>>;

    /// Returns `Ok(None)` when the backend answered without a position.
    fn triangulate<'a>(
        &'a self,
        object_path: &'a str,
        poses: &'a PoseMap,
    ) -> BoxFuture<'a, RepositoryResult<Option<Position>>>;
}

/// How [`MemoryRepository`] answers triangulation requests.
#[derive(Debug, Clone)]
pub enum TriangulationReply {
    Position(Position),
    Empty,
    Fail(String),
}

/// In-memory repository for tests and offline sessions.
pub struct MemoryRepository {
    images: RwLock<HashMap<String, Vec<VirtualCameraImage>>>,
    shortcuts: RwLock<HashMap<String, Vec<Shortcut>>>,
    reprojections: RwLock<HashMap<String, Coordinates>>,
    triangulation: RwLock<TriangulationReply>,
    triangulate_calls: AtomicUsize,
    reprojection_calls: AtomicUsize,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self {
            images: RwLock::new(HashMap::new()),
            shortcuts: RwLock::new(HashMap::new()),
            reprojections: RwLock::new(HashMap::new()),
            triangulation: RwLock::new(TriangulationReply::Empty),
            triangulate_calls: AtomicUsize::new(0),
            reprojection_calls: AtomicUsize::new(0),
        }
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_images(&self, object_path: &str, images: Vec<VirtualCameraImage>) {
        self.images.write().await.insert(object_path.to_string(), images);
    }

    pub async fn set_shortcuts(&self, object_path: &str, shortcuts: Vec<Shortcut>) {
        self.shortcuts
            .write()
            .await
            .insert(object_path.to_string(), shortcuts);
    }

    /// Reprojection returned for `image_name`, whatever the position.
    pub async fn set_reprojection(&self, image_name: &str, pose: Coordinates) {
        self.reprojections
            .write()
            .await
            .insert(image_name.to_string(), pose);
    }

    pub async fn set_triangulation(&self, reply: TriangulationReply) {
        *self.triangulation.write().await = reply;
    }

    pub fn triangulate_calls(&self) -> usize {
        self.triangulate_calls.load(Ordering::SeqCst)
    }

    pub fn reprojection_calls(&self) -> usize {
        self.reprojection_calls.load(Ordering::SeqCst)
    }

    async fn find_image(&self, object_path: &str, image_name: &str) -> Option<VirtualCameraImage> {
        self.images
            .read()
            .await
            .get(object_path)?
            .iter()
            .find(|i| i.name == image_name)
            .cloned()
    }
}

impl Repository for MemoryRepository {
    fn get_images<'a>(
        &'a self,
        object_path: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<VirtualCameraImage>>> {
        Box::pin(async move {
            self.images
                .read()
                .await
                .get(object_path)
                .cloned()
                .ok_or_else(|| RepositoryError::new(format!("unknown study: {object_path}")))
        })
    }

    fn get_image<'a>(
        &'a self,
        object_path: &'a str,
        image_name: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<LandmarkImage>> {
        Box::pin(async move {
            let image = self
                .find_image(object_path, image_name)
                .await
                .ok_or_else(|| RepositoryError::new(format!("unknown image: {image_name}")))?;
            Ok(LandmarkImage::new(image.name, image.image))
        })
    }

    fn get_shortcuts<'a>(
        &'a self,
        object_path: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Shortcut>>> {
        Box::pin(async move {
            Ok(self
                .shortcuts
                .read()
                .await
                .get(object_path)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn compute_reprojection<'a>(
        &'a self,
        _object_path: &'a str,
        _position: Position,
        image_name: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Coordinates>> {
        Box::pin(async move {
            self.reprojection_calls.fetch_add(1, Ordering::SeqCst);
            self.reprojections
                .read()
                .await
                .get(image_name)
                .copied()
                .ok_or_else(|| RepositoryError::new(format!("no extrinsics for {image_name}")))
        })
    }

    fn triangulate<'a>(
        &'a self,
        _object_path: &'a str,
        _poses: &'a PoseMap,
    ) -> BoxFuture<'a, RepositoryResult<Option<Position>>> {
        Box::pin(async move {
            self.triangulate_calls.fetch_add(1, Ordering::SeqCst);
            match &*self.triangulation.read().await {
                TriangulationReply::Position(p) => Ok(Some(*p)),
                TriangulationReply::Empty => Ok(None),
                TriangulationReply::Fail(msg) => Err(RepositoryError::new(msg.clone())),
            }
        })
    }
}
