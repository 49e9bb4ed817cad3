//! Triangulation orchestration.
//!
//! A triangulation attempt is an explicit future (or a spawned, abortable
//! [`TriangulationTask`]) that reports what happened to the landmark.
//!
//! Fencing rules:
//! - The landmark version is captured when the request is dispatched.
//! - The result is applied only if, when it arrives, the landmark is still
//!   attached to its collection and its version is unchanged.
//! - Otherwise the result is discarded and the landmark is left untouched.
//!
//! Remote failures are logged and returned; the landmark keeps its prior state.

use std::sync::{Arc, Weak};

use foundation::math::Position;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::landmark::{Landmark, SharedLandmark};
use crate::repository::{Repository, RepositoryError};

#[derive(Debug, Clone, PartialEq)]
pub enum TriangulationOutcome {
    /// Fewer than two poses: the position was cleared and no request was sent.
    Skipped,
    /// The returned position was stored; `version` is the landmark's new version.
    Applied { position: Position, version: u64 },
    /// The backend answered without a position; the landmark is unchanged.
    Unresolved,
    Discarded(DiscardReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The landmark was removed from its collection.
    Removed,
    /// The landmark changed while the request was in flight.
    Superseded { dispatched: u64, current: u64 },
}

#[derive(Debug)]
pub enum TriangulationError {
    Remote {
        landmark_id: String,
        source: RepositoryError,
    },
    Aborted {
        landmark_id: String,
        reason: String,
    },
}

impl std::fmt::Display for TriangulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriangulationError::Remote {
                landmark_id,
                source,
            } => write!(f, "triangulation of {landmark_id} failed: {source}"),
            TriangulationError::Aborted {
                landmark_id,
                reason,
            } => write!(f, "triangulation of {landmark_id} aborted: {reason}"),
        }
    }
}

impl std::error::Error for TriangulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TriangulationError::Remote { source, .. } => Some(source),
            TriangulationError::Aborted { .. } => None,
        }
    }
}

pub type TriangulationResult = Result<TriangulationOutcome, TriangulationError>;

/// Triangulates `landmark` from its poses and applies the result.
pub async fn triangulate_position(
    landmark: &SharedLandmark,
    repository: &dyn Repository,
    object_path: &str,
) -> TriangulationResult {
    run(Arc::downgrade(landmark), repository, object_path).await
}

/// Triangulates every landmark in order, collecting per-landmark results.
pub async fn triangulate_all(
    landmarks: &[SharedLandmark],
    repository: &dyn Repository,
    object_path: &str,
) -> Vec<(String, TriangulationResult)> {
    let mut results = Vec::with_capacity(landmarks.len());
    for landmark in landmarks {
        let id = landmark.read().id().to_string();
        results.push((id, triangulate_position(landmark, repository, object_path).await));
    }
    results
}

/// Handle to a triangulation running on the tokio runtime.
///
/// The task only holds a weak reference to the landmark.
pub struct TriangulationTask {
    landmark_id: String,
    handle: JoinHandle<TriangulationResult>,
}

impl TriangulationTask {
    pub fn landmark_id(&self) -> &str {
        &self.landmark_id
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> TriangulationResult {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => Err(TriangulationError::Aborted {
                landmark_id: self.landmark_id,
                reason: err.to_string(),
            }),
        }
    }
}

/// Spawns [`triangulate_position`] on the current tokio runtime.
pub fn spawn_triangulation(
    landmark: &SharedLandmark,
    repository: Arc<dyn Repository>,
    object_path: impl Into<String>,
) -> TriangulationTask {
    let landmark_id = landmark.read().id().to_string();
    let weak = Arc::downgrade(landmark);
    let object_path = object_path.into();
    let handle = tokio::spawn(async move { run(weak, repository.as_ref(), &object_path).await });
    TriangulationTask {
        landmark_id,
        handle,
    }
}

async fn run(
    landmark: Weak<RwLock<Landmark>>,
    repository: &dyn Repository,
    object_path: &str,
) -> TriangulationResult {
    let (id, dispatched, poses) = {
        let Some(shared) = landmark.upgrade() else {
            return Ok(TriangulationOutcome::Discarded(DiscardReason::Removed));
        };
        let mut l = shared.write();
        if !l.is_attached() {
            return Ok(TriangulationOutcome::Discarded(DiscardReason::Removed));
        }
        if !l.check_triangulation() {
            debug!(landmark = %l.id(), poses = l.poses().len(), "not enough poses, clearing position");
            l.set_position(None);
            return Ok(TriangulationOutcome::Skipped);
        }
        (l.id().to_string(), l.version(), l.poses().clone())
    };

    info!(landmark = %id, poses = poses.len(), study = %object_path, "triangulating");
    let position = match repository.triangulate(object_path, &poses).await {
        Ok(Some(position)) => position,
        Ok(None) => {
            warn!(landmark = %id, "triangulation returned no position");
            return Ok(TriangulationOutcome::Unresolved);
        }
        Err(source) => {
            error!(landmark = %id, error = %source, "triangulation failed");
            return Err(TriangulationError::Remote {
                landmark_id: id,
                source,
            });
        }
    };

    let Some(shared) = landmark.upgrade() else {
        warn!(landmark = %id, "landmark dropped during triangulation, discarding result");
        return Ok(TriangulationOutcome::Discarded(DiscardReason::Removed));
    };
    let mut l = shared.write();
    if !l.is_attached() {
        warn!(landmark = %id, "landmark removed during triangulation, discarding result");
        return Ok(TriangulationOutcome::Discarded(DiscardReason::Removed));
    }
    if l.version() != dispatched {
        let current = l.version();
        warn!(landmark = %id, dispatched, current, "landmark changed during triangulation, discarding result");
        return Ok(TriangulationOutcome::Discarded(DiscardReason::Superseded {
            dispatched,
            current,
        }));
    }
    l.set_position(Some(position));
    Ok(TriangulationOutcome::Applied {
        position,
        version: l.version(),
    })
}
