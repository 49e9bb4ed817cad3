use std::time::Duration;

use annotation::{
    BoxFuture, LandmarkImage, PoseMap, Repository, RepositoryError, RepositoryResult, Shortcut,
    VirtualCameraImage,
};
use foundation::math::{Coordinates, Position};
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::protocol::{
    Envelope, ImagesResult, ReprojectRequest, ReprojectResult, ShortcutsResult,
    TriangulateRequest, TriangulateResult,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Repository`] backed by the photogrammetry HTTP server.
pub struct HttpRepository {
    base: Url,
    client: reqwest::Client,
}

impl HttpRepository {
    pub fn new(base_url: &str, timeout: Duration) -> RepositoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepositoryError::with_source("failed to build HTTP client", e))?;
        Self::with_client(base_url, client)
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> RepositoryResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| RepositoryError::with_source(format!("invalid server url {base_url}"), e))?;
        if base.cannot_be_a_base() {
            return Err(RepositoryError::new(format!("server url cannot be a base: {base_url}")));
        }
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Appends each segment percent-encoded, so names never leak into other routes.
    fn url(&self, segments: &[&str]) -> RepositoryResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RepositoryError::new(format!("server url cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> RepositoryResult<reqwest::Response> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RepositoryError::with_source(format!("GET {url} failed"), e))?;
        check_status(&url, resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> RepositoryResult<T> {
        let context = format!("invalid response from {url}");
        let envelope: Envelope<T> = self
            .get(url)
            .await?
            .json()
            .await
            .map_err(|e| RepositoryError::with_source(context, e))?;
        Ok(envelope.result)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> RepositoryResult<T> {
        debug!(%url, "POST");
        let resp = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| RepositoryError::with_source(format!("POST {url} failed"), e))?;
        let envelope: Envelope<T> = check_status(&url, resp)?
            .json()
            .await
            .map_err(|e| RepositoryError::with_source(format!("invalid response from {url}"), e))?;
        Ok(envelope.result)
    }
}

fn check_status(url: &Url, resp: reqwest::Response) -> RepositoryResult<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        warn!(%url, %status, "backend returned an error status");
        return Err(RepositoryError::new(format!("HTTP error from {url}: {status}")));
    }
    Ok(resp)
}

impl Repository for HttpRepository {
    fn get_images<'a>(
        &'a self,
        object_path: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<VirtualCameraImage>>> {
        Box::pin(async move {
            let result: ImagesResult = self.get_json(self.url(&[object_path, "images"])?).await?;
            Ok(result.images)
        })
    }

    fn get_image<'a>(
        &'a self,
        object_path: &'a str,
        image_name: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<LandmarkImage>> {
        Box::pin(async move {
            let url = self.url(&[object_path, image_name])?;
            let context = format!("invalid response from {url}");
            let image = self
                .get(url)
                .await?
                .text()
                .await
                .map_err(|e| RepositoryError::with_source(context, e))?;
            Ok(LandmarkImage::new(image_name, image))
        })
    }

    fn get_shortcuts<'a>(
        &'a self,
        object_path: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Shortcut>>> {
        Box::pin(async move {
            let result: ShortcutsResult =
                self.get_json(self.url(&[object_path, "shortcuts"])?).await?;
            Ok(result.commands)
        })
    }

    fn compute_reprojection<'a>(
        &'a self,
        object_path: &'a str,
        position: Position,
        image_name: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Coordinates>> {
        Box::pin(async move {
            let body = ReprojectRequest {
                position,
                image: image_name.to_string(),
            };
            let result: ReprojectResult = self
                .post_json(self.url(&[object_path, "reproject"])?, &body)
                .await?;
            Ok(result.pose)
        })
    }

    fn triangulate<'a>(
        &'a self,
        object_path: &'a str,
        poses: &'a PoseMap,
    ) -> BoxFuture<'a, RepositoryResult<Option<Position>>> {
        Box::pin(async move {
            let body = TriangulateRequest {
                study: object_path.to_string(),
                poses: poses.clone(),
            };
            let result: TriangulateResult = self
                .post_json(self.url(&[object_path, "triangulate"])?, &body)
                .await?;
            Ok(result.position)
        })
    }
}
