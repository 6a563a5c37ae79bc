// src/api_client.rs - HTTP client for the logo detection backend
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::multipart;
use reqwest::Client;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::models::{
    DetectionsResponse, FilesResponse, HealthResponse, HeatmapBrandsResponse,
    PredictionsResponse, StatusResponse, UploadResponse,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        warn!("Backend returned {}: {}", status, message);
        Err(ClientError::Backend { status, message })
    }

    /// Liveness check against `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        let health = Self::check(response).await?.json::<HealthResponse>().await?;
        info!(
            "Backend healthy: status={}, model_loaded={}",
            health.status, health.model_loaded
        );
        Ok(health)
    }

    /// Submit a file via multipart `POST /upload`, reporting transfer
    /// progress in [0,100] as the body is streamed out.
    pub async fn upload_file(
        &self,
        path: &Path,
        mime_type: &str,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
    ) -> Result<UploadResponse> {
        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        info!("Uploading {} ({} bytes) to {}/upload", file_name, total, self.base_url);

        let sent = Arc::new(AtomicU64::new(0));
        let on_progress = Arc::new(on_progress);
        let counting = {
            let sent = Arc::clone(&sent);
            let on_progress = Arc::clone(&on_progress);
            ReaderStream::new(file).map(move |chunk| {
                if let Ok(bytes) = &chunk {
                    let done = sent.fetch_add(bytes.len() as u64, Ordering::Relaxed)
                        + bytes.len() as u64;
                    let percent = if total == 0 {
                        100
                    } else {
                        ((done.saturating_mul(100)) / total).min(100) as u8
                    };
                    on_progress(percent);
                }
                chunk
            })
        };

        let part = multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(counting),
            total,
        )
        .file_name(file_name)
        .mime_str(mime_type)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let accepted = Self::check(response).await?.json::<UploadResponse>().await?;
        on_progress(100);
        info!("Upload accepted, session {}", accepted.session_id);
        Ok(accepted)
    }

    /// Trigger backend processing for an uploaded session.
    pub async fn start_processing(&self, session_id: &str) -> Result<()> {
        debug!("Starting processing for session {}", session_id);
        let response = self
            .client
            .post(format!("{}/start-processing/{}", self.base_url, session_id))
            .send()
            .await?;
        Self::check(response).await?;
        info!("Processing started for session {}", session_id);
        Ok(())
    }

    /// One status check against `GET /processing-status/{session_id}`.
    pub async fn processing_status(&self, session_id: &str) -> Result<StatusResponse> {
        let response = self
            .client
            .get(format!("{}/processing-status/{}", self.base_url, session_id))
            .send()
            .await?;
        let status = Self::check(response).await?.json::<StatusResponse>().await?;
        debug!("Session {} status: {:?}", session_id, status.status);
        Ok(status)
    }

    /// Drop the backend's cached status for a finished session.
    pub async fn clear_processing_status(&self, session_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/processing-status/{}", self.base_url, session_id))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// List all processed files.
    pub async fn files(&self) -> Result<FilesResponse> {
        let response = self
            .client
            .get(format!("{}/files", self.base_url))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Per-detection records for a processed file.
    pub async fn detections(&self, file_id: i64) -> Result<DetectionsResponse> {
        let response = self
            .client
            .get(format!("{}/detections/{}", self.base_url, file_id))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Per-brand aggregate statistics for a processed file.
    pub async fn predictions(&self, file_id: i64) -> Result<PredictionsResponse> {
        let response = self
            .client
            .get(format!("{}/predictions/{}", self.base_url, file_id))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Spatial heatmap imagery for a processed file, optionally narrowed to
    /// one brand. Returns the raw image bytes.
    pub async fn heatmap(&self, file_id: i64, brand: Option<&str>) -> Result<Vec<u8>> {
        let mut request = self
            .client
            .get(format!("{}/heatmap/{}", self.base_url, file_id));
        if let Some(brand) = brand {
            request = request.query(&[("brand", brand)]);
        }
        let response = request.send().await?;
        Ok(Self::check(response).await?.bytes().await?.to_vec())
    }

    /// Brands for which heatmaps exist for a processed file.
    pub async fn heatmap_brands(&self, file_id: i64) -> Result<HeatmapBrandsResponse> {
        let response = self
            .client
            .get(format!("{}/heatmap/{}/brands", self.base_url, file_id))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_normalized() {
        let client = ApiClient::new("http://localhost:8001/".to_string());
        assert_eq!(client.base_url(), "http://localhost:8001");
    }
}
