// src/models.rs - Data structures shared across the client
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Kind of media accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Image => write!(f, "image"),
        }
    }
}

/// Lifecycle status of a local file during upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploading,
    Uploaded,
    Error,
    Processing,
}

/// One locally selected file moving through the upload flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub mime_type: String,
    pub kind: MediaKind,
    pub status: FileStatus,
    /// Closed interval [0, 100].
    pub progress: u8,
    pub session_id: Option<String>,
    pub error: Option<String>,
}

impl MediaFile {
    pub fn new(path: PathBuf, size: u64, mime_type: String, kind: MediaKind) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            path,
            size,
            mime_type,
            kind,
            status: FileStatus::Uploading,
            progress: 0,
            session_id: None,
            error: None,
        }
    }
}

/// A selectable logo catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logo {
    pub id: u32,
    pub name: String,
    pub selected: bool,
    pub icon: Option<String>,
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Backend JSON shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub session_id: String,
    pub filename: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Ready,
    Processing,
    Completed,
    Error,
    NotFound,
}

impl ProcessingState {
    /// Terminal states end the polling loop.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessingState::Completed | ProcessingState::Error | ProcessingState::NotFound
        )
    }
}

/// Body of `GET /processing-status/{session_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ProcessingState,
    pub session_id: String,
    #[serde(default)]
    pub result: Option<ProcessingResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub stage: Option<String>,
}

/// Per-brand aggregate statistics embedded in a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandStats {
    #[serde(default)]
    pub avg_score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub total_detections: Option<u32>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub total_seconds: Option<f64>,
}

/// Inline detection as embedded in a completed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineDetection {
    pub bbox: [f64; 4],
    pub confidence: f64,
    #[serde(default)]
    pub class_id: Option<i64>,
    pub class_name: String,
    #[serde(default)]
    pub frame_number: Option<u32>,
}

/// Final output of one processing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub file_id: i64,
    pub session_id: String,
    pub detections_count: u32,
    pub brands_detected: Vec<String>,
    #[serde(default)]
    pub statistics: Option<HashMap<String, BrandStats>>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub detections: Option<Vec<InlineDetection>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandRef {
    pub name: String,
}

/// One row of `GET /detections/{file_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: i64,
    pub file_id: i64,
    #[serde(default)]
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub brands: Option<BrandRef>,
    pub score: f64,
    /// Absolute pixels in the original media: [left, top, right, bottom].
    pub bbox: [f64; 4],
    #[serde(default)]
    pub t_start: Option<f64>,
    #[serde(default)]
    pub t_end: Option<f64>,
    #[serde(default)]
    pub frame: Option<u32>,
    #[serde(default)]
    pub frame_capture_url: Option<String>,
    #[serde(default)]
    pub frame_number: Option<u32>,
}

impl DetectionRecord {
    /// Brand name with the same fallback chain the results view uses:
    /// direct field, joined record, then positional lookup in the file's
    /// detected-brand list.
    pub fn resolve_brand<'a>(&'a self, brands_detected: &'a [String]) -> Option<&'a str> {
        if let Some(name) = self.brand_name.as_deref() {
            return Some(name);
        }
        if let Some(brands) = &self.brands {
            return Some(&brands.name);
        }
        if let Some(brand_id) = self.brand_id {
            let index = brand_id.checked_sub(1)? as usize;
            return brands_detected.get(index).map(String::as_str);
        }
        None
    }
}

/// One row of `GET /predictions/{file_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: i64,
    #[serde(default)]
    pub video_id: Option<i64>,
    #[serde(default)]
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub brands: Option<BrandRef>,
    #[serde(default)]
    pub total_detections: Option<u32>,
    #[serde(default)]
    pub avg_score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub total_seconds: Option<f64>,
    #[serde(default)]
    pub first_detection_time: Option<f64>,
    #[serde(default)]
    pub last_detection_time: Option<f64>,
}

impl PredictionRecord {
    pub fn brand_name(&self) -> &str {
        self.brands.as_ref().map(|b| b.name.as_str()).unwrap_or("Unknown")
    }

    /// Visible duration, with the legacy `total_seconds` field as fallback.
    pub fn visible_seconds(&self) -> Option<f64> {
        self.duration_seconds.or(self.total_seconds)
    }
}

/// One row of `GET /files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: i64,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    pub filename: String,
    pub file_type: MediaKind,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesResponse {
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionsResponse {
    pub detections: Vec<DetectionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<PredictionRecord>,
    /// File-level playback metadata, when the backend knows it.
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// Per-brand entries of `GET /heatmap/{file_id}/brands`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapBrandsResponse {
    #[serde(default)]
    pub brands: Vec<String>,
}
