// src/upload.rs - Per-file upload tracking and concurrent transfer
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::api_client::ApiClient;
use crate::error::{ClientError, Result};
use crate::media::{validate_file, Validation};
use crate::models::{FileStatus, MediaFile};

/// Progress events keyed by file id; progress for different files never
/// crosses between entries.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Progress { file_id: String, percent: u8 },
    Uploaded { file_id: String, session_id: String },
    Failed { file_id: String, error: String },
}

pub struct UploadManager {
    client: ApiClient,
    files: Arc<RwLock<HashMap<String, MediaFile>>>,
    /// Registration order, so snapshots keep upload-selection order.
    order: Arc<RwLock<Vec<String>>>,
    events: Option<mpsc::UnboundedSender<UploadEvent>>,
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl UploadManager {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            files: Arc::new(RwLock::new(HashMap::new())),
            order: Arc::new(RwLock::new(Vec::new())),
            events: None,
        }
    }

    /// Attach an event sink for progress display.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<UploadEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    fn emit(&self, event: UploadEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }

    /// Validate a candidate file and admit it into the upload flow. Rejected
    /// files never reach the network.
    pub fn register(&self, path: &Path) -> Result<MediaFile> {
        let size = std::fs::metadata(path)?.len();
        let (kind, mime_type) = match validate_file(path, size) {
            Validation::Valid { kind, mime_type } => (kind, mime_type),
            Validation::Invalid { reason } => return Err(ClientError::Validation(reason)),
        };

        let file = MediaFile::new(path.to_path_buf(), size, mime_type, kind);
        write_lock(&self.order).push(file.id.clone());
        write_lock(&self.files).insert(file.id.clone(), file.clone());
        info!("Registered {} ({}, {} bytes)", file.name, file.kind, file.size);
        Ok(file)
    }

    /// Drop a file from the flow entirely.
    pub fn remove(&self, file_id: &str) {
        write_lock(&self.files).remove(file_id);
        write_lock(&self.order).retain(|id| id != file_id);
    }

    /// Transfer one registered file. On acceptance the file is marked
    /// `uploaded` and its session id stored; on any transport or backend
    /// failure it is marked `error`. No automatic retry.
    pub async fn upload(&self, file_id: &str) -> Result<String> {
        let file = read_lock(&self.files)
            .get(file_id)
            .cloned()
            .ok_or_else(|| ClientError::Validation(format!("unknown file id {}", file_id)))?;

        let progress_files = Arc::clone(&self.files);
        let progress_events = self.events.clone();
        let progress_id = file.id.clone();
        let on_progress = move |percent: u8| {
            if let Some(entry) = write_lock(&progress_files).get_mut(&progress_id) {
                entry.progress = percent;
            }
            if let Some(sender) = &progress_events {
                let _ = sender.send(UploadEvent::Progress {
                    file_id: progress_id.clone(),
                    percent,
                });
            }
        };

        match self
            .client
            .upload_file(&file.path, &file.mime_type, on_progress)
            .await
        {
            Ok(response) => {
                if let Some(entry) = write_lock(&self.files).get_mut(file_id) {
                    entry.status = FileStatus::Uploaded;
                    entry.progress = 100;
                    entry.session_id = Some(response.session_id.clone());
                }
                self.emit(UploadEvent::Uploaded {
                    file_id: file_id.to_string(),
                    session_id: response.session_id.clone(),
                });
                Ok(response.session_id)
            }
            Err(e) => {
                let message = e.to_string();
                error!("Upload failed for {}: {}", file.name, message);
                if let Some(entry) = write_lock(&self.files).get_mut(file_id) {
                    entry.status = FileStatus::Error;
                    entry.error = Some(message.clone());
                }
                self.emit(UploadEvent::Failed {
                    file_id: file_id.to_string(),
                    error: message,
                });
                Err(e)
            }
        }
    }

    /// Upload every registered file concurrently. Individual failures are
    /// recorded on their files; the call itself succeeds if at least the
    /// bookkeeping completed.
    pub async fn upload_all(&self) -> Vec<MediaFile> {
        let ids: Vec<String> = read_lock(&self.order).clone();
        let transfers = ids.iter().map(|id| self.upload(id));
        let _ = futures::future::join_all(transfers).await;
        self.snapshot()
    }

    /// Current file states in registration order.
    pub fn snapshot(&self) -> Vec<MediaFile> {
        let files = read_lock(&self.files);
        read_lock(&self.order)
            .iter()
            .filter_map(|id| files.get(id).cloned())
            .collect()
    }

    /// Files that made it through upload, in registration order.
    pub fn uploaded_files(&self) -> Vec<MediaFile> {
        self.snapshot()
            .into_iter()
            .filter(|f| matches!(f.status, FileStatus::Uploaded | FileStatus::Processing))
            .collect()
    }

    pub fn mark_processing(&self, file_id: &str) {
        if let Some(entry) = write_lock(&self.files).get_mut(file_id) {
            entry.status = FileStatus::Processing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manager() -> UploadManager {
        UploadManager::new(ApiClient::new("http://localhost:1".to_string()))
    }

    fn temp_media(dir: &tempfile::TempDir, name: &str, bytes: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&vec![0u8; bytes]).unwrap();
        path
    }

    #[test]
    fn register_accepts_valid_media() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_media(&dir, "clip.mp4", 1024);
        let m = manager();
        let file = m.register(&path).unwrap();
        assert_eq!(file.status, FileStatus::Uploading);
        assert_eq!(file.progress, 0);
        assert!(file.session_id.is_none());
        assert_eq!(m.snapshot().len(), 1);
    }

    #[test]
    fn register_rejects_invalid_media_before_any_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_media(&dir, "notes.txt", 16);
        let m = manager();
        match m.register(&path) {
            Err(ClientError::Validation(reason)) => {
                assert!(reason.contains("valid video or image"))
            }
            other => panic!("unexpected: {:?}", other.map(|f| f.name)),
        }
        assert!(m.snapshot().is_empty());
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager();
        let a = m.register(&temp_media(&dir, "a.mp4", 8)).unwrap();
        let b = m.register(&temp_media(&dir, "b.png", 8)).unwrap();
        let snapshot = m.snapshot();
        assert_eq!(snapshot[0].id, a.id);
        assert_eq!(snapshot[1].id, b.id);
    }

    #[test]
    fn remove_releases_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager();
        let file = m.register(&temp_media(&dir, "a.mp4", 8)).unwrap();
        m.remove(&file.id);
        assert!(m.snapshot().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_marks_file_error() {
        // Port 1 refuses connections, so the transfer fails at transport.
        let dir = tempfile::tempdir().unwrap();
        let m = manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let m = m.with_events(tx);
        let file = m.register(&temp_media(&dir, "clip.mp4", 64)).unwrap();

        let outcome = m.upload(&file.id).await;
        assert!(outcome.is_err());

        let snapshot = m.snapshot();
        assert_eq!(snapshot[0].status, FileStatus::Error);
        assert!(snapshot[0].error.is_some());
        assert!(m.uploaded_files().is_empty());

        // The failure event is keyed by the file id.
        let mut saw_failed = false;
        while let Ok(event) = rx.try_recv() {
            if let UploadEvent::Failed { file_id, .. } = event {
                assert_eq!(file_id, file.id);
                saw_failed = true;
            }
        }
        assert!(saw_failed);
    }
}
