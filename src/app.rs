// src/app.rs - Top-level upload → select → process → results flow
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::brands::{self, logo_catalog};
use crate::error::{ClientError, Result};
use crate::models::{Logo, MediaFile, ProcessingResult, StatusResponse};
use crate::poller::ProcessingPoller;
use crate::report::FileMeta;

/// Steps of the top-level flow. `Results` returns to `Upload` only through
/// an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Upload,
    Select,
    Process,
    Results,
}

/// Terminal record for one session, success or failure.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Completed(ProcessingResult),
    Failed {
        session_id: String,
        file_name: String,
        message: String,
    },
}

impl SessionOutcome {
    pub fn session_id(&self) -> &str {
        match self {
            SessionOutcome::Completed(result) => &result.session_id,
            SessionOutcome::Failed { session_id, .. } => session_id,
        }
    }
}

/// The backend operations the processing step needs. A seam so the
/// sequential flow is testable without a live backend.
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    async fn start_processing(&self, session_id: &str) -> Result<()>;
    async fn poll_to_completion(
        &self,
        session_id: &str,
        cancel: &CancellationToken,
        on_status: &mut (dyn for<'a> FnMut(&'a StatusResponse) + Send),
    ) -> Result<ProcessingResult>;
    async fn clear_status(&self, session_id: &str) -> Result<()>;
}

#[async_trait]
impl ProcessingBackend for ApiClient {
    async fn start_processing(&self, session_id: &str) -> Result<()> {
        ApiClient::start_processing(self, session_id).await
    }

    async fn poll_to_completion(
        &self,
        session_id: &str,
        cancel: &CancellationToken,
        on_status: &mut (dyn for<'a> FnMut(&'a StatusResponse) + Send),
    ) -> Result<ProcessingResult> {
        let poller = ProcessingPoller::new(Arc::new(self.clone()));
        poller
            .poll_until_terminal(session_id, cancel, on_status)
            .await
    }

    async fn clear_status(&self, session_id: &str) -> Result<()> {
        ApiClient::clear_processing_status(self, session_id).await
    }
}

pub struct AppFlow<B: ProcessingBackend> {
    backend: Arc<B>,
    step: Step,
    logos: Vec<Logo>,
    results: Vec<SessionOutcome>,
    recorded_sessions: HashSet<String>,
    /// Index of the file currently being processed, while in `Process`.
    processing_index: Option<usize>,
    meta: HashMap<String, FileMeta>,
}

impl<B: ProcessingBackend> AppFlow<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            step: Step::Upload,
            logos: logo_catalog(),
            results: Vec::new(),
            recorded_sessions: HashSet::new(),
            processing_index: None,
            meta: HashMap::new(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn logos(&self) -> &[Logo] {
        &self.logos
    }

    pub fn results(&self) -> &[SessionOutcome] {
        &self.results
    }

    pub fn file_meta(&self) -> &HashMap<String, FileMeta> {
        &self.meta
    }

    pub fn processing_index(&self) -> Option<usize> {
        self.processing_index
    }

    /// Uploads are done; move to logo selection.
    pub fn begin_select(&mut self) {
        self.step = Step::Select;
    }

    /// Mark catalog entries matching the given names as selected and move to
    /// processing. Unknown names are logged and skipped; an empty selection
    /// means every detected brand counts.
    pub fn select_logos(&mut self, names: &[String]) {
        for name in names {
            let matched = self
                .logos
                .iter_mut()
                .filter(|logo| brands::names_match(&logo.name, name))
                .map(|logo| logo.selected = true)
                .count();
            if matched == 0 {
                warn!("No catalog logo matches '{}'", name);
            }
        }
        self.step = Step::Process;
    }

    pub fn toggle_brand(&mut self, brand_name: &str) {
        brands::toggle_brand(&mut self.logos, brand_name);
    }

    /// Append a completed result unless its session was already recorded.
    /// Returns whether the result was appended.
    pub fn record_result(&mut self, result: ProcessingResult) -> bool {
        if !self.recorded_sessions.insert(result.session_id.clone()) {
            info!(
                "Dropping duplicate result for session {}",
                result.session_id
            );
            return false;
        }
        self.results.push(SessionOutcome::Completed(result));
        true
    }

    /// Record a session's failure. Duplicates by session id are dropped.
    pub fn record_error(&mut self, session_id: &str, file_name: &str, message: String) -> bool {
        if !self.recorded_sessions.insert(session_id.to_string()) {
            return false;
        }
        self.results.push(SessionOutcome::Failed {
            session_id: session_id.to_string(),
            file_name: file_name.to_string(),
            message,
        });
        true
    }

    /// Process uploaded files strictly one at a time, in order. File N+1
    /// starts only after file N's terminal outcome is recorded. On a
    /// processing error the flow moves straight to `Results` and the
    /// remaining files are abandoned.
    pub async fn process_all(
        &mut self,
        files: &[MediaFile],
        cancel: &CancellationToken,
        mut on_status: impl FnMut(&MediaFile, &StatusResponse) + Send,
    ) -> Step {
        self.step = Step::Process;

        for (index, file) in files.iter().enumerate() {
            self.processing_index = Some(index);

            let Some(session_id) = file.session_id.clone() else {
                warn!("File {} has no session, skipping", file.name);
                continue;
            };
            self.meta.insert(
                session_id.clone(),
                FileMeta {
                    name: Some(file.name.clone()),
                    kind: Some(file.kind),
                },
            );

            let outcome = async {
                self.backend.start_processing(&session_id).await?;
                let mut forward = |status: &StatusResponse| on_status(file, status);
                self.backend
                    .poll_to_completion(&session_id, cancel, &mut forward)
                    .await
            }
            .await;

            match outcome {
                Ok(result) => {
                    self.record_result(result);
                    if let Err(e) = self.backend.clear_status(&session_id).await {
                        warn!("Could not clear status for {}: {}", session_id, e);
                    }
                }
                Err(e) => {
                    let message = match &e {
                        ClientError::Processing { message, .. } => message.clone(),
                        other => other.to_string(),
                    };
                    self.record_error(&session_id, &file.name, message);
                    // Remaining files are abandoned on the first failure.
                    self.step = Step::Results;
                    self.processing_index = None;
                    return self.step;
                }
            }
        }

        self.processing_index = None;
        self.step = Step::Results;
        self.step
    }

    /// Detected brands of all successful results that pass the current logo
    /// selection, in result order without duplicates.
    pub fn selected_brands(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for outcome in &self.results {
            if let SessionOutcome::Completed(result) = outcome {
                for brand in brands::filter_brands(&self.logos, &result.brands_detected) {
                    if seen.insert(brand.clone()) {
                        out.push(brand.clone());
                    }
                }
            }
        }
        out
    }

    /// Back to the first step, dropping all accumulated state.
    pub fn reset(&mut self) {
        self.step = Step::Upload;
        self.logos = logo_catalog();
        self.results.clear();
        self.recorded_sessions.clear();
        self.processing_index = None;
        self.meta.clear();
    }
}
