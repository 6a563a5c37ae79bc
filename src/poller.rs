// src/poller.rs - Processing status polling with exactly-once completion
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api_client::ApiClient;
use crate::error::{ClientError, Result};
use crate::models::{ProcessingResult, ProcessingState, StatusResponse};

/// Fixed period between successive status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Anything that can answer a status check for a session. The seam exists so
/// the polling loop is testable against scripted status sequences.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn processing_status(&self, session_id: &str) -> Result<StatusResponse>;
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn processing_status(&self, session_id: &str) -> Result<StatusResponse> {
        ApiClient::processing_status(self, session_id).await
    }
}

/// Terminal outcome of one polled session.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(ProcessingResult),
    Failed { message: String },
}

/// Latch guaranteeing the terminal outcome of a session is delivered exactly
/// once. Further terminal-looking responses after the first are swallowed.
/// Switching sessions re-arms the latch.
#[derive(Debug)]
pub struct CompletionLatch {
    session_id: String,
    completed: bool,
}

impl CompletionLatch {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            completed: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_latched(&self) -> bool {
        self.completed
    }

    /// Begin polling a different session from scratch.
    pub fn reset(&mut self, session_id: impl Into<String>) {
        self.session_id = session_id.into();
        self.completed = false;
    }

    /// Observe one poll response. Returns the terminal outcome the first
    /// time a terminal state is seen, and `None` for every response after
    /// the latch is set or while processing continues.
    pub fn observe(&mut self, response: &StatusResponse) -> Option<PollOutcome> {
        if self.completed {
            debug!(
                "Session {} already completed, dropping duplicate {:?}",
                self.session_id, response.status
            );
            return None;
        }
        if !response.status.is_terminal() {
            return None;
        }

        self.completed = true;
        let outcome = match response.status {
            ProcessingState::Completed => match &response.result {
                Some(result) => PollOutcome::Completed(result.clone()),
                None => PollOutcome::Failed {
                    message: "Processing completed without a result".to_string(),
                },
            },
            ProcessingState::Error => PollOutcome::Failed {
                message: response
                    .error
                    .clone()
                    .unwrap_or_else(|| "Processing failed".to_string()),
            },
            ProcessingState::NotFound => PollOutcome::Failed {
                message: format!("Session {} not found", self.session_id),
            },
            // Guarded by is_terminal above.
            ProcessingState::Ready | ProcessingState::Processing => unreachable!(),
        };
        Some(outcome)
    }
}

pub struct ProcessingPoller<S: StatusSource> {
    source: Arc<S>,
    interval: Duration,
}

impl<S: StatusSource> ProcessingPoller<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(source: Arc<S>, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Poll a session until a terminal state, delivering intermediate
    /// statuses to `on_status` (progress, stage). The first check happens
    /// immediately; later checks follow the fixed interval. Cancelling the
    /// token stops the loop without a terminal outcome, and any transport
    /// error is itself terminal.
    pub async fn poll_until_terminal(
        &self,
        session_id: &str,
        cancel: &CancellationToken,
        mut on_status: impl FnMut(&StatusResponse) + Send,
    ) -> Result<ProcessingResult> {
        let mut latch = CompletionLatch::new(session_id);
        let mut ticker = tokio::time::interval(self.interval);
        // A slow status request must not be followed by a burst of
        // back-to-back checks; keep the period fixed.
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Polling cancelled for session {}", session_id);
                    return Err(ClientError::Cancelled(session_id.to_string()));
                }
                _ = ticker.tick() => {}
            }

            let response = match self.source.processing_status(session_id).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Status check failed for session {}: {}", session_id, e);
                    return Err(e);
                }
            };

            on_status(&response);

            match latch.observe(&response) {
                Some(PollOutcome::Completed(result)) => {
                    info!(
                        "Session {} completed with {} detections",
                        session_id, result.detections_count
                    );
                    return Ok(result);
                }
                Some(PollOutcome::Failed { message }) => {
                    return Err(ClientError::Processing {
                        session_id: session_id.to_string(),
                        message,
                    });
                }
                None => {}
            }
        }
    }
}
