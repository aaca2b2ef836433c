// Operator session pump
//
// A Session ties a frame source to the normalization pipeline, the
// workflow controller, and a display collaborator. Connection-status
// frames bypass normalization and reach the display untouched; every
// other frame becomes one canonical record (plus an optional parse
// diagnostic) folded into the workflow state and forwarded to the sink.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::RwLock;
use tracing::debug;

use upline_contracts::{CanonicalLogRecord, ConnectionStatus, RawFrame, WorkflowState};
use upline_pipeline::{LogNormalizer, PipelineConfig};

use crate::controller::WorkflowController;

/// Display collaborator receiving canonical records as they are produced
///
/// Records arrive with their `is_technical` flag intact; the sink decides
/// whether hidden records are rendered, counted, or dropped.
#[async_trait]
pub trait DisplaySink: Send + Sync {
    async fn show(&self, record: &CanonicalLogRecord);

    /// Connection-status pass-through; the default ignores it
    async fn connection(&self, _status: ConnectionStatus) {}

    /// State snapshot after each applied frame; the default ignores it
    async fn state_changed(&self, _state: &WorkflowState) {}
}

/// In-memory sink for tests and replay tooling
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RwLock<Vec<CanonicalLogRecord>>,
    statuses: RwLock<Vec<ConnectionStatus>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<CanonicalLogRecord> {
        self.records.read().await.clone()
    }

    /// Records an operator would actually see
    pub async fn visible(&self) -> Vec<CanonicalLogRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|record| !record.is_technical)
            .cloned()
            .collect()
    }

    pub async fn statuses(&self) -> Vec<ConnectionStatus> {
        self.statuses.read().await.clone()
    }
}

#[async_trait]
impl DisplaySink for MemorySink {
    async fn show(&self, record: &CanonicalLogRecord) {
        self.records.write().await.push(record.clone());
    }

    async fn connection(&self, status: ConnectionStatus) {
        self.statuses.write().await.push(status);
    }
}

/// One operator session: pipeline, workflow state, and display wiring
pub struct Session {
    normalizer: LogNormalizer,
    controller: WorkflowController,
    sink: Arc<dyn DisplaySink>,
}

impl Session {
    pub fn new(config: PipelineConfig, sink: Arc<dyn DisplaySink>) -> Self {
        Self {
            normalizer: LogNormalizer::new(config),
            controller: WorkflowController::new(),
            sink,
        }
    }

    pub fn controller(&self) -> &WorkflowController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut WorkflowController {
        &mut self.controller
    }

    /// Handle one frame from the transport
    pub async fn handle(&mut self, frame: RawFrame) {
        match frame {
            RawFrame::Status(status) => {
                debug!(%status, "connection status");
                self.sink.connection(status).await;
            }
            other => {
                let normalized = self.normalizer.normalize(&other);
                self.controller.apply(&normalized);
                self.sink.show(&normalized.record).await;
                if let Some(parse_error) = &normalized.parse_error {
                    debug!(excerpt = %parse_error.message, "embedded event parse failure");
                    self.sink.show(parse_error).await;
                }
                self.sink.state_changed(self.controller.state()).await;
            }
        }
    }

    /// Drain a frame stream to completion, returning the frame count
    ///
    /// Frames are handled strictly in arrival order; there is no
    /// buffering, reordering, or backpressure.
    pub async fn run<S>(&mut self, mut frames: S) -> usize
    where
        S: Stream<Item = RawFrame> + Unpin,
    {
        let mut count = 0;
        while let Some(frame) = frames.next().await {
            self.handle(frame).await;
            count += 1;
        }
        debug!(count, "frame stream drained");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn status_frames_bypass_normalization() {
        let sink = Arc::new(MemorySink::new());
        let mut session = Session::new(PipelineConfig::default(), sink.clone());

        session.handle(RawFrame::Status(ConnectionStatus::Connected)).await;
        session.handle(RawFrame::Status(ConnectionStatus::Disconnected)).await;

        assert_eq!(
            sink.statuses().await,
            vec![ConnectionStatus::Connected, ConnectionStatus::Disconnected]
        );
        assert!(sink.records().await.is_empty());
    }

    #[tokio::test]
    async fn frames_reach_both_the_sink_and_the_workflow_log() {
        let sink = Arc::new(MemorySink::new());
        let mut session = Session::new(PipelineConfig::default(), sink.clone());

        session
            .handle(json!({ "event_type": "STEP_START", "data": { "step": 1, "description": "Connect" } }).into())
            .await;

        let records = sink.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Step 1: Connect");
        assert_eq!(session.controller().state().pre_check.logs.len(), 1);
    }

    #[tokio::test]
    async fn parse_diagnostics_are_forwarded_separately() {
        let sink = Arc::new(MemorySink::new());
        let mut session = Session::new(PipelineConfig::default(), sink.clone());

        session.handle("log PRE_CHECK_EVENT:{broken json}".into()).await;

        let records = sink.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].original_event["event_type"], "PARSE_ERROR");
        assert_eq!(sink.visible().await.len(), 1);
    }
}
