use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::db::job_repo::JobId;

/// Events emitted by the ingestion worker while a batch runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IngestEvent {
    #[serde(rename_all = "camelCase")]
    FileStarted {
        job_id: JobId,
        filename: String,
        index: usize,
        total: usize,
    },
    #[serde(rename_all = "camelCase")]
    FileCompleted {
        job_id: JobId,
        filename: String,
        records: usize,
    },
    #[serde(rename_all = "camelCase")]
    FileFailed {
        job_id: JobId,
        filename: String,
        error: String,
    },
    #[serde(rename_all = "camelCase")]
    BatchDone { job_id: JobId, records: usize },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Drops every event.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: IngestEvent) {}
}

/// Forwards events to a broadcast channel. Sending without subscribers is
/// not an error.
#[derive(Clone)]
pub struct BroadcastProgress {
    sender: Arc<broadcast::Sender<IngestEvent>>,
}

impl BroadcastProgress {
    pub fn new(sender: Arc<broadcast::Sender<IngestEvent>>) -> Self {
        Self { sender }
    }

    /// Creates a reporter with its own channel of the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self::new(Arc::new(sender))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.sender.subscribe()
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: IngestEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_progress_delivers_events() {
        let progress = BroadcastProgress::with_capacity(8);
        let mut rx = progress.subscribe();

        progress.report(IngestEvent::BatchDone {
            job_id: 3,
            records: 5,
        });

        assert_eq!(
            rx.try_recv().unwrap(),
            IngestEvent::BatchDone {
                job_id: 3,
                records: 5
            }
        );
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let progress = BroadcastProgress::with_capacity(1);
        progress.report(IngestEvent::BatchDone {
            job_id: 1,
            records: 0,
        });
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(IngestEvent::FileFailed {
            job_id: 9,
            filename: "bad.xlsx".to_string(),
            error: "corrupt".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "fileFailed");
        assert_eq!(json["jobId"], 9);
        assert_eq!(json["filename"], "bad.xlsx");
    }
}
