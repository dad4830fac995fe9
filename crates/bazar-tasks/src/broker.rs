//! Channel-backed broker for tests and single-process development, enabled
//! with `BAZAR_ENABLE_IN_MEMORY_TASK_BROKER`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::dispatch::{TaskDispatcher, TaskKind};
use crate::projector::Projector;
use crate::TaskError;

/// In-process stand-in for the AMQP broker.
///
/// Jobs flow through an unbounded channel instead of durable queues, so the
/// at-least-once guarantee degrades to at-most-once across restarts. The
/// sweeper covers the difference, exactly as it does for lost dispatches.
pub struct InMemoryBroker {
    tx: mpsc::UnboundedSender<(TaskKind, Uuid)>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(TaskKind, Uuid)>>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Processes every job currently queued and returns how many ran.
    ///
    /// Projection errors propagate; the failed job is consumed, again
    /// leaving the inbox row for the sweeper.
    ///
    /// # Errors
    ///
    /// Returns the first [`TaskError`] raised by the projector.
    pub async fn drain(&self, projector: &Projector) -> Result<usize, TaskError> {
        let mut rx = self.rx.lock().await;
        let mut processed = 0;
        while let Ok((_kind, event_guid)) = rx.try_recv() {
            projector.process(event_guid).await?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Consumes jobs until every sender is dropped. Errors are logged and
    /// the loop keeps going, mirroring the AMQP worker's behavior.
    pub async fn run(self: Arc<Self>, projector: Arc<Projector>) {
        loop {
            let job = { self.rx.lock().await.recv().await };
            match job {
                Some((kind, event_guid)) => {
                    if let Err(e) = projector.process(event_guid).await {
                        tracing::error!(
                            error = %e,
                            queue = kind.queue(),
                            event = %event_guid,
                            "in-memory projection job failed"
                        );
                    }
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl TaskDispatcher for InMemoryBroker {
    async fn enqueue(&self, kind: TaskKind, event_guid: Uuid) -> Result<(), TaskError> {
        self.tx
            .send((kind, event_guid))
            .map_err(|_| TaskError::ChannelClosed)
    }
}
