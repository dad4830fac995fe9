//! AMQP consumer loop for the projection worker process.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties};
use uuid::Uuid;

use crate::dispatch::{declare_queues, TaskKind};
use crate::projector::Projector;
use crate::TaskError;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub amqp_url: String,
    /// Broker prefetch limit, acting as the worker pool's backpressure.
    pub prefetch: u16,
    pub max_connect_retries: u32,
    pub connect_backoff_base_ms: u64,
}

impl WorkerConfig {
    #[must_use]
    pub fn new(amqp_url: String, prefetch: u16) -> Self {
        Self {
            amqp_url,
            prefetch,
            max_connect_retries: 5,
            connect_backoff_base_ms: 1_000,
        }
    }
}

/// Runs one consumer per job queue until the connection drops.
///
/// Manual acknowledgement throughout: success acks, failure nacks with
/// requeue, and a failure on an already-redelivered job nacks without
/// requeue, routing it to the dead-letter queue. The inbox row stays pending
/// either way, so the sweeper can resurrect dead-lettered work.
///
/// # Errors
///
/// Returns [`TaskError::Amqp`] when the broker stays unreachable past the
/// retry budget or a channel operation fails.
pub async fn run_worker(config: WorkerConfig, projector: Arc<Projector>) -> Result<(), TaskError> {
    let conn = connect_with_backoff(&config).await?;
    let channel = conn.create_channel().await?;
    declare_queues(&channel).await?;
    channel
        .basic_qos(config.prefetch, BasicQosOptions::default())
        .await?;

    let mut handles = Vec::new();
    for kind in TaskKind::consumed() {
        let consumer = channel
            .basic_consume(
                kind.queue(),
                &format!("bazar-worker-{}", kind.queue()),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        let projector = Arc::clone(&projector);
        handles.push(tokio::spawn(consume_loop(consumer, projector, kind)));
    }

    tracing::info!(prefetch = config.prefetch, "projection worker consuming");
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

async fn consume_loop(mut consumer: lapin::Consumer, projector: Arc<Projector>, kind: TaskKind) {
    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, queue = kind.queue(), "consumer stream error");
                break;
            }
        };
        handle_delivery(delivery, &projector, kind).await;
    }
    tracing::warn!(queue = kind.queue(), "consumer stream ended");
}

async fn handle_delivery(delivery: Delivery, projector: &Projector, kind: TaskKind) {
    let Some(event_guid) = parse_job(&delivery.data) else {
        tracing::error!(
            queue = kind.queue(),
            "unparseable job body; acking to drop it"
        );
        ack(&delivery, kind).await;
        return;
    };

    match projector.process(event_guid).await {
        Ok(outcome) => {
            tracing::debug!(queue = kind.queue(), event = %event_guid, ?outcome, "job done");
            ack(&delivery, kind).await;
        }
        Err(e) => {
            // First failure retries in place; a redelivered failure is
            // poison and goes to the dead-letter queue.
            let requeue = !delivery.redelivered;
            tracing::error!(
                error = %e,
                queue = kind.queue(),
                event = %event_guid,
                requeue,
                "projection job failed"
            );
            if let Err(nack_err) = delivery
                .nack(BasicNackOptions {
                    requeue,
                    ..BasicNackOptions::default()
                })
                .await
            {
                tracing::error!(error = %nack_err, queue = kind.queue(), "nack failed");
            }
        }
    }
}

async fn ack(delivery: &Delivery, kind: TaskKind) {
    if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
        tracing::error!(error = %e, queue = kind.queue(), "ack failed");
    }
}

fn parse_job(body: &[u8]) -> Option<Uuid> {
    let text = std::str::from_utf8(body).ok()?;
    Uuid::parse_str(text.trim()).ok()
}

/// Connects with exponential back-off and jitter, up to the retry budget.
async fn connect_with_backoff(config: &WorkerConfig) -> Result<Connection, TaskError> {
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match Connection::connect(&config.amqp_url, ConnectionProperties::default()).await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                if attempt >= config.max_connect_retries {
                    return Err(e.into());
                }
                attempt += 1;
                let computed = config
                    .connect_backoff_base_ms
                    .saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries = config.max_connect_retries,
                    delay_ms,
                    error = %e,
                    "broker unreachable — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_job_accepts_a_guid_body() {
        let guid = Uuid::new_v4();
        assert_eq!(parse_job(guid.to_string().as_bytes()), Some(guid));
    }

    #[test]
    fn parse_job_tolerates_surrounding_whitespace() {
        let guid = Uuid::new_v4();
        let body = format!("  {guid}\n");
        assert_eq!(parse_job(body.as_bytes()), Some(guid));
    }

    #[test]
    fn parse_job_rejects_garbage() {
        assert_eq!(parse_job(b"not-a-guid"), None);
        assert_eq!(parse_job(&[0xff, 0xfe]), None);
    }
}
