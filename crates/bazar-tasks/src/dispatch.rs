//! Dispatcher side of the bridge: durable enqueue of projection jobs.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use uuid::Uuid;

use bazar_db::InboxEventType;

use crate::TaskError;

/// Projection job kinds, one durable queue each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    ProductUpdated,
    ProductRemoved,
}

impl TaskKind {
    /// Queue name for this job kind.
    #[must_use]
    pub fn queue(self) -> &'static str {
        match self {
            Self::ProductUpdated => "consume_product_updated_event",
            Self::ProductRemoved => "consume_product_removed_event",
        }
    }

    /// Dead-letter queue receiving poison jobs of this kind.
    #[must_use]
    pub fn dead_letter_queue(self) -> &'static str {
        match self {
            Self::ProductUpdated => "consume_product_updated_event.dead",
            Self::ProductRemoved => "consume_product_removed_event.dead",
        }
    }

    /// Job kind for an inbox event type; `None` for event types that have
    /// no consumer yet.
    #[must_use]
    pub fn for_event(event_type: InboxEventType) -> Option<Self> {
        match event_type {
            InboxEventType::ProductUpdated => Some(Self::ProductUpdated),
            InboxEventType::ProductRemoved => Some(Self::ProductRemoved),
            InboxEventType::CategoryUpdated
            | InboxEventType::CategoryRemoved
            | InboxEventType::TagRemoved => None,
        }
    }

    /// All kinds that currently have a consumer.
    #[must_use]
    pub fn consumed() -> [Self; 2] {
        [Self::ProductUpdated, Self::ProductRemoved]
    }
}

/// Durable broker client used by the write-side orchestrator.
///
/// `enqueue` returns only once the broker has acknowledged the job.
/// Delivery downstream is at-least-once with no ordering guarantees.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn enqueue(&self, kind: TaskKind, event_guid: Uuid) -> Result<(), TaskError>;
}

/// RabbitMQ-backed dispatcher with publisher confirms.
pub struct AmqpDispatcher {
    // Dropping the connection closes every channel, so it rides along.
    _conn: Connection,
    channel: Channel,
}

impl AmqpDispatcher {
    /// Connects, enables publisher confirms, and declares the job queues.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Amqp`] when the broker is unreachable or any
    /// declaration fails.
    pub async fn connect(amqp_url: &str) -> Result<Self, TaskError> {
        let conn = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        declare_queues(&channel).await?;
        Ok(Self {
            _conn: conn,
            channel,
        })
    }
}

#[async_trait]
impl TaskDispatcher for AmqpDispatcher {
    async fn enqueue(&self, kind: TaskKind, event_guid: Uuid) -> Result<(), TaskError> {
        let confirm = self
            .channel
            .basic_publish(
                "",
                kind.queue(),
                BasicPublishOptions::default(),
                event_guid.to_string().as_bytes(),
                // Delivery mode 2: persisted by the broker before the confirm.
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?;
        confirm.await?;
        Ok(())
    }
}

/// Declares each job queue (durable, dead-lettering into `<queue>.dead`)
/// together with its dead-letter queue. Safe to call repeatedly.
///
/// # Errors
///
/// Returns [`TaskError::Amqp`] if any declaration fails.
pub async fn declare_queues(channel: &Channel) -> Result<(), TaskError> {
    let durable = QueueDeclareOptions {
        durable: true,
        ..QueueDeclareOptions::default()
    };

    for kind in TaskKind::consumed() {
        channel
            .queue_declare(kind.dead_letter_queue(), durable, FieldTable::default())
            .await?;

        let mut args = FieldTable::default();
        args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString("".into()),
        );
        args.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(kind.dead_letter_queue().into()),
        );
        channel.queue_declare(kind.queue(), durable, args).await?;
    }

    Ok(())
}
