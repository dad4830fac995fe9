//! Task-dispatch bridge between the write model and the read model.
//!
//! The orchestrator enqueues projection jobs keyed by inbox-event guid; the
//! projection worker consumes them at-least-once and applies each event to
//! the document store. Correctness never depends on delivery order; the
//! inbox state and the per-product stale-write guard restore it.

pub mod broker;
pub mod dispatch;
pub mod projector;
pub mod sweeper;
pub mod worker;

pub use broker::InMemoryBroker;
pub use dispatch::{AmqpDispatcher, TaskDispatcher, TaskKind};
pub use projector::{ProjectionOutcome, Projector};
pub use sweeper::{register_sweeper_job, sweep_once};
pub use worker::{run_worker, WorkerConfig};

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Amqp(#[from] lapin::Error),

    #[error("in-memory dispatch channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Db(#[from] bazar_db::DbError),

    #[error(transparent)]
    Store(#[from] bazar_store::StoreError),

    #[error("malformed job for event {event_guid}: {reason}")]
    MalformedJob { event_guid: uuid::Uuid, reason: String },
}
