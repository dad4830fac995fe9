//! Projection worker process: consumes projection jobs from RabbitMQ and
//! materializes inbox events into the document store. Any number of these
//! may run concurrently; backpressure is the broker prefetch limit.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use bazar_core::SystemClock;
use bazar_server::shutdown_signal;
use bazar_store::RedisDocumentStore;
use bazar_tasks::{run_worker, Projector, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = bazar_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = bazar_db::PoolConfig::from_app_config(&config);
    let pool = bazar_db::connect_pool(&config.database_url, pool_config).await?;

    let store = Arc::new(RedisDocumentStore::connect(&config.redis_url()).await?);
    let projector = Arc::new(Projector::new(pool, store, Arc::new(SystemClock)));

    let worker_config = WorkerConfig::new(config.amqp_url.clone(), config.worker_prefetch);

    tokio::select! {
        result = run_worker(worker_config, projector) => {
            result?;
            tracing::warn!("worker consumer loop ended");
        }
        () = shutdown_signal() => {}
    }

    Ok(())
}
