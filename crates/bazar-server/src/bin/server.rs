//! HTTP server process: write-side API, search read path, inbox sweeper,
//! and (optionally) an in-process projection worker behind the in-memory
//! broker toggle.

use std::sync::Arc;

use tokio_cron_scheduler::JobScheduler;
use tracing_subscriber::EnvFilter;

use bazar_catalog::CatalogService;
use bazar_core::{Clock, SystemClock};
use bazar_server::api::{build_app, AppState};
use bazar_server::bootstrap::bootstrap;
use bazar_server::storage::ObjectStorageGateway;
use bazar_server::shutdown_signal;
use bazar_store::{RedisDocumentStore, SearchService};
use bazar_tasks::{
    register_sweeper_job, AmqpDispatcher, InMemoryBroker, Projector, TaskDispatcher,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(bazar_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = bazar_db::PoolConfig::from_app_config(&config);
    let pool = bazar_db::connect_pool(&config.database_url, pool_config).await?;

    let redis_client = redis::Client::open(config.redis_url())?;
    let redis = redis::aio::ConnectionManager::new(redis_client).await?;

    let storage = Arc::new(ObjectStorageGateway::from_app_config(&config).await);
    bootstrap(&pool, &redis, &storage).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // The in-memory broker collapses dispatcher and worker into this
    // process for development; production publishes to RabbitMQ and the
    // bazar-worker process consumes.
    let dispatcher: Arc<dyn TaskDispatcher> = if config.enable_in_memory_task_broker {
        let broker = Arc::new(InMemoryBroker::new());
        let store = Arc::new(RedisDocumentStore::new(redis.clone()));
        let projector = Arc::new(Projector::new(pool.clone(), store, Arc::clone(&clock)));
        tokio::spawn(Arc::clone(&broker).run(projector));
        tracing::info!("using in-memory task broker with an in-process worker");
        broker
    } else {
        Arc::new(AmqpDispatcher::connect(&config.amqp_url).await?)
    };

    let scheduler = JobScheduler::new().await?;
    register_sweeper_job(
        &scheduler,
        pool.clone(),
        Arc::clone(&dispatcher),
        Arc::clone(&clock),
        config.sweeper_grace_secs,
    )
    .await?;
    scheduler.start().await?;
    // Dropping the handle stops the sweeper; keep it for the process lifetime.
    let _scheduler = scheduler;

    let catalog = Arc::new(CatalogService::new(
        pool.clone(),
        Arc::clone(&clock),
        Arc::clone(&dispatcher),
    ));
    let search = Arc::new(SearchService::new(redis));

    let app = build_app(
        AppState {
            pool,
            catalog,
            search,
            storage,
            max_upload_file_size_bytes: config.max_upload_file_size_bytes,
        },
        &config.cors_origins,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "bazar server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
