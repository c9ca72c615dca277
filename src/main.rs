//! Charging Core
//!
//! REST service for the EV charging transaction lifecycle.
//! Reads configuration from a TOML file (~/.config/charging-core/config.toml,
//! or the path in `CHARGING_CONFIG`).

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use charging_core::application::events::{spawn_logging_consumer, BroadcastEventBus, EventNotifier};
use charging_core::application::provision_topology;
use charging_core::application::transactions::{
    TimestampIdGenerator, TransactionIdGenerator, TransactionService, UuidIdGenerator,
};
use charging_core::config::{IdStrategy, LogFormat, LoggingConfig};
use charging_core::domain::{RepositoryProvider, UnitOfWorkFactory};
use charging_core::shared::shutdown::ShutdownCoordinator;
use charging_core::{
    config_path, create_api_router, init_database, run_migrations, ApiContext, AppConfig,
    DatabaseConfig, InMemoryStorage, SeaOrmRepositoryProvider, SeaOrmUnitOfWorkFactory,
};

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let path = config_path();
    let (app_cfg, load_error) = match AppConfig::load(&path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    init_tracing(&app_cfg.logging);
    match load_error {
        None => info!(path = %path.display(), "Configuration loaded"),
        Some(e) => warn!(error = %e, "Failed to load config, using defaults"),
    }

    info!("Starting Charging Core...");

    // ── Prometheus metrics recorder (before any metrics calls) ──
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("📊 Prometheus metrics recorder installed");

    // ── Storage ────────────────────────────────────────────────
    let (repos, units, db): (
        Arc<dyn RepositoryProvider>,
        Arc<dyn UnitOfWorkFactory>,
        Option<DatabaseConnection>,
    ) = if app_cfg.database.is_memory() {
        info!("Using in-memory storage");
        let storage = Arc::new(InMemoryStorage::new());
        let repos: Arc<dyn RepositoryProvider> = storage.clone();
        let units: Arc<dyn UnitOfWorkFactory> = storage;
        (repos, units, None)
    } else {
        let db_config = DatabaseConfig {
            url: app_cfg.database.url.clone(),
            max_connections: app_cfg.database.max_connections,
        };
        let db = match init_database(&db_config).await {
            Ok(db) => db,
            Err(e) => {
                error!(error = %e, "Failed to connect to database");
                return Err(e.into());
            }
        };
        if let Err(e) = run_migrations(&db).await {
            error!(error = %e, "Failed to run migrations");
            return Err(e.into());
        }
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let units: Arc<dyn UnitOfWorkFactory> = Arc::new(SeaOrmUnitOfWorkFactory::new(db.clone()));
        (repos, units, Some(db))
    };

    let provisioned = provision_topology(repos.topology(), &app_cfg.topology.stations).await?;
    info!(evses = provisioned, "Topology provisioned");

    // ── Shutdown coordination ──────────────────────────────────
    let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
    let shutdown_signal = shutdown.signal();
    shutdown.start_signal_listener();

    // ── Events ─────────────────────────────────────────────────
    let bus = Arc::new(BroadcastEventBus::with_capacity(app_cfg.events.bus_capacity));
    let consumer = spawn_logging_consumer(&bus, shutdown_signal.clone());
    let (notifier, workers) = EventNotifier::start(app_cfg.events.notifier(), bus);
    info!(
        workers = app_cfg.events.workers,
        queue_capacity = app_cfg.events.queue_capacity,
        "🔔 Event notifier started"
    );

    // ── Transaction service ────────────────────────────────────
    let ids: Arc<dyn TransactionIdGenerator> = match app_cfg.transactions.id_strategy {
        IdStrategy::Timestamp => Arc::new(TimestampIdGenerator::new()),
        IdStrategy::Uuid => Arc::new(UuidIdGenerator),
    };
    let service = Arc::new(TransactionService::new(repos, units, ids, notifier));

    let api_router = create_api_router(ApiContext {
        service,
        db: db.clone(),
        metrics: Some(prometheus_handle),
    });

    // ── REST API server with graceful shutdown ─────────────────
    let address = app_cfg.server.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, "REST API server listening");

    let api_shutdown = shutdown_signal.clone();
    let served = axum::serve(listener, api_router)
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        })
        .await;
    if let Err(e) = served {
        error!(error = %e, "REST API server error");
    }
    shutdown_signal.trigger();

    // ── Final cleanup ──────────────────────────────────────────
    info!("🧹 Performing final cleanup...");
    let drain_timeout = Duration::from_secs(app_cfg.server.shutdown_timeout);
    let drained = shutdown
        .cleanup_with_timeout(|| async move {
            if !workers.shutdown(drain_timeout).await {
                warn!("Event workers did not drain in time");
            }
            if let Err(e) = consumer.await {
                warn!(error = %e, "Event consumer task failed");
            }
        })
        .await;
    if !drained {
        warn!("Some pending events may not have been delivered");
    }

    if let Some(db) = db {
        if let Err(e) = db.close().await {
            warn!(error = %e, "Error closing database connection");
        } else {
            info!("✅ Database connection closed");
        }
    }

    info!("👋 Charging Core shutdown complete");
    Ok(())
}
