//! # Charging Core
//!
//! Charging transaction lifecycle for EV stations: start, charging state
//! updates, stop with energy accounting, and asynchronous event
//! notification of every change.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Topology, transactions, meter values, events and repository traits
//! - **application**: Transaction service, id generation, event notifier and channels
//! - **infrastructure**: SeaORM persistence and the in-memory store
//! - **interfaces**: REST API
//! - **shared**: Shutdown coordination, retry helpers, error and time types

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

pub use config::{config_path, default_config_path, AppConfig};

pub use infrastructure::{
    init_database, run_migrations, DatabaseConfig, InMemoryStorage, SeaOrmRepositoryProvider,
    SeaOrmUnitOfWorkFactory,
};

pub use interfaces::{create_api_router, ApiContext};
