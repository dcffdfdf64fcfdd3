//! Application state wiring the store, notifier and engine together.
//!
//! The engine types are generic over store, notifier and clock; AppState
//! pins them to the concrete infra implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use coffeemate_core::clock::SystemClock;
use coffeemate_core::coordinator::{Coordinator, CoordinatorConfig};
use coffeemate_core::lifecycle::SessionLifecycle;
use coffeemate_core::repository::session::SessionStore;
use coffeemate_core::scheduler::{Scheduler, SchedulerConfig};
use coffeemate_infra::bridge::JsonLinesNotifier;
use coffeemate_infra::config::{database_path, load_config, resolve_data_dir};
use coffeemate_infra::sqlite::pool::{DatabasePool, database_url};
use coffeemate_infra::sqlite::session::SqliteSessionStore;
use coffeemate_types::config::AppConfig;

pub type ConcreteNotifier = JsonLinesNotifier<tokio::io::Stdout>;

pub type ConcreteCoordinator = Coordinator<SqliteSessionStore, ConcreteNotifier, SystemClock>;

pub type ConcreteScheduler = Scheduler<SqliteSessionStore, ConcreteCoordinator, SystemClock>;

/// Shared application state used by every command.
pub struct AppState {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub db_pool: DatabasePool,
    pub store: Arc<SqliteSessionStore>,
}

impl AppState {
    /// Load configuration, open the database and seed default settings.
    pub async fn init(config_path: Option<&Path>, force_test_mode: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let mut config = load_config(&data_dir, config_path).await?;
        if force_test_mode {
            config.enable_test_mode();
        }

        let database_path = database_path(&config, &data_dir);
        if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let db_pool = DatabasePool::new(&database_url(&database_path)).await?;

        let store = Arc::new(SqliteSessionStore::new(db_pool.clone()));
        store.ensure_default_settings(config.default_daily_time).await?;

        Ok(Self {
            config,
            data_dir,
            database_path,
            db_pool,
            store,
        })
    }

    /// Coordinator posting to stdout.
    pub fn coordinator(&self) -> ConcreteCoordinator {
        let lifecycle = SessionLifecycle::new(self.store.clone(), SystemClock);
        Coordinator::new(
            lifecycle,
            Arc::new(JsonLinesNotifier::stdout()),
            CoordinatorConfig::from(&self.config),
        )
    }

    /// Scheduler driving `coordinator`.
    pub fn scheduler(&self, coordinator: Arc<ConcreteCoordinator>) -> ConcreteScheduler {
        let config = SchedulerConfig {
            close_interval: self.config.close_interval(),
            reconfigure_interval: self.config.reconfigure_interval(),
            daily_enabled: !self.config.test_mode,
        };
        Scheduler::new(self.store.clone(), coordinator, SystemClock, config)
    }
}
