//! CovenantRuntime: owns the store and every engine.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use covenant_core::config::CovenantConfig;
use covenant_core::errors::CovenantResult;
use covenant_dashboard::DashboardAggregator;
use covenant_obligations::ObligationEngine;
use covenant_storage::StorageEngine;
use covenant_temporal::TemporalEngine;

/// Options for opening the runtime.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    /// Path to the SQLite database. Falls back to `storage.db_path` from the
    /// configuration, or an in-memory store when `in_memory` is set.
    pub db_path: Option<PathBuf>,
    /// TOML configuration string. If None, uses defaults.
    pub config_toml: Option<String>,
    pub in_memory: bool,
}

/// Every engine, wired over one shared store.
pub struct CovenantRuntime {
    pub store: Arc<StorageEngine>,
    pub temporal: TemporalEngine,
    pub obligations: ObligationEngine,
    pub dashboard: DashboardAggregator,
    pub config: CovenantConfig,
}

impl CovenantRuntime {
    pub fn open(opts: RuntimeOptions) -> CovenantResult<Self> {
        let config = match &opts.config_toml {
            Some(toml_str) => CovenantConfig::load(toml_str)?,
            None => CovenantConfig::default(),
        };
        covenant_observability::init_tracing(&config.observability);

        let store = if opts.in_memory {
            StorageEngine::open_in_memory()?
        } else {
            let path = opts
                .db_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.storage.db_path));
            StorageEngine::open(&path, &config.storage)?
        };
        let store = Arc::new(store);

        let runtime = Self {
            temporal: TemporalEngine::new(store.clone(), &config),
            obligations: ObligationEngine::new(store.clone(), &config),
            dashboard: DashboardAggregator::new(store.clone(), config.dashboard.clone()),
            store,
            config,
        };
        info!(
            version = covenant_core::constants::VERSION,
            in_memory = opts.in_memory,
            "covenant runtime opened"
        );
        Ok(runtime)
    }
}
