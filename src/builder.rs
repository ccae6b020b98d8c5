//! CascadeBuilder for configuring and constructing engine instances
//!
//! ## Table of Contents
//! - **CascadeBuilder**: Builder pattern for engine configuration
//! - **CascadeConfig**: Complete configuration struct

use crate::clock::{SharedClock, SystemClock};
use crate::diversion::{DiversionStrategy, FirstAvailableStrategy};
use crate::error::Result;
use crate::metrics::CascadeMetrics;
use crate::networking::HttpServerConfig;
use crate::notify::gateway::DEFAULT_CHANNEL_CAPACITY;
use crate::notify::store::DEFAULT_HISTORY_CAPACITY;
use crate::runtime::Cascade;
use crate::storage::{BoxedStateStore, FileStore, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Complete engine configuration
#[derive(Debug, Clone)]
pub struct CascadeConfig {
    /// Store path for file-based persistence
    pub store_path: Option<PathBuf>,
    /// HTTP server config
    pub http_config: HttpServerConfig,
    /// Notification history retention cap
    pub history_capacity: usize,
    /// Push channel capacity before slow subscribers lag
    pub push_capacity: usize,
    /// Enable metrics
    pub metrics_enabled: bool,
    /// Node name
    pub node_name: String,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            http_config: HttpServerConfig::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            push_capacity: DEFAULT_CHANNEL_CAPACITY,
            metrics_enabled: true,
            node_name: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "cascade-node".to_string()),
        }
    }
}

/// Builder for constructing engine instances
pub struct CascadeBuilder {
    config: CascadeConfig,
    store: Option<BoxedStateStore>,
    clock: Option<SharedClock>,
    strategy: Option<Arc<dyn DiversionStrategy>>,
}

impl CascadeBuilder {
    /// Create a new CascadeBuilder with default configuration
    pub fn new() -> Self {
        Self {
            config: CascadeConfig::default(),
            store: None,
            clock: None,
            strategy: None,
        }
    }

    /// Set file store path for local persistence
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = Some(path.into());
        self
    }

    /// Set a custom state store
    pub fn with_store(mut self, store: BoxedStateStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the clock the engine reads time from
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the alternative-airport selection policy
    pub fn with_diversion_strategy<S: DiversionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// Set HTTP server configuration
    pub fn with_http_config(mut self, config: HttpServerConfig) -> Self {
        self.config.http_config = config;
        self
    }

    /// Set HTTP bind address
    pub fn with_http_addr(mut self, addr: &str) -> Result<Self> {
        self.config.http_config = self.config.http_config.with_addr_str(addr)?;
        Ok(self)
    }

    /// Set the notification history retention cap
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Set the push channel capacity
    pub fn with_push_capacity(mut self, capacity: usize) -> Self {
        self.config.push_capacity = capacity;
        self
    }

    /// Set node name
    pub fn with_node_name(mut self, name: impl Into<String>) -> Self {
        self.config.node_name = name.into();
        self
    }

    /// Enable or disable metrics
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.config.metrics_enabled = enabled;
        self
    }

    /// Build the engine instance
    pub fn build(self) -> Result<Cascade> {
        info!(node = %self.config.node_name, "Building cascade engine");

        // Create or use provided state store
        let store: BoxedStateStore = match self.store {
            Some(s) => s,
            None => {
                if let Some(path) = &self.config.store_path {
                    Arc::new(FileStore::open(path)?) as BoxedStateStore
                } else {
                    Arc::new(MemoryStore::new()) as BoxedStateStore
                }
            }
        };

        // Create clock and diversion strategy
        let clock: SharedClock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let strategy = self
            .strategy
            .unwrap_or_else(|| Arc::new(FirstAvailableStrategy));

        // Create metrics
        let metrics = if self.config.metrics_enabled {
            Some(Arc::new(CascadeMetrics::new()?))
        } else {
            None
        };

        Ok(Cascade::new(self.config, store, clock, strategy, metrics))
    }
}

impl Default for CascadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::types::Airport;

    #[test]
    fn test_builder_default() {
        let engine = CascadeBuilder::new().build();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_builder_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let engine = CascadeBuilder::new()
            .with_store_path(dir.path().join("state.json"))
            .build();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_builder_with_custom_strategy() {
        struct LastAvailableStrategy;

        impl DiversionStrategy for LastAvailableStrategy {
            fn select_alternative<'a>(
                &self,
                affected: &str,
                airports: &'a [Airport],
            ) -> Option<&'a Airport> {
                airports.iter().rev().find(|a| a.code != affected)
            }

            fn name(&self) -> &str {
                "last-available"
            }
        }

        let engine = CascadeBuilder::new()
            .with_diversion_strategy(LastAvailableStrategy)
            .build();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_http_addr() {
        let result = CascadeBuilder::new().with_http_addr("not-an-address");
        assert!(result.is_err());
    }

    #[test]
    fn test_build_wires_the_dispatch_chain() {
        let engine = CascadeBuilder::new().build().unwrap();
        let bus = engine.bus();

        assert_eq!(bus.subscriber_count(EventKind::WeatherImpactDetected), 1);
        assert_eq!(bus.subscriber_count(EventKind::OperationalDelayDetected), 1);
        assert_eq!(bus.subscriber_count(EventKind::FlightImpeded), 1);
        assert_eq!(bus.subscriber_count(EventKind::FlightRedirected), 1);
        // Store and push gateway both listen for sent notifications.
        assert_eq!(bus.subscriber_count(EventKind::NotificationSent), 2);
    }
}
