//! A coordinator wired to test doubles

use std::sync::Arc;
use std::time::Duration;

use super::{fixtures, MockEngine, MockRestarter, RecordingNavigator, RecordingScheduler, StaticDirectory};
use crate::config::WalletConfig;
use crate::coordinator::{SessionCoordinator, WalletStores};
use crate::directory::EntitySource;

pub struct TestWallet {
    pub coordinator: Arc<SessionCoordinator>,
    pub engine: Arc<MockEngine>,
    pub navigator: Arc<RecordingNavigator>,
    pub scheduler: Arc<RecordingScheduler>,
    pub restarter: Arc<MockRestarter>,
    pub stores: WalletStores,
}

impl TestWallet {
    pub fn new() -> Self {
        Self::build(MockEngine::new(), WalletStores::in_memory(), None)
    }

    pub fn with_engine(engine: MockEngine) -> Self {
        Self::build(engine, WalletStores::in_memory(), None)
    }

    pub fn build(
        engine: MockEngine,
        stores: WalletStores,
        directory: Option<Arc<dyn EntitySource>>,
    ) -> Self {
        let engine = Arc::new(engine);
        let navigator = Arc::new(RecordingNavigator::new());
        let scheduler = Arc::new(RecordingScheduler::new());
        let restarter = Arc::new(MockRestarter::new());
        let directory = directory.unwrap_or_else(|| {
            Arc::new(StaticDirectory::with(vec![fixtures::entity("Registro Civil")]))
        });

        let coordinator = SessionCoordinator::builder(engine.clone(), stores.clone(), restarter.clone())
            .config(test_config())
            .directory(directory)
            .scheduler(scheduler.clone())
            .build()
            .expect("test coordinator");

        Self {
            coordinator,
            engine,
            navigator,
            scheduler,
            restarter,
            stores,
        }
    }

    /// Run `initialize` with the recording navigator
    pub async fn initialize(&self) {
        self.coordinator
            .initialize(self.navigator.clone())
            .await
            .expect("initialize");
    }
}

impl Default for TestWallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Default configuration with production delays
pub fn test_config() -> WalletConfig {
    let mut config = WalletConfig::default();
    config.transport.dispose_delay = Duration::from_secs(3);
    config.notifications.schedule_delay = Duration::from_secs(2);
    config
}
