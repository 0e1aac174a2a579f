//! Test environment setup.
//!
//! Every suite runs the real router over a fresh in-memory store with the
//! role client in mock mode, so all production code paths are exercised
//! except the remote role-service transport.

use std::sync::Arc;

use api::{router, AppState, RateLimitConfig};
use axum::Router;
use axum_test::TestServer;
use event_store::{EventStore, MemoryStore};
use realtime::Hub;

use crate::mocks::FailingStore;

/// Shared test environment: in-memory store, hub, and the full router.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub hub: Arc<Hub>,
    pub state: AppState,
    pub router: Router,
}

impl TestContext {
    /// Fresh context with default admission-control limits.
    pub fn new() -> Self {
        Self::with_rate_limit(RateLimitConfig::default())
    }

    /// Fresh context with custom admission-control limits.
    pub fn with_rate_limit(config: RateLimitConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let hub = Arc::new(Hub::new());
        let state = AppState::with_rate_limit(
            store.clone() as Arc<dyn EventStore>,
            hub.clone(),
            "mock",
            config,
        );
        let router = router(state.clone());
        Self {
            store,
            hub,
            state,
            router,
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A server whose store fails every operation, for storage-error paths.
pub fn failing_server() -> TestServer {
    let store: Arc<dyn EventStore> = Arc::new(FailingStore);
    let hub = Arc::new(Hub::new());
    let state = AppState::new(store, hub, "mock");
    TestServer::new(router(state)).expect("Failed to create test server")
}
