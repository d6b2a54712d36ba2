//! Shared utilities for integration testing.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rule_router::config::RouterConfig;
use rule_router::http::HttpServer;
use rule_router::lifecycle::Shutdown;
use rule_router::{MemoryRuleStore, RuleService, RuleStore};
use tokio::net::TcpListener;

/// A router bound to an ephemeral port.
pub struct TestRouter {
    pub base_url: String,
    pub service: RuleService,
    pub shutdown: Shutdown,
}

impl TestRouter {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestRouter {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the HTTP server over a fresh in-memory store.
pub async fn start_router() -> TestRouter {
    start_router_with(Arc::new(MemoryRuleStore::new())).await
}

pub async fn start_router_with(store: Arc<dyn RuleStore>) -> TestRouter {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let service = RuleService::new(store);
    let shutdown = Shutdown::new();
    let server = HttpServer::new(RouterConfig::default(), service.clone());
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestRouter {
        base_url: format!("http://{}", addr),
        service,
        shutdown,
    }
}

pub fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

/// An expiry comfortably in the future.
#[allow(dead_code)]
pub fn in_an_hour() -> u64 {
    now() + 3600
}
