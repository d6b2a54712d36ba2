//! Periodic pruning.
//!
//! # Responsibilities
//! - Invoke `LifecycleGuard::prune` on a fixed interval
//! - Stop on the shutdown broadcast
//!
//! # Design Decisions
//! - A failed sweep is logged and retried on the next tick
//! - Independent of the request path; needs no coordination with resolution

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::LifecycleConfig;
use crate::lifecycle::clock;
use crate::lifecycle::guard::LifecycleGuard;

pub struct PruneScheduler {
    guard: LifecycleGuard,
    config: LifecycleConfig,
}

impl PruneScheduler {
    pub fn new(guard: LifecycleGuard, config: LifecycleConfig) -> Self {
        Self { guard, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.prune_enabled {
            tracing::info!("Scheduled pruning disabled");
            return;
        }

        tracing::info!(interval_secs = self.config.prune_interval_secs, "Prune scheduler starting");

        let mut ticker = time::interval(Duration::from_secs(self.config.prune_interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.guard.prune(clock::now()) {
                        tracing::error!(error = %e, "Scheduled prune failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Prune scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::lifecycle::Shutdown;
    use crate::rules::{QueryPolicy, Rule, Selector};
    use crate::store::{MemoryRuleStore, RuleStore};

    #[tokio::test]
    async fn test_scheduler_prunes_and_stops() {
        let store = Arc::new(MemoryRuleStore::new());
        store
            .insert(Rule {
                id: "*.example.com/*".into(),
                domain: "example.com".into(),
                subdomain: Selector::Any,
                path: Selector::Any,
                query_policy: QueryPolicy::AllowAll,
                target: "http://127.0.0.1".into(),
                expires_at: 1,
                created_at: 0,
                updated_at: 0,
            })
            .unwrap();

        let shutdown = Shutdown::new();
        let config = LifecycleConfig {
            prune_enabled: true,
            prune_interval_secs: 1,
        };
        let scheduler = PruneScheduler::new(LifecycleGuard::new(store.clone()), config);
        let handle = tokio::spawn(scheduler.run(shutdown.subscribe()));

        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.is_empty().unwrap());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_scheduler_returns() {
        let store: Arc<dyn RuleStore> = Arc::new(MemoryRuleStore::new());
        let config = LifecycleConfig {
            prune_enabled: false,
            prune_interval_secs: 60,
        };
        let shutdown = Shutdown::new();
        PruneScheduler::new(LifecycleGuard::new(store), config)
            .run(shutdown.subscribe())
            .await;
    }
}
