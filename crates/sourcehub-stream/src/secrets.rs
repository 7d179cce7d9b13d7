//! Marketplace-token cache backing secret enrichment.
//!
//! Tokens are issued per tenant by an external marketplace service and
//! are expensive to mint, so listings must not call out once per row.
//! The cache keeps one token per tenant behind an `RwLock` and a timer
//! task refreshes the known tenants in the background; request handlers
//! only block on the provider for a tenant's very first token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sourcehub_core::contracts::SecretStore;

/// Mints a marketplace token for one tenant. Each call is a remote call.
pub trait MarketplaceTokenProvider: Send + Sync + 'static {
    fn fetch_token(
        &self,
        tenant_id: i64,
    ) -> impl Future<Output = std::result::Result<Value, String>> + Send;
}

/// Per-tenant token cache. Cheap to clone via `Arc`; the refresh task
/// and the repositories share one instance.
pub struct MarketplaceTokenCache<P> {
    provider: P,
    tokens: RwLock<HashMap<i64, Value>>,
}

impl<P: MarketplaceTokenProvider> MarketplaceTokenCache<P> {
    pub fn new(provider: P) -> Arc<Self> {
        Arc::new(Self {
            provider,
            tokens: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the cached token for a tenant, minting one on first use.
    pub async fn token_for(&self, tenant_id: i64) -> std::result::Result<Value, String> {
        if let Some(token) = self.tokens.read().await.get(&tenant_id) {
            return Ok(token.clone());
        }

        let token = self.provider.fetch_token(tenant_id).await?;
        self.tokens
            .write()
            .await
            .insert(tenant_id, token.clone());
        debug!(tenant_id, "minted marketplace token");
        Ok(token)
    }

    /// Re-mints the tokens of every tenant currently in the cache. A
    /// tenant whose refresh fails keeps its previous token.
    pub async fn refresh_all(&self) {
        let tenant_ids: Vec<i64> = self.tokens.read().await.keys().copied().collect();

        for tenant_id in tenant_ids {
            match self.provider.fetch_token(tenant_id).await {
                Ok(token) => {
                    self.tokens.write().await.insert(tenant_id, token);
                }
                Err(reason) => {
                    warn!(tenant_id, %reason, "marketplace token refresh failed");
                }
            }
        }
    }

    /// Spawns the background refresh loop. The handle is only useful
    /// for shutdown; dropping it leaves the task running.
    pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it, everything is
            // fresh at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.refresh_all().await;
            }
        })
    }
}

impl<P: MarketplaceTokenProvider> SecretStore for MarketplaceTokenCache<P> {
    async fn fetch_extra(
        &self,
        _authentication_uid: &str,
        tenant_id: i64,
    ) -> std::result::Result<Value, String> {
        self.token_for(tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl MarketplaceTokenProvider for CountingProvider {
        async fn fetch_token(&self, tenant_id: i64) -> Result<Value, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "tenant": tenant_id, "mint": call }))
        }
    }

    struct FailingProvider;

    impl MarketplaceTokenProvider for FailingProvider {
        async fn fetch_token(&self, _tenant_id: i64) -> Result<Value, String> {
            Err("marketplace unreachable".into())
        }
    }

    #[tokio::test]
    async fn first_use_mints_then_hits_the_cache() {
        let cache = MarketplaceTokenCache::new(CountingProvider::new());

        let first = cache.token_for(1).await.unwrap();
        let second = cache.token_for(1).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.provider.calls.load(Ordering::SeqCst), 1);

        // A different tenant gets its own token.
        cache.token_for(2).await.unwrap();
        assert_eq!(cache.provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_re_mints_known_tenants() {
        let cache = MarketplaceTokenCache::new(CountingProvider::new());

        let before = cache.token_for(1).await.unwrap();
        cache.refresh_all().await;
        let after = cache.token_for(1).await.unwrap();

        assert_ne!(before, after);
        assert_eq!(cache.provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn first_mint_failure_surfaces_to_the_caller() {
        let cache = MarketplaceTokenCache::new(FailingProvider);
        assert!(cache.token_for(1).await.is_err());
    }

    #[tokio::test]
    async fn secret_store_adapter_keys_by_tenant_not_uid() {
        let cache = MarketplaceTokenCache::new(CountingProvider::new());

        let a = cache.fetch_extra("uid-a", 7).await.unwrap();
        let b = cache.fetch_extra("uid-b", 7).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.provider.calls.load(Ordering::SeqCst), 1);
    }
}
