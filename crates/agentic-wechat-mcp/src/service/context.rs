//! Composition root: one cache, one token holder, both service facades.

use std::path::Path;
use std::sync::Arc;

use agentic_wechat::{CacheStore, ClientConfig, OfficialAccountService, PublicSearchService};

use crate::types::McpResult;

/// Everything a tool needs. Built once at startup and shared by reference.
pub struct ServiceContext {
    cache: Arc<CacheStore>,
    official: OfficialAccountService,
    public: PublicSearchService,
}

impl ServiceContext {
    /// Open the persistent cache at `cache_dir` and wire the services to it.
    pub fn open(cache_dir: &Path, config: &ClientConfig) -> McpResult<Self> {
        let cache = Arc::new(CacheStore::new(cache_dir)?);
        tracing::info!("Cache directory: {}", cache_dir.display());
        Self::with_cache(cache, config)
    }

    pub fn with_cache(cache: Arc<CacheStore>, config: &ClientConfig) -> McpResult<Self> {
        let official = OfficialAccountService::new(config, Arc::clone(&cache))?;
        let public = PublicSearchService::new(config, Arc::clone(&cache))?;

        tracing::info!(
            "Official account API: {}",
            if official.is_configured() {
                "configured"
            } else {
                "not configured"
            }
        );

        Ok(Self {
            cache,
            official,
            public,
        })
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Evict expired cache entries on the blocking pool; the disk scan can be slow.
    pub async fn sweep_cache(&self) -> usize {
        let cache = Arc::clone(&self.cache);
        match tokio::task::spawn_blocking(move || cache.clear_expired()).await {
            Ok(swept) => swept,
            Err(e) => {
                tracing::warn!("Cache sweep failed: {e}");
                0
            }
        }
    }

    pub fn official(&self) -> &OfficialAccountService {
        &self.official
    }

    pub fn public(&self) -> &PublicSearchService {
        &self.public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_share_one_cache() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ServiceContext::open(dir.path(), &ClientConfig::default()).unwrap();
        assert!(Arc::ptr_eq(ctx.cache(), ctx.official().cache()));
        assert_eq!(ctx.cache().dir(), Some(dir.path()));
        assert!(!ctx.official().is_configured());
    }

    #[tokio::test]
    async fn test_sweep_removes_unreadable_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"kept").unwrap();

        let ctx = ServiceContext::open(dir.path(), &ClientConfig::default()).unwrap();
        assert_eq!(ctx.sweep_cache().await, 1);
        assert!(!dir.path().join("broken.json").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
