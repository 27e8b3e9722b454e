use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::download::metadata::AnalyzeResult;

/// One cached analysis; never mutated after insertion.
#[derive(Debug, Clone)]
struct CachedAnalysis {
    result: Arc<AnalyzeResult>,
    cached_at: Instant,
}

/// URL → analysis cache with a fixed TTL
pub struct AnalysisCache {
    entries: Mutex<HashMap<String, CachedAnalysis>>,
    ttl: Duration,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl AnalysisCache {
    /// Creates a cache whose entries expire `ttl` after insertion
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached analysis, or None if absent or expired
    pub async fn get(&self, url: &str) -> Option<Arc<AnalyzeResult>> {
        let mut entries = self.entries.lock().await;

        if let Some(cached) = entries.get(url) {
            if cached.cached_at.elapsed() < self.ttl {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&cached.result));
            }
            entries.remove(url);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores an analysis. A concurrent miss for the same URL simply
    /// overwrites with an equivalent value.
    pub async fn insert(&self, url: &str, result: Arc<AnalyzeResult>) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            url.to_string(),
            CachedAnalysis {
                result,
                cached_at: Instant::now(),
            },
        );
    }

    /// Removes expired entries
    pub async fn cleanup(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, cached| cached.cached_at.elapsed() < self.ttl);
        let removed = before - entries.len();
        log::debug!("Cleaned up {} expired analysis entries", removed);
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let size = self.entries.lock().await.len();
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            size,
            hits,
            misses,
            hit_rate,
        }
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
        self.hit_count.store(0, Ordering::Relaxed);
        self.miss_count.store(0, Ordering::Relaxed);
        log::info!("Analysis cache cleared");
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Periodically drops expired entries until `shutdown` fires.
pub fn spawn_cleanup_task(
    cache: Arc<AnalysisCache>,
    every: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = cache.cleanup().await;
                    let stats = cache.stats().await;
                    log::debug!(
                        "[Cache] swept {} expired; size={} hits={} misses={} hit_rate={:.1}%",
                        removed,
                        stats.size,
                        stats.hits,
                        stats.misses,
                        stats.hit_rate
                    );
                }
            }
        }
        log::debug!("Analysis cache cleanup task stopped");
    })
}
