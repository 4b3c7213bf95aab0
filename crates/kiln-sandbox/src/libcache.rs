//! Process-wide library cache
//!
//! External libraries referenced by a script are fetched at most once per
//! name for the lifetime of the process. Racing fetches for the same name
//! collapse into one; a failed fetch is logged and not cached, so a later
//! job may retry.

use std::sync::Arc;

use moka::future::Cache;

/// Fetches library bytes by name from an external collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LibraryFetcher: Send + Sync {
    /// Fetch the named library's bytes
    ///
    /// # Errors
    /// Any transport or lookup failure; the caller logs it and proceeds
    /// without staging the library.
    async fn fetch(&self, name: &str) -> anyhow::Result<Vec<u8>>;
}

/// Read-mostly cache of fetched libraries, keyed by name
#[derive(Clone)]
pub struct LibraryCache {
    entries: Cache<String, Arc<Vec<u8>>>,
    fetcher: Arc<dyn LibraryFetcher>,
}

impl LibraryCache {
    /// Default cache capacity (libraries are few and small)
    const CAPACITY: u64 = 256;

    /// Create a cache backed by the given fetcher
    #[must_use]
    pub fn new(fetcher: Arc<dyn LibraryFetcher>) -> Self {
        Self {
            entries: Cache::new(Self::CAPACITY),
            fetcher,
        }
    }

    /// Get a library's bytes, fetching on first use
    ///
    /// Returns `None` when the fetch fails; compilation proceeds without the
    /// library and may fail later with a clearer compiler-level error.
    pub async fn get(&self, name: &str) -> Option<Arc<Vec<u8>>> {
        let fetcher = Arc::clone(&self.fetcher);
        let owned = name.to_string();
        let result = self
            .entries
            .try_get_with(owned.clone(), async move {
                fetcher.fetch(&owned).await.map(Arc::new)
            })
            .await;

        match result {
            Ok(bytes) => Some(bytes),
            Err(error) => {
                tracing::warn!(library = %name, %error, "library fetch failed; not staged");
                None
            }
        }
    }

    /// Number of cached libraries
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl std::fmt::Debug for LibraryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryCache")
            .field("entries", &self.entries.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl LibraryFetcher for CountingFetcher {
        async fn fetch(&self, name: &str) -> anyhow::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("no such library: {name}");
            }
            Ok(name.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn fetches_at_most_once_per_name() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cache = LibraryCache::new(Arc::clone(&fetcher) as Arc<dyn LibraryFetcher>);

        let first = cache.get("threads.scad").await.unwrap();
        let second = cache.get("threads.scad").await.unwrap();

        assert_eq!(*first, b"threads.scad".to_vec());
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_names_fetch_separately() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let cache = LibraryCache::new(Arc::clone(&fetcher) as Arc<dyn LibraryFetcher>);

        cache.get("a.scad").await.unwrap();
        cache.get("b.scad").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_returns_none_and_is_not_cached() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let cache = LibraryCache::new(Arc::clone(&fetcher) as Arc<dyn LibraryFetcher>);

        assert!(cache.get("missing.scad").await.is_none());
        assert!(cache.get("missing.scad").await.is_none());
        // A failure does not populate the cache, so the second call retried.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mock_fetcher_integrates() {
        let mut mock = MockLibraryFetcher::new();
        mock.expect_fetch()
            .times(1)
            .returning(|_| Ok(vec![1, 2, 3]));

        let cache = LibraryCache::new(Arc::new(mock));
        let bytes = cache.get("gears.scad").await.unwrap();
        assert_eq!(*bytes, vec![1, 2, 3]);
    }
}
