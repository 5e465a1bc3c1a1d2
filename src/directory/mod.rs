//! In-memory directory snapshot with stale-while-revalidate refreshes.
//!
//! Every fetch gets a token from a monotonic counter. A finished fetch is
//! only applied if no fetch issued after it has been applied already, so a
//! slow early request can never overwrite a newer result.
//!
//! A failed fetch only becomes the current snapshot while nothing has loaded.
//! Once a directory is loaded it keeps being served through upstream outages.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::{FetchError, FetchErrorKind};
use crate::fetch::DirectoryFetcher;
use crate::filter::{DisplayOrder, FacetSet};
use crate::models::{Directory, RevisionInfo, TalentRecord};

/// Result of one fetch cycle: a whole directory or the reason there is none.
#[derive(Debug)]
pub struct Snapshot {
    pub revision_id: u64,
    pub generated_at: String,
    pub outcome: Result<Arc<Directory>, FetchError>,
    loaded_at: Instant,
}

impl Snapshot {
    pub fn revision_info(&self) -> RevisionInfo {
        RevisionInfo {
            revision_id: self.revision_id,
            generated_at: self.generated_at.clone(),
        }
    }

    /// Failed snapshots are retried right away, except configuration
    /// failures, which only a restart with new settings can fix.
    fn is_stale(&self, max_age: Duration) -> bool {
        match &self.outcome {
            Ok(_) => self.loaded_at.elapsed() >= max_age,
            Err(e) => e.kind() != FetchErrorKind::Configuration,
        }
    }
}

/// Arrange fetched records for display and derive their facets.
pub fn assemble(
    records: Vec<TalentRecord>,
    order: DisplayOrder,
    revision_id: u64,
    generated_at: String,
) -> Directory {
    let designers = order.arrange(records);
    let facets = FacetSet::derive(&designers);
    Directory {
        revision_id,
        generated_at,
        designers,
        facets,
    }
}

/// Holds the most recently applied snapshot.
pub struct DirectoryCache {
    fetcher: DirectoryFetcher,
    order: DisplayOrder,
    revalidate: Duration,
    issued: AtomicU64,
    revalidating: AtomicBool,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl DirectoryCache {
    pub fn new(fetcher: DirectoryFetcher, order: DisplayOrder, revalidate: Duration) -> Self {
        Self {
            fetcher,
            order,
            revalidate,
            issued: AtomicU64::new(0),
            revalidating: AtomicBool::new(false),
            current: RwLock::new(None),
        }
    }

    /// Fetch now and return whichever snapshot is current afterwards.
    pub async fn refresh(&self) -> Arc<Snapshot> {
        let token = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let generated_at = Utc::now().to_rfc3339();

        let outcome = match self.fetcher.fetch().await {
            Ok(records) => Ok(Arc::new(assemble(
                records,
                self.order,
                token,
                generated_at.clone(),
            ))),
            Err(e) => {
                tracing::warn!(revision = token, kind = ?e.kind(), "Directory fetch failed: {}", e);
                Err(e)
            }
        };

        let snapshot = Arc::new(Snapshot {
            revision_id: token,
            generated_at,
            outcome,
            loaded_at: Instant::now(),
        });

        self.apply(snapshot).await
    }

    async fn apply(&self, snapshot: Arc<Snapshot>) -> Arc<Snapshot> {
        let mut current = self.current.write().await;
        if let Some(existing) = current.as_ref() {
            if existing.revision_id > snapshot.revision_id {
                tracing::debug!(
                    stale = snapshot.revision_id,
                    current = existing.revision_id,
                    "Discarding superseded fetch result"
                );
                return Arc::clone(existing);
            }
        }
        if let (Some(existing), Err(e)) = (current.as_ref(), &snapshot.outcome) {
            if let Ok(directory) = &existing.outcome {
                tracing::warn!(
                    failed = snapshot.revision_id,
                    kept = existing.revision_id,
                    "Keeping loaded directory after failed refresh: {}",
                    e
                );
                // Same generation, but wait a full interval before trying again
                let kept = Arc::new(Snapshot {
                    revision_id: existing.revision_id,
                    generated_at: existing.generated_at.clone(),
                    outcome: Ok(Arc::clone(directory)),
                    loaded_at: Instant::now(),
                });
                *current = Some(Arc::clone(&kept));
                return kept;
            }
        }
        *current = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Current snapshot, fetching inline when nothing has been loaded yet.
    ///
    /// A stale or retryable failed snapshot is still returned, with one
    /// background refresh started to replace it.
    pub async fn current(self: &Arc<Self>) -> Arc<Snapshot> {
        let existing = self.current.read().await.clone();
        match existing {
            None => self.refresh().await,
            Some(snapshot) => {
                if snapshot.is_stale(self.revalidate) {
                    self.spawn_revalidation();
                }
                snapshot
            }
        }
    }

    fn spawn_revalidation(self: &Arc<Self>) {
        if self.revalidating.swap(true, Ordering::AcqRel) {
            return;
        }
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            cache.refresh().await;
            cache.revalidating.store(false, Ordering::Release);
        });
    }
}
