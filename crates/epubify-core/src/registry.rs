use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use crate::error::AppError;
use crate::job::Job;

/// Key-value store of job records, shared between the orchestrator and the
/// status/download collaborators.
///
/// Implementations must be safe for concurrent upserts; last writer wins per
/// job, which is fine because only the orchestrator for a job writes it.
pub trait TaskRegistry: Send + Sync + Clone + 'static {
    fn get(&self, id: Uuid) -> impl Future<Output = Result<Option<Job>, AppError>> + Send;

    fn upsert(&self, job: Job) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Returns true if a record was removed.
    fn remove(&self, id: Uuid) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn len(&self) -> impl Future<Output = Result<u64, AppError>> + Send;
}

pub const DEFAULT_TASK_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_TASK_CAPACITY: u64 = 10_000;

/// In-process registry backed by a moka cache.
///
/// Entries expire after the configured time-to-live; nothing survives a
/// restart.
#[derive(Clone)]
pub struct MemoryRegistry {
    cache: Cache<Uuid, Job>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TASK_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(DEFAULT_TASK_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry for MemoryRegistry {
    async fn get(&self, id: Uuid) -> Result<Option<Job>, AppError> {
        Ok(self.cache.get(&id).await)
    }

    async fn upsert(&self, job: Job) -> Result<(), AppError> {
        self.cache.insert(job.id, job).await;
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.cache.remove(&id).await.is_some())
    }

    async fn len(&self) -> Result<u64, AppError> {
        self.cache.run_pending_tasks().await;
        Ok(self.cache.entry_count())
    }
}
