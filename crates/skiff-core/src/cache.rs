use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use skiff_model::{Arn, CacheKey, TaskDefinition};
use tracing::{debug, info, warn};

use crate::{ContainerService, EngineError, diff::task_definitions_equal};

/// Registered task definition ARNs keyed by deployment or job.
///
/// Cloning shares the underlying map. Each key also owns an async lock so concurrent
/// invocations for the same key register at most once.
#[derive(Debug, Clone, Default)]
pub struct DefinitionCache {
    entries: Arc<RwLock<HashMap<CacheKey, Arn>>>,
    locks: Arc<Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arn> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<CacheKey>, arn: impl Into<Arn>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.into(), arn.into());
    }

    pub fn evict(&self, key: &str) -> Option<Arn> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Drop the per-key lock once no other invocation holds or waits on it.
    fn release_key_lock(&self, key: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks.get(key).is_some_and(|held| Arc::strong_count(held) == 1) {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Return an ARN whose document matches `desired`, registering only when needed.
///
/// A cached ARN that can no longer be described is evicted. Any mismatch registers a new
/// revision and replaces the cached entry.
pub async fn resolve_definition_arn(
    cache: &DefinitionCache,
    key: &str,
    desired: &TaskDefinition,
    service: &dyn ContainerService,
) -> Result<Arn, EngineError> {
    let lock = cache.key_lock(key);
    let result = {
        let _guard = lock.lock().await;
        resolve_locked(cache, key, desired, service).await
    };
    cache.release_key_lock(key, lock);
    result
}

async fn resolve_locked(
    cache: &DefinitionCache,
    key: &str,
    desired: &TaskDefinition,
    service: &dyn ContainerService,
) -> Result<Arn, EngineError> {
    if let Some(cached) = cache.get(key) {
        match service.describe_task_definition(&cached).await {
            Ok(existing) => {
                if task_definitions_equal(&existing, desired)? {
                    debug!(target: "skiff.engine", key, arn = %cached, "reusing cached task definition");
                    return Ok(cached);
                }
                debug!(target: "skiff.engine", key, arn = %cached, "cached task definition is stale");
            }
            Err(e) => {
                warn!(target: "skiff.engine", key, arn = %cached, error = %e, "evicting unreadable task definition");
                cache.evict(key);
            }
        }
    }

    let arn = service.register_task_definition(desired).await?;
    info!(
        target: "skiff.engine",
        key,
        arn = %arn,
        family = ?desired.family,
        "registered task definition"
    );
    cache.insert(key, arn.clone());
    Ok(arn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ServiceError, service::memory::InMemoryService};
    use skiff_model::ContainerDefinition;

    fn definition(image: &str) -> TaskDefinition {
        let mut container = ContainerDefinition::named("skiff");
        container.image = Some(image.into());
        TaskDefinition {
            family: Some("etl".into()),
            container_definitions: vec![container],
            cpu: Some("1024".into()),
            memory: Some("2048".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn identical_definition_is_registered_once() {
        let service = InMemoryService::new("us-east-1");
        let cache = DefinitionCache::new();
        let desired = definition("alpine");

        let first = resolve_definition_arn(&cache, "job-1", &desired, &service)
            .await
            .unwrap();
        let second = resolve_definition_arn(&cache, "job-1", &desired, &service)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(service.registrations(), 1);
    }

    #[tokio::test]
    async fn image_change_registers_exactly_once_more() {
        let service = InMemoryService::new("us-east-1");
        let cache = DefinitionCache::new();

        let old = resolve_definition_arn(&cache, "job-1", &definition("alpine:3.19"), &service)
            .await
            .unwrap();
        let new = resolve_definition_arn(&cache, "job-1", &definition("alpine:3.20"), &service)
            .await
            .unwrap();

        assert_ne!(old, new);
        assert_eq!(service.registrations(), 2);
        assert_eq!(cache.get("job-1"), Some(new));
    }

    #[tokio::test]
    async fn unreadable_entry_is_evicted_and_replaced() {
        let service = InMemoryService::new("us-east-1");
        let cache = DefinitionCache::new();
        cache.insert("job-1", "arn:aws:ecs:us-east-1:000000000000:task-definition/gone:1");

        let arn = resolve_definition_arn(&cache, "job-1", &definition("alpine"), &service)
            .await
            .unwrap();

        assert_ne!(arn, "arn:aws:ecs:us-east-1:000000000000:task-definition/gone:1");
        assert_eq!(cache.get("job-1"), Some(arn));
        assert_eq!(service.registrations(), 1);
    }

    #[tokio::test]
    async fn describe_failure_falls_through_to_registration() {
        let service = InMemoryService::new("us-east-1");
        let cache = DefinitionCache::new();
        let desired = definition("alpine");
        resolve_definition_arn(&cache, "job-1", &desired, &service)
            .await
            .unwrap();

        service.fail_next_describe_definition(ServiceError::new(
            "DescribeTaskDefinition",
            "ThrottlingException",
            "rate exceeded",
        ));
        resolve_definition_arn(&cache, "job-1", &desired, &service)
            .await
            .unwrap();

        assert_eq!(service.registrations(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolves_for_one_key_register_once() {
        let service = Arc::new(InMemoryService::new("us-east-1"));
        let cache = DefinitionCache::new();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                resolve_definition_arn(&cache, "job-1", &definition("alpine"), service.as_ref())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(service.registrations(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lock_count(), 0);
    }

    #[tokio::test]
    async fn key_locks_are_released_after_resolution() {
        let service = InMemoryService::new("us-east-1");
        let cache = DefinitionCache::new();

        for key in ["job-1", "job-2", "job-3"] {
            resolve_definition_arn(&cache, key, &definition("alpine"), &service)
                .await
                .unwrap();
        }

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.lock_count(), 0);
    }
}
