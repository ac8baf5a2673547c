//! client::locking
//!
//! Per-resource locking for mutating operations.
//!
//! # Architecture
//!
//! Two LVM processes mutating the same volume group race on its on-disk
//! metadata. [`LockingClient`] wraps another client and, for every
//! mutating operation, holds an exclusive lock on each resource the
//! operation names (see [`ResourceScope`]) while the delegate runs.
//! Read-only operations pass straight through, even while a write lock on
//! the same name is held.
//!
//! Locks live in a [`LockRegistry`]: a map from resource name to a tokio
//! mutex, created on first use and removed once nobody holds or waits for
//! it. The map itself is behind a short-lived std mutex that is held only
//! to look up, insert or prune an entry, never while an LVM command runs.
//!
//! # Invariants
//!
//! - Two operations sharing a resource name never run concurrently
//! - Operations on disjoint names never contend
//! - Multi-key operations (renames, PV lists) take their keys sorted and
//!   deduplicated, so two of them cannot deadlock
//! - Locks are released when the [`ResourceLock`] guard drops, on every
//!   exit path
//!
//! Waiting is fair in arrival order (tokio's mutex is FIFO), but callers
//! should rely on mutual exclusion only.
//!
//! # Example
//!
//! ```
//! use lvmkit::client::LockRegistry;
//! use lvmkit::exec::ExecContext;
//!
//! # tokio_test::block_on(async {
//! let registry = LockRegistry::new();
//! let ctx = ExecContext::new();
//! let lock = registry.acquire(&ctx, ["vg0".to_string()]).await.unwrap();
//! assert_eq!(lock.keys(), ["vg0"]);
//! drop(lock);
//! # });
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::errors::ClientError;
use super::report::{
    DeviceListEntry, LogicalVolume, PhysicalVolume, Version, VolumeGroup,
};
use super::Client;
use crate::core::options::{
    DevCheckOptions, DevListOptions, DevModifyOptions, DevUpdateOptions, LvChangeOptions,
    LvCreateOptions, LvExtendOptions, LvReduceOptions, LvRemoveOptions, LvRenameOptions,
    LvResizeOptions, LvsOptions, OptionList, OptionSet, PvChangeOptions, PvCreateOptions,
    PvMoveOptions, PvRemoveOptions, PvResizeOptions, PvsOptions, ResourceScope, VersionOptions,
    VgChangeOptions, VgCreateOptions, VgExtendOptions, VgReduceOptions, VgRemoveOptions,
    VgRenameOptions, VgsOptions,
};
use crate::exec::ExecContext;

/// Errors from lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    /// The context was cancelled while waiting for the lock.
    #[error("cancelled while waiting for lock on '{resource}'")]
    Cancelled { resource: String },
}

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Map from resource name to its lock.
///
/// Entries are created on first use and removed once nobody holds or waits
/// for them, so the map only grows with the number of resources in flight.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: LockMap,
}

/// Drop `key` from the map if the map holds the only reference to its lock.
fn prune(locks: &LockMap, key: &str) {
    let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
    if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
        locks.remove(key);
    }
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Number of resource names currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Acquire every key, blocking until each is free.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Cancelled` if the context's cancellation token
    /// fires first. Keys acquired so far are released.
    pub async fn acquire(
        &self,
        ctx: &ExecContext,
        keys: impl IntoIterator<Item = String>,
    ) -> Result<ResourceLock, LockError> {
        let keys: BTreeSet<String> = keys.into_iter().collect();
        let mut held = ResourceLock {
            keys: Vec::with_capacity(keys.len()),
            guards: Vec::with_capacity(keys.len()),
            locks: Arc::clone(&self.locks),
        };

        for key in keys {
            let lock = self.lock_for(&key);
            tracing::trace!(resource = %key, "waiting for resource lock");
            let guard = match ctx.cancellation() {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => None,
                    guard = lock.lock_owned() => Some(guard),
                },
                None => Some(lock.lock_owned().await),
            };
            let Some(guard) = guard else {
                drop(held);
                prune(&self.locks, &key);
                return Err(LockError::Cancelled { resource: key });
            };
            held.keys.push(key);
            held.guards.push(guard);
        }

        tracing::debug!(resources = ?held.keys, "acquired resource locks");
        Ok(held)
    }
}

/// Held resource locks. Released on drop.
#[derive(Debug)]
pub struct ResourceLock {
    keys: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
    locks: LockMap,
}

impl ResourceLock {
    /// Locked resource names, sorted.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl Drop for ResourceLock {
    fn drop(&mut self) {
        self.guards.clear();
        for key in &self.keys {
            prune(&self.locks, key);
        }
        if !self.keys.is_empty() {
            tracing::trace!(resources = ?self.keys, "released resource locks");
        }
    }
}

/// Client decorator serializing mutating operations per resource.
#[derive(Debug, Clone)]
pub struct LockingClient<C> {
    inner: C,
    registry: Arc<LockRegistry>,
}

impl<C: Client> LockingClient<C> {
    /// Wrap `inner` with a fresh registry.
    pub fn new(inner: C) -> Self {
        Self::with_registry(inner, Arc::new(LockRegistry::new()))
    }

    /// Wrap `inner`, sharing `registry` with other locking clients.
    pub fn with_registry(inner: C, registry: Arc<LockRegistry>) -> Self {
        Self { inner, registry }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn registry(&self) -> &Arc<LockRegistry> {
        &self.registry
    }

    /// Validate `opts` and lock the resources they name. A volume group
    /// the options leave out is taken from the context's default, the same
    /// way the delegate will resolve it.
    async fn lock<S: OptionSet + ResourceScope>(
        &self,
        ctx: &ExecContext,
        opts: &OptionList<S>,
    ) -> Result<ResourceLock, ClientError> {
        let scope = opts.aggregate_scoped(ctx.default_volume_group());
        scope.validate()?;
        Ok(self.registry.acquire(ctx, scope.lock_keys()).await?)
    }
}

#[async_trait]
impl<C: Client> Client for LockingClient<C> {
    async fn version(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VersionOptions>,
    ) -> Result<Version, ClientError> {
        self.inner.version(ctx, opts).await
    }

    async fn vg(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgsOptions>,
    ) -> Result<VolumeGroup, ClientError> {
        self.inner.vg(ctx, opts).await
    }

    async fn vgs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgsOptions>,
    ) -> Result<Vec<VolumeGroup>, ClientError> {
        self.inner.vgs(ctx, opts).await
    }

    async fn vg_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgCreateOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.vg_create(ctx, opts).await
    }

    async fn vg_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRemoveOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.vg_remove(ctx, opts).await
    }

    async fn vg_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgExtendOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.vg_extend(ctx, opts).await
    }

    async fn vg_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgReduceOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.vg_reduce(ctx, opts).await
    }

    async fn vg_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRenameOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.vg_rename(ctx, opts).await
    }

    async fn vg_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgChangeOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.vg_change(ctx, opts).await
    }

    async fn lv(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvsOptions>,
    ) -> Result<LogicalVolume, ClientError> {
        self.inner.lv(ctx, opts).await
    }

    async fn lvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvsOptions>,
    ) -> Result<Vec<LogicalVolume>, ClientError> {
        self.inner.lvs(ctx, opts).await
    }

    async fn lv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvCreateOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.lv_create(ctx, opts).await
    }

    async fn lv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRemoveOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.lv_remove(ctx, opts).await
    }

    async fn lv_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvExtendOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.lv_extend(ctx, opts).await
    }

    async fn lv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvResizeOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.lv_resize(ctx, opts).await
    }

    async fn lv_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvReduceOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.lv_reduce(ctx, opts).await
    }

    async fn lv_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRenameOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.lv_rename(ctx, opts).await
    }

    async fn lv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvChangeOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.lv_change(ctx, opts).await
    }

    async fn pvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvsOptions>,
    ) -> Result<Vec<PhysicalVolume>, ClientError> {
        self.inner.pvs(ctx, opts).await
    }

    async fn pv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvCreateOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.pv_create(ctx, opts).await
    }

    async fn pv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvRemoveOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.pv_remove(ctx, opts).await
    }

    async fn pv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvResizeOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.pv_resize(ctx, opts).await
    }

    async fn pv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvChangeOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.pv_change(ctx, opts).await
    }

    async fn pv_move(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvMoveOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.pv_move(ctx, opts).await
    }

    async fn dev_list(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevListOptions>,
    ) -> Result<Vec<DeviceListEntry>, ClientError> {
        self.inner.dev_list(ctx, opts).await
    }

    async fn dev_check(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevCheckOptions>,
    ) -> Result<(), ClientError> {
        self.inner.dev_check(ctx, opts).await
    }

    async fn dev_update(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevUpdateOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.dev_update(ctx, opts).await
    }

    async fn dev_modify(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevModifyOptions>,
    ) -> Result<(), ClientError> {
        let _lock = self.lock(ctx, &opts).await?;
        self.inner.dev_modify(ctx, opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn keys_are_sorted_and_deduplicated() {
        let registry = LockRegistry::new();
        let lock = registry
            .acquire(
                &ExecContext::new(),
                ["vg1".to_string(), "vg0".to_string(), "vg1".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(lock.keys(), ["vg0", "vg1"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn same_key_blocks_until_released() {
        let registry = Arc::new(LockRegistry::new());
        let ctx = ExecContext::new();
        let held = registry.acquire(&ctx, ["vg0".to_string()]).await.unwrap();

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .acquire(&ExecContext::new(), ["vg0".to_string()])
                    .await
                    .map(|lock| lock.keys().to_vec())
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let keys = waiter.await.unwrap().unwrap();
        assert_eq!(keys, ["vg0"]);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let registry = LockRegistry::new();
        let ctx = ExecContext::new();
        let _vg0 = registry.acquire(&ctx, ["vg0".to_string()]).await.unwrap();
        let vg1 = tokio::time::timeout(
            Duration::from_secs(1),
            registry.acquire(&ctx, ["vg1".to_string()]),
        )
        .await;
        assert!(vg1.is_ok());
    }

    #[tokio::test]
    async fn cancellation_while_waiting() {
        let registry = LockRegistry::new();
        let _held = registry
            .acquire(&ExecContext::new(), ["vg0".to_string()])
            .await
            .unwrap();

        let token = CancellationToken::new();
        let ctx = ExecContext::new().with_cancellation(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let err = registry
            .acquire(&ctx, ["vg0".to_string()])
            .await
            .unwrap_err();
        canceller.await.unwrap();
        assert!(matches!(err, LockError::Cancelled { ref resource } if resource == "vg0"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_acquisition_holds_nothing() {
        let registry = LockRegistry::new();
        let _vg1 = registry
            .acquire(&ExecContext::new(), ["vg1".to_string()])
            .await
            .unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let ctx = ExecContext::new().with_cancellation(token);
        let result = registry
            .acquire(&ctx, ["vg0".to_string(), "vg1".to_string()])
            .await;
        assert!(result.is_err());

        let vg0 = tokio::time::timeout(
            Duration::from_secs(1),
            registry.acquire(&ExecContext::new(), ["vg0".to_string()]),
        )
        .await;
        assert!(vg0.is_ok());
    }

    #[tokio::test]
    async fn released_locks_are_pruned() {
        let registry = LockRegistry::new();
        let ctx = ExecContext::new();
        for n in 0..100 {
            let lock = registry
                .acquire(&ctx, [format!("vg{n}"), format!("/dev/loop{n}")])
                .await
                .unwrap();
            assert_eq!(registry.len(), 2);
            drop(lock);
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn entries_survive_while_someone_waits() {
        let registry = Arc::new(LockRegistry::new());
        let held = registry
            .acquire(&ExecContext::new(), ["vg0".to_string()])
            .await
            .unwrap();

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .acquire(&ExecContext::new(), ["vg0".to_string()])
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        drop(held);
        let next = waiter.await.unwrap().unwrap();
        assert_eq!(registry.len(), 1);
        drop(next);
        assert!(registry.is_empty());
    }
}
