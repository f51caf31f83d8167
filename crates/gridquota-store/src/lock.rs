//! Per-user advisory locks

use dashmap::DashMap;
use gridquota_common::UserId;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// One mutex per user document, created on first use
#[derive(Default)]
pub(crate) struct LockTable {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl LockTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Handle to the lock guarding `user`'s document
    pub(crate) fn handle(&self, user: &UserId) -> DocumentLock {
        let mutex = self.locks.entry(user.clone()).or_default().clone();
        DocumentLock { mutex }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

pub(crate) struct DocumentLock {
    mutex: Arc<Mutex<()>>,
}

impl DocumentLock {
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.mutex.lock()
    }
}
