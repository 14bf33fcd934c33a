//! Shared asset handles with an atomic live-reference count

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A shared handle to a cached payload.
///
/// Each live handle holds one reference on its cache entry. Cloning adds a
/// reference and dropping releases it, so an entry can only be evicted once
/// every handle is gone. Handles are `Send + Sync` when `T` is; the payload's
/// own interior mutability is the caller's concern.
pub struct AssetHandle<T: ?Sized> {
    path: Arc<str>,
    payload: Arc<T>,
    refs: Arc<AtomicUsize>,
}

impl<T: ?Sized> AssetHandle<T> {
    /// Wrap a payload, taking one reference on `refs`
    pub(crate) fn acquire(path: Arc<str>, payload: Arc<T>, refs: Arc<AtomicUsize>) -> Self {
        refs.fetch_add(1, Ordering::AcqRel);
        Self {
            path,
            payload,
            refs,
        }
    }

    /// Canonical path of the cached asset
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current live reference count of the underlying entry
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    /// The shared payload
    pub fn payload(&self) -> &Arc<T> {
        &self.payload
    }

    /// Whether two handles share one payload
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.payload, &b.payload)
    }
}

impl<T: ?Sized> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self::acquire(self.path.clone(), self.payload.clone(), self.refs.clone())
    }
}

impl<T: ?Sized> Drop for AssetHandle<T> {
    fn drop(&mut self) {
        release_ref(&self.refs);
    }
}

impl<T: ?Sized> Deref for AssetHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.payload
    }
}

impl<T: ?Sized> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle")
            .field("path", &self.path)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// Decrement a reference count without wrapping below zero.
/// Returns false when the count was already zero.
pub(crate) fn release_ref(refs: &AtomicUsize) -> bool {
    refs.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .is_ok()
}
