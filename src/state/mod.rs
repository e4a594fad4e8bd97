//! Client-side state containers, one per resource family.
//!
//! Each container is constructed with the [`ApiClient`] it uses (no
//! process-wide singletons) and exclusively owns its in-memory collection.
//! Mutations are confirm-then-patch: the cache changes only after the
//! backend accepted the call; on failure the message lands in the error
//! slot and the error still propagates so the caller can react. Nothing
//! here reconciles across containers — cross-entity joins live in
//! [`queries`] as pure functions over snapshots.

mod auth;
mod customers;
mod products;
pub mod queries;
mod sales;
mod stores;
mod users;

pub use auth::SessionState;
pub use customers::CustomerState;
pub use products::ProductState;
pub use sales::SaleState;
pub use stores::StoreState;
pub use users::UserState;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::ApiError;

/// Shared cache plumbing: the collection, a loading flag, and the last
/// error message. Lock scope is kept to single operations; no lock is held
/// across an await point.
pub(crate) struct ResourceCache<T> {
    items: Mutex<Vec<T>>,
    loading: AtomicBool,
    error: Mutex<Option<String>>,
}

impl<T: Clone> ResourceCache<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            loading: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    /// Snapshot of the cached collection.
    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.items.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        self.error.lock().ok().and_then(|e| e.clone())
    }

    pub(crate) fn begin(&self) {
        self.loading.store(true, Ordering::SeqCst);
        if let Ok(mut error) = self.error.lock() {
            *error = None;
        }
    }

    pub(crate) fn finish(&self) {
        self.loading.store(false, Ordering::SeqCst);
    }

    pub(crate) fn fail(&self, err: &ApiError) {
        self.loading.store(false, Ordering::SeqCst);
        if let Ok(mut error) = self.error.lock() {
            *error = Some(err.message().to_string());
        }
    }

    /// Replace the whole collection (fetch semantics).
    pub(crate) fn replace(&self, new_items: Vec<T>) {
        if let Ok(mut items) = self.items.lock() {
            *items = new_items;
        }
    }

    pub(crate) fn push(&self, item: T) {
        if let Ok(mut items) = self.items.lock() {
            items.push(item);
        }
    }

    /// Replace the element matching `matches`, or append when absent
    /// (update semantics after a confirmed mutation).
    pub(crate) fn upsert(&self, item: T, matches: impl Fn(&T) -> bool) {
        if let Ok(mut items) = self.items.lock() {
            match items.iter_mut().find(|existing| matches(existing)) {
                Some(existing) => *existing = item,
                None => items.push(item),
            }
        }
    }

    pub(crate) fn remove(&self, matches: impl Fn(&T) -> bool) {
        if let Ok(mut items) = self.items.lock() {
            items.retain(|existing| !matches(existing));
        }
    }

    /// Mutate the matching element in place (partial patch after confirm).
    pub(crate) fn patch(&self, matches: impl Fn(&T) -> bool, apply: impl FnOnce(&mut T)) {
        if let Ok(mut items) = self.items.lock() {
            if let Some(existing) = items.iter_mut().find(|existing| matches(existing)) {
                apply(existing);
            }
        }
    }
}
