use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use autohide_ipc::TrackingId;

/// Bijective map between native window handles and tracking ids.
///
/// Written by discovery, read by the driver and the pump thread. Bindings are
/// never removed, so a closed window keeps its entry for the process lifetime.
#[derive(Debug)]
pub struct Registry<H> {
    inner: RwLock<Bindings<H>>,
}

#[derive(Debug)]
struct Bindings<H> {
    by_handle: HashMap<H, TrackingId>,
    by_id: HashMap<TrackingId, H>,
}

impl<H: Copy + Eq + Hash> Registry<H> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Bindings {
                by_handle: HashMap::new(),
                by_id: HashMap::new(),
            }),
        }
    }

    pub fn lookup_handle(&self, id: TrackingId) -> Option<H> {
        let bindings = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        bindings.by_id.get(&id).copied()
    }

    pub fn lookup_id(&self, handle: H) -> Option<TrackingId> {
        let bindings = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        bindings.by_handle.get(&handle).copied()
    }

    /// Bind `handle` to `id`. No-op returning false if either side is already bound.
    pub fn bind(&self, handle: H, id: TrackingId) -> bool {
        let mut bindings = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if bindings.by_handle.contains_key(&handle) || bindings.by_id.contains_key(&id) {
            return false;
        }
        bindings.by_handle.insert(handle, id);
        bindings.by_id.insert(id, handle);
        true
    }

    pub fn is_bound(&self, id: TrackingId) -> bool {
        self.lookup_handle(id).is_some()
    }

    pub fn contains_handle(&self, handle: H) -> bool {
        self.lookup_id(handle).is_some()
    }

    pub fn handles(&self) -> Vec<H> {
        let bindings = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        bindings.by_handle.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        let bindings = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        bindings.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: Copy + Eq + Hash> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}
