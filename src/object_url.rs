//! Revocable local object references.
//!
//! A preview of the selected image and the temporary object created while
//! downloading are both [`ObjectUrl`]s. The reference stays resolvable for
//! exactly as long as the guard is alive; dropping it revokes the URL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    next_id: AtomicU64,
    objects: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl Inner {
    fn objects(&self) -> MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        // A poisoned map only means a panic happened mid-insert; the data is still usable.
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Issues and tracks [`ObjectUrl`]s.
///
/// Cloning is cheap; all clones share the same set of live objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    inner: Arc<Inner>,
}

impl ObjectUrlRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` and return a guard holding its URL.
    pub fn create(&self, bytes: impl Into<Arc<[u8]>>) -> ObjectUrl {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("blob:watermark-eraser/{id}");
        self.inner.objects().insert(url.clone(), bytes.into());
        tracing::trace!(%url, "object url created");
        ObjectUrl {
            url,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Look up the bytes behind a live URL.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.inner.objects().get(url).cloned()
    }

    /// Number of URLs currently outstanding.
    #[must_use]
    pub fn live(&self) -> usize {
        self.inner.objects().len()
    }
}

/// A live object URL. Revoked on drop.
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    registry: Arc<Inner>,
}

impl ObjectUrl {
    /// The URL string, valid until this guard is dropped.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.objects().remove(&self.url);
        tracing::trace!(url = %self.url, "object url revoked");
    }
}
