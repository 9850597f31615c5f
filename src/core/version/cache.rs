// ─── Descriptor Cache ───
// Resolved descriptors and parsed asset indexes, owned by one installer.
// Both maps are bounded and evict the least recently used entry first.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;

use super::descriptor::VersionDescriptor;
use crate::core::assets::AssetIndex;

pub struct DescriptorCache {
    versions: Mutex<LruCache<String, Arc<VersionDescriptor>>>,
    asset_indexes: Mutex<LruCache<String, Arc<AssetIndex>>>,
}

impl DescriptorCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            versions: Mutex::new(LruCache::new(capacity)),
            asset_indexes: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn version(&self, id: &str) -> Option<Arc<VersionDescriptor>> {
        lock(&self.versions).get(id).cloned()
    }

    pub fn insert_version(&self, descriptor: VersionDescriptor) -> Arc<VersionDescriptor> {
        let descriptor = Arc::new(descriptor);
        lock(&self.versions).put(descriptor.id.clone(), Arc::clone(&descriptor));
        descriptor
    }

    pub fn asset_index(&self, id: &str) -> Option<Arc<AssetIndex>> {
        lock(&self.asset_indexes).get(id).cloned()
    }

    pub fn insert_asset_index(&self, id: &str, index: AssetIndex) -> Arc<AssetIndex> {
        let index = Arc::new(index);
        lock(&self.asset_indexes).put(id.to_string(), Arc::clone(&index));
        index
    }

    pub fn clear(&self) {
        lock(&self.versions).clear();
        lock(&self.asset_indexes).clear();
    }
}

impl std::fmt::Debug for DescriptorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorCache")
            .field("versions", &lock(&self.versions).len())
            .field("asset_indexes", &lock(&self.asset_indexes).len())
            .finish()
    }
}

// A poisoned lock only means another thread panicked mid-insert; the map
// itself is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
