use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a GPU-backed resource.
///
/// Textures, shaders, buffers and render targets compare by `ResourceId`
/// rather than by content. Reconstructing a resource assigns a fresh id, so
/// anything caching the old binding sees a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u64);

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

impl ResourceId {
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}
