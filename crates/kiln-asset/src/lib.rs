//! Kiln Asset - Shared asset cache and load queue
//!
//! Maps canonical paths to shared, reference-counted payloads produced by
//! pluggable per-kind loaders. Unreferenced entries are evicted by an
//! explicit garbage-collection pass driven by idle time and a size budget.

mod cache;
mod handle;
mod queue;
mod types;

pub use cache::{canonical_path, AssetCache, LoadedAsset};
pub use handle::AssetHandle;
pub use queue::{LoadQueue, LoadRequester};
pub use types::{AssetKind, AssetStats};
