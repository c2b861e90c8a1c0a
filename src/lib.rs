// src/lib.rs
// Public library surface for integration tests (and the widget daemon).

pub mod display;
pub mod error;
pub mod feed;
pub mod gate;
pub mod location;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::display::{DisplayItem, EventList, MagnitudeTier, RenderSurface, SurfaceMetadata};
pub use crate::error::{LocationError, ProviderError};
pub use crate::feed::dedup::{DedupIndex, DuplicateKey};
pub use crate::feed::types::{AggregatedFeed, EventProvider, EventRecord, TimeWindow};
pub use crate::gate::{GateDecision, RefreshGate};
pub use crate::location::{
    FixSubscription, LocationFix, LocationProviderId, LocationResolver, LocationSource,
};
pub use crate::store::{KvStore, MemoryStore};
