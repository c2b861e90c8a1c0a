// src/feed/providers/mod.rs
pub mod emsc;
pub mod usgs;

use std::time::Duration;

/// Bounded request timeout shared by both feed clients.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
