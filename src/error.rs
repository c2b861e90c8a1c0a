// src/error.rs
use thiserror::Error;

/// Provider-local failures. None of these escalate past the pipeline: a
/// failing provider contributes zero records and the run continues.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} fetch failed: {source}")]
    Fetch {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned status {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("parsing {provider} payload: {source}")]
    Parse {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Fetch { provider, .. }
            | Self::Status { provider, .. }
            | Self::Parse { provider, .. } => provider,
        }
    }
}

/// Location resolution failures. Distinct from a `None` fix: a caller seeing
/// `PermissionDenied` prompts for permission instead of rendering "location
/// unavailable".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
}
