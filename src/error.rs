//! Error taxonomy of the orchestration core.
//!
//! Per-asset failures never abort the frame loop. They are collected in the
//! [`crate::resources::slot::AssetRegistry`] and surfaced through
//! `errors()`. Audio failures are logged and either retried on the next user
//! play action ([`DioramaError::Playback`]) or degrade audio for the rest of
//! the session ([`DioramaError::Context`]).

use instant::Duration;
use thiserror::Error;

use crate::{audio::Track, quality::QualityTier, resources::AssetId};

/// Why a single asset slot ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("failed to load {path}: {reason}")]
    Failed { path: String, reason: String },
    #[error("loading {path} timed out after {timeout:?}")]
    TimedOut { path: String, timeout: Duration },
    #[error("{primary}; fallback also failed: {fallback}")]
    FallbackExhausted {
        primary: Box<LoadError>,
        fallback: Box<LoadError>,
    },
}

impl LoadError {
    pub fn failed(path: &str, err: &anyhow::Error) -> Self {
        Self::Failed {
            path: path.to_string(),
            reason: format!("{:#}", err),
        }
    }

    /// True if this error, or any attempt folded into it, was a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            LoadError::Failed { .. } => false,
            LoadError::TimedOut { .. } => true,
            LoadError::FallbackExhausted { primary, fallback } => {
                primary.is_timeout() || fallback.is_timeout()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DioramaError {
    #[error("asset {id} could not be loaded: {source}")]
    Load {
        id: AssetId,
        #[source]
        source: LoadError,
    },
    #[error("playback of {track:?} was rejected: {reason}")]
    Playback { track: Track, reason: String },
    #[error("audio context failure: {reason}")]
    Context { reason: String },
    #[error("quality tier {requested:?} cannot be selected before the startup ramp is done")]
    TierLocked { requested: QualityTier },
    #[error("unknown asset {0}")]
    UnknownAsset(AssetId),
}
