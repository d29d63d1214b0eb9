use std::fmt::Debug;

use snafu::Snafu;

use crate::manifest::ManifestError;
use crate::sync::{ApplyError, Change, ContentHash, Entry, StageRequest, path};

/// One side of a synchronization session.
///
/// Calls block and are expected to run on a dispatcher worker thread, so
/// implementations guard their own state.
pub trait Endpoint: Send + Sync + Debug {
    /// Human readable location, used in logs and reports.
    fn describe(&self) -> String;

    /// Captures the current state of the endpoint.
    fn scan(&self) -> Result<Entry, EndpointError>;

    /// Makes the content behind `requests` available to a later
    /// [`transition`](Endpoint::transition).
    fn stage(&self, requests: &[StageRequest]) -> Result<(), EndpointError>;

    /// Applies `changes` and returns the resulting snapshot. Every `old` value
    /// is verified against the endpoint's actual state first.
    fn transition(&self, changes: &[Change]) -> Result<Entry, EndpointError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EndpointError {
    #[snafu(display("Failed to read '{}'", location))]
    ReadError {
        location: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write '{}'", location))]
    WriteError {
        location: String,
        source: std::io::Error,
    },
    #[snafu(display("Invalid manifest at '{}'", location))]
    InvalidManifestError {
        location: String,
        source: ManifestError,
    },
    #[snafu(display("Changes no longer match the endpoint's state"))]
    TransitionError { source: ApplyError },
    #[snafu(display("Content {} for '{}' was never staged", digest, path::display(path)))]
    UnstagedContentError { path: String, digest: ContentHash },
    #[snafu(display("The '{}' transport needs a location", scheme))]
    MissingLocationError { scheme: String },
}

impl EndpointError {
    /// Whether the endpoint's state diverged from the snapshots the failed
    /// operation was planned against.
    pub fn requires_rescan(&self) -> bool {
        matches!(self, EndpointError::TransitionError { .. })
    }
}
