use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use snafu::{ResultExt, ensure};
use tracing::debug;

use super::endpoint::{Endpoint, EndpointError, TransitionSnafu, UnstagedContentSnafu};
use crate::sync::{Change, ContentHash, Entry, StageRequest, apply, stage_requests};

/// An endpoint whose state lives entirely in memory.
///
/// Staged digests act as its content store: a transition that would create a
/// file is refused unless that file's content was staged beforehand.
#[derive(Debug)]
pub struct MemoryEndpoint {
    label: String,
    state: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    root: Entry,
    staged: HashSet<ContentHash>,
}

impl MemoryEndpoint {
    pub fn new(label: impl Into<String>, root: Entry) -> Self {
        MemoryEndpoint {
            label: label.into(),
            state: Mutex::new(MemoryState {
                root,
                staged: HashSet::new(),
            }),
        }
    }

    /// Replaces the state, as if the endpoint had been edited externally.
    #[cfg(test)]
    pub(crate) fn replace(&self, root: Entry) {
        self.lock().root = root;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock cannot leave a half-written snapshot
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Endpoint for MemoryEndpoint {
    fn describe(&self) -> String {
        format!("memory:{}", self.label)
    }

    fn scan(&self) -> Result<Entry, EndpointError> {
        Ok(self.lock().root.clone())
    }

    fn stage(&self, requests: &[StageRequest]) -> Result<(), EndpointError> {
        let mut state = self.lock();
        state
            .staged
            .extend(requests.iter().map(|request| request.digest));
        debug!("Staged {} file(s) on {}", requests.len(), self.describe());
        Ok(())
    }

    fn transition(&self, changes: &[Change]) -> Result<Entry, EndpointError> {
        let mut state = self.lock();
        for request in stage_requests(changes) {
            ensure!(
                state.staged.contains(&request.digest),
                UnstagedContentSnafu {
                    path: request.path,
                    digest: request.digest,
                }
            );
        }

        let root = apply(&state.root, changes).context(TransitionSnafu)?;
        state.root = root.clone();
        debug!("Applied {} change(s) to {}", changes.len(), self.describe());
        Ok(root)
    }
}
