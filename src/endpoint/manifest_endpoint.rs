use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use snafu::ResultExt;
use tracing::{debug, info};

use super::endpoint::{
    Endpoint, EndpointError, InvalidManifestSnafu, ReadSnafu, TransitionSnafu, WriteSnafu,
};
use crate::ext::BestEffortPathExt;
use crate::manifest;
use crate::sync::{Change, Entry, StageRequest, apply};

/// An endpoint backed by a manifest file describing a snapshot.
///
/// The file is re-read on every scan and transition, so edits made to it
/// between cycles are picked up, and edits racing a transition surface as
/// stale changes. A missing file is an absent root.
#[derive(Debug, Clone)]
pub struct ManifestEndpoint {
    path: PathBuf,
}

impl ManifestEndpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ManifestEndpoint { path: path.into() }
    }

    fn read(&self) -> Result<Entry, EndpointError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("Manifest {} does not exist yet", self.describe());
                return Ok(Entry::Absent);
            }
            Err(error) => {
                return Err(error).context(ReadSnafu {
                    location: self.describe(),
                });
            }
        };

        manifest::parse(&contents).context(InvalidManifestSnafu {
            location: self.describe(),
        })
    }

    fn write(&self, root: &Entry) -> Result<(), EndpointError> {
        let rendered = manifest::render(root).context(InvalidManifestSnafu {
            location: self.describe(),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context(WriteSnafu {
                location: self.describe(),
            })?;
        }
        fs::write(&self.path, rendered).context(WriteSnafu {
            location: self.describe(),
        })
    }
}

impl Endpoint for ManifestEndpoint {
    fn describe(&self) -> String {
        self.path.best_effort_path_display()
    }

    fn scan(&self) -> Result<Entry, EndpointError> {
        self.read()
    }

    fn stage(&self, requests: &[StageRequest]) -> Result<(), EndpointError> {
        // Manifests only record digests
        debug!(
            "Nothing to stage for {} ({} file(s))",
            self.describe(),
            requests.len()
        );
        Ok(())
    }

    fn transition(&self, changes: &[Change]) -> Result<Entry, EndpointError> {
        let current = self.read()?;
        let root = apply(&current, changes).context(TransitionSnafu)?;
        if !changes.is_empty() {
            self.write(&root)?;
            info!("Wrote {} change(s) to {}", changes.len(), self.describe());
        }
        Ok(root)
    }
}
