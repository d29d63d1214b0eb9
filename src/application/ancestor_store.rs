use std::io::ErrorKind;
use std::path::PathBuf;

use compio::fs;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::ext::BestEffortPathExt;
use crate::manifest::{self, ManifestError};
use crate::sync::Entry;

/// Persists a session's agreed ancestor as a manifest between runs.
#[derive(Debug, Clone)]
pub struct AncestorStore {
    path: PathBuf,
}

impl AncestorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AncestorStore { path: path.into() }
    }

    /// Reads the stored ancestor. `None` means the endpoints have never agreed
    /// on anything yet.
    pub async fn read(&self) -> Result<Option<Entry>, AncestorStoreError> {
        debug!(
            "Reading agreed ancestor from {}",
            self.path.best_effort_path_display()
        );
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("No agreed ancestor found, starting fresh");
                return Ok(None);
            }
            Err(error) => {
                return Err(error).context(ReadSnafu {
                    file_path: self.path.best_effort_path_display(),
                });
            }
        };

        let contents = String::from_utf8(bytes).context(DecodeSnafu {
            file_path: self.path.best_effort_path_display(),
        })?;
        let ancestor = manifest::parse(&contents).context(ManifestSnafu {
            file_path: self.path.best_effort_path_display(),
        })?;
        debug!("Agreed ancestor holds {} entries", ancestor.count());
        Ok(Some(ancestor))
    }

    /// Replaces the stored ancestor.
    pub async fn write(&self, ancestor: &Entry) -> Result<(), AncestorStoreError> {
        let rendered = manifest::render(ancestor).context(ManifestSnafu {
            file_path: self.path.best_effort_path_display(),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.context(WriteSnafu {
                file_path: self.path.best_effort_path_display(),
            })?;
        }
        fs::write(&self.path, rendered).await.0.context(WriteSnafu {
            file_path: self.path.best_effort_path_display(),
        })?;

        debug!(
            "Stored agreed ancestor in {}",
            self.path.best_effort_path_display()
        );
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum AncestorStoreError {
    #[snafu(display("Failed to read the ancestor file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write the ancestor file: {}", file_path))]
    WriteError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Ancestor file is not valid UTF-8: {}", file_path))]
    DecodeError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Invalid ancestor manifest: {}", file_path))]
    ManifestError {
        file_path: String,
        source: ManifestError,
    },
}
