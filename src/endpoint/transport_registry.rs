use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use snafu::prelude::*;
use tracing::{debug, info};

use super::endpoint::{
    Endpoint, EndpointError, InvalidManifestSnafu, MissingLocationSnafu, ReadSnafu,
};
use super::{ManifestEndpoint, MemoryEndpoint};
use crate::ext::BestEffortPathExt;
use crate::manifest;
use crate::sync::Entry;

const MEMORY_SCHEME: &str = "memory";
const MANIFEST_SCHEME: &str = "manifest";

/// Environment shared by every dial.
#[derive(Debug, Clone)]
pub struct DialContext {
    /// Directory relative locations are resolved against.
    pub root: PathBuf,
}

impl DialContext {
    fn resolve(&self, location: &str) -> PathBuf {
        self.root.join(location)
    }
}

/// Builds endpoints for one URL scheme.
pub trait TransportHandler: Send + Sync {
    fn dial(&self, location: &str, context: &DialContext)
    -> Result<Arc<dyn Endpoint>, EndpointError>;
}

/// `memory:` starts absent, `memory:<manifest>` starts from the manifest's
/// snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryTransport;

impl TransportHandler for MemoryTransport {
    fn dial(
        &self,
        location: &str,
        context: &DialContext,
    ) -> Result<Arc<dyn Endpoint>, EndpointError> {
        let root = if location.is_empty() {
            Entry::Absent
        } else {
            read_seed(&context.resolve(location))?
        };
        Ok(Arc::new(MemoryEndpoint::new(location, root)))
    }
}

fn read_seed(path: &Path) -> Result<Entry, EndpointError> {
    debug!("Seeding memory endpoint from {}", path.best_effort_path_display());
    let contents = fs::read_to_string(path).context(ReadSnafu {
        location: path.best_effort_path_display(),
    })?;
    manifest::parse(&contents).context(InvalidManifestSnafu {
        location: path.best_effort_path_display(),
    })
}

/// `manifest:<path>` reads and writes the manifest at `path`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestTransport;

impl TransportHandler for ManifestTransport {
    fn dial(
        &self,
        location: &str,
        context: &DialContext,
    ) -> Result<Arc<dyn Endpoint>, EndpointError> {
        ensure!(
            !location.is_empty(),
            MissingLocationSnafu {
                scheme: MANIFEST_SCHEME
            }
        );
        Ok(Arc::new(ManifestEndpoint::new(context.resolve(location))))
    }
}

/// Maps URL schemes to the transports able to dial them.
#[derive(Default)]
pub struct TransportRegistry {
    handlers: HashMap<String, Box<dyn TransportHandler>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `memory` and `manifest` transports.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MEMORY_SCHEME, MemoryTransport);
        registry.register(MANIFEST_SCHEME, ManifestTransport);
        registry
    }

    /// Registers `handler` for `scheme`, replacing any previous handler.
    pub fn register(&mut self, scheme: &str, handler: impl TransportHandler + 'static) {
        let scheme = scheme.to_ascii_lowercase();
        debug!("Registering transport '{}'", scheme);
        self.handlers.insert(scheme, Box::new(handler));
    }

    /// Dials the endpoint named by a `scheme:location` URL.
    pub fn dial(
        &self,
        url: &str,
        context: &DialContext,
    ) -> Result<Arc<dyn Endpoint>, RegistryError> {
        let (scheme, location) = split_url(url)?;
        let handler = self
            .handlers
            .get(&scheme)
            .context(UnknownSchemeSnafu { url, scheme: &scheme })?;

        let endpoint = handler
            .dial(location, context)
            .context(DialSnafu { url })?;
        info!("Dialed '{}' as {}", url, endpoint.describe());
        Ok(endpoint)
    }
}

/// Splits `scheme:location` into a lowercase scheme and the location.
pub fn split_url(url: &str) -> Result<(String, &str), RegistryError> {
    let (scheme, location) = url.split_once(':').context(MalformedUrlSnafu { url })?;
    let valid_scheme = scheme
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    ensure!(valid_scheme, MalformedUrlSnafu { url });

    Ok((scheme.to_ascii_lowercase(), location))
}

#[derive(Debug, Snafu)]
pub enum RegistryError {
    #[snafu(display("'{}' is not a scheme:location URL", url))]
    MalformedUrlError { url: String },
    #[snafu(display("No transport is registered for '{}' (in '{}')", scheme, url))]
    UnknownSchemeError { url: String, scheme: String },
    #[snafu(display("Failed to dial '{}'", url))]
    DialError { url: String, source: EndpointError },
}
