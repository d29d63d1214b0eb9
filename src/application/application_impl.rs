use std::sync::Arc;
use std::time::Duration;

use snafu::Snafu;
use snafu::prelude::*;
use supports_color::Stream;
use tracing::{debug, info, warn};

use crate::application::{AncestorStore, AncestorStoreError, RuntimeConfig};
use crate::config::session_registry::{SessionRegistry, SessionRegistryCreationError};
use crate::endpoint::{DialContext, Endpoint, RegistryError, TransportRegistry};
use crate::session::{CycleError, Session, SessionCreationError, Side};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

/// Delay before retrying after `failures` consecutive failed cycles, doubling
/// each time up to [`RETRY_MAX_DELAY`].
fn retry_delay(failures: u32) -> Duration {
    RETRY_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(failures.saturating_sub(1)))
        .min(RETRY_MAX_DELAY)
}

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let registry = SessionRegistry::read(&app_config.root)
            .await
            .context(SessionRegistrySnafu)?;
        debug!("Loaded config: {:?}", registry);

        let spec = registry
            .get_session_by_name(&app_config.session)
            .context(UnknownSessionSnafu {
                session: &app_config.session,
                available: registry.session_names().join(", "),
            })?;

        let transports = TransportRegistry::with_defaults();
        let dial_context = DialContext {
            root: app_config.root.clone(),
        };
        let alpha = Self::dial(&transports, &spec.alpha, &dial_context, Side::Alpha)?;
        let beta = Self::dial(&transports, &spec.beta, &dial_context, Side::Beta)?;

        let store = AncestorStore::new(app_config.root.join(&spec.ancestor));
        let ancestor = store.read().await.context(AncestorSnafu)?;

        let mut session =
            Session::new(&spec.name, alpha, beta, ancestor).context(SessionCreationSnafu)?;
        colored::control::set_override(supports_color::on(Stream::Stdout).is_some());

        let mut failures = 0;
        for cycle in 1..=app_config.cycles.get() {
            info!("Session '{}': starting cycle {}", session.name(), cycle);
            let report = match session.cycle(app_config.dry_run).await {
                Ok(report) => report,
                Err(error) if error.is_retryable() && cycle < app_config.cycles.get() => {
                    failures += 1;
                    let delay = retry_delay(failures);
                    warn!("Cycle {} failed, retrying in {:?}: {}", cycle, delay, error);
                    compio::time::sleep(delay).await;
                    continue;
                }
                Err(error) => return Err(error).context(CycleSnafu { cycle }),
            };
            failures = 0;
            debug!("Session '{}' is {} after cycle {}", session.name(), session.state(), cycle);
            report.print(session.name());

            if app_config.dry_run {
                break;
            }
            if let Some(ancestor) = session.ancestor() {
                store.write(ancestor).await.context(AncestorSnafu)?;
            }
            if report.is_settled() {
                debug!("Nothing left to propagate after cycle {}", cycle);
                break;
            }
        }

        Ok(())
    }

    fn dial(
        transports: &TransportRegistry,
        url: &str,
        context: &DialContext,
        side: Side,
    ) -> Result<Arc<dyn Endpoint>, ApplicationError> {
        transports
            .dial(url, context)
            .context(DialSnafu { side })
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    SessionRegistryError {
        source: SessionRegistryCreationError,
    },
    #[snafu(display("Session '{}' is not configured (available: {})", session, available))]
    UnknownSessionError { session: String, available: String },
    #[snafu(display("Failed to connect to the {} endpoint", side))]
    DialError { side: Side, source: RegistryError },
    #[snafu(display("Failed to load or store the agreed ancestor"))]
    AncestorError { source: AncestorStoreError },
    #[snafu(display("Critical failure encountered during session creation"))]
    SessionCreationError { source: SessionCreationError },
    #[snafu(display("Synchronization cycle {} failed", cycle))]
    CycleError { cycle: usize, source: CycleError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest;
    use crate::sync::{ContentHash, Entry};
    use rstest::rstest;
    use std::num::NonZeroUsize;
    use std::path::Path;
    use tempfile::TempDir;

    fn runtime_config(root: &Path, cycles: usize, dry_run: bool) -> RuntimeConfig {
        RuntimeConfig {
            session: "docs".to_string(),
            root: root.to_path_buf(),
            cycles: NonZeroUsize::new(cycles).expect("cycles should be positive"),
            dry_run,
        }
    }

    fn write(root: &Path, name: &str, contents: &str) {
        std::fs::write(root.join(name), contents).expect("Failed to write file");
    }

    fn read_manifest(root: &Path, name: &str) -> Entry {
        let contents = std::fs::read_to_string(root.join(name)).expect("Failed to read manifest");
        manifest::parse(&contents).expect("Failed to parse manifest")
    }

    fn write_config(root: &Path) {
        write(
            root,
            "tandem.yaml",
            "sessions:\n  docs:\n    alpha: manifest:alpha.yaml\n    beta: manifest:beta.yaml\n",
        );
    }

    #[rstest]
    #[case(1, Duration::from_millis(100))]
    #[case(2, Duration::from_millis(200))]
    #[case(4, Duration::from_millis(800))]
    #[case(7, RETRY_MAX_DELAY)]
    #[case(u32::MAX, RETRY_MAX_DELAY)]
    fn test_retry_delay_doubles_up_to_cap(#[case] failures: u32, #[case] expected: Duration) {
        assert_eq!(retry_delay(failures), expected);
    }

    #[compio::test]
    async fn application_syncs_manifests_and_stores_ancestor() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(dir.path());
        write(dir.path(), "alpha.yaml", "a.txt: text a\n");
        write(dir.path(), "beta.yaml", "b.txt: text b\n");

        Application::run(runtime_config(dir.path(), 3, false))
            .await
            .expect("run should succeed");

        let expected = Entry::directory([
            ("a.txt", Entry::file(ContentHash::of("a"))),
            ("b.txt", Entry::file(ContentHash::of("b"))),
        ]);
        assert_eq!(read_manifest(dir.path(), "alpha.yaml"), expected);
        assert_eq!(read_manifest(dir.path(), "beta.yaml"), expected);
        assert_eq!(read_manifest(dir.path(), "docs.ancestor.yaml"), expected);
    }

    #[compio::test]
    async fn application_dry_run_writes_nothing() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(dir.path());
        write(dir.path(), "alpha.yaml", "a.txt: text a\n");

        Application::run(runtime_config(dir.path(), 1, true))
            .await
            .expect("run should succeed");

        assert!(!dir.path().join("beta.yaml").exists());
        assert!(!dir.path().join("docs.ancestor.yaml").exists());
    }

    #[compio::test]
    async fn application_reports_unknown_session() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write(dir.path(), "tandem.yaml", "sessions: {}\n");

        let result = Application::run(runtime_config(dir.path(), 1, false)).await;

        assert!(matches!(
            result,
            Err(ApplicationError::UnknownSessionError { .. })
        ));
    }

    #[compio::test]
    async fn application_reports_unknown_transport() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write(
            dir.path(),
            "tandem.yaml",
            "sessions:\n  docs:\n    alpha: ftp:somewhere\n    beta: \"memory:\"\n",
        );

        let result = Application::run(runtime_config(dir.path(), 1, false)).await;

        assert!(matches!(
            result,
            Err(ApplicationError::DialError {
                side: Side::Alpha,
                source: RegistryError::UnknownSchemeError { .. },
            })
        ));
    }

    #[compio::test]
    async fn application_fails_on_broken_endpoint_manifest() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_config(dir.path());
        write(dir.path(), "alpha.yaml", "a.txt: nonsense\n");

        let result = Application::run(runtime_config(dir.path(), 2, false)).await;

        assert!(matches!(
            result,
            Err(ApplicationError::CycleError {
                cycle: 2,
                source: CycleError::ScanError {
                    side: Side::Alpha,
                    ..
                },
            })
        ));
    }
}
