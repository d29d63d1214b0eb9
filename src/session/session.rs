use std::num::NonZeroUsize;
use std::sync::Arc;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use futures_channel::oneshot::{self, Canceled};
use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use super::{CycleReport, CycleState, Side};
use crate::endpoint::{Endpoint, EndpointError};
use crate::sync::{Entry, reconcile, stage_requests};

/// One worker per side, so both endpoints are always worked on concurrently
const WORKER_THREADS: NonZeroUsize = NonZeroUsize::MIN.saturating_add(1);

type SideResult<T> = Result<T, EndpointError>;

/// A pair of endpoints kept in sync through repeated cycles.
pub struct Session {
    name: String,
    alpha: Arc<dyn Endpoint>,
    beta: Arc<dyn Endpoint>,
    /// Last snapshot both sides agreed on, `None` until the first cycle.
    ancestor: Option<Entry>,
    state: CycleState,
    dispatcher: Dispatcher,
}

impl Session {
    pub fn new(
        name: impl Into<String>,
        alpha: Arc<dyn Endpoint>,
        beta: Arc<dyn Endpoint>,
        ancestor: Option<Entry>,
    ) -> Result<Self, SessionCreationError> {
        let dispatcher = DispatcherBuilder::new()
            .worker_threads(WORKER_THREADS)
            .build()
            .context(DispatcherSnafu)?;

        Ok(Session {
            name: name.into(),
            alpha,
            beta,
            ancestor,
            state: CycleState::Idle,
            dispatcher,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn ancestor(&self) -> Option<&Entry> {
        self.ancestor.as_ref()
    }

    /// Runs one scan, reconcile, transfer and apply cycle.
    ///
    /// With `dry_run` the cycle stops after reconciling and reports what it
    /// would have propagated. On failure the session is left in
    /// [`CycleState::Error`] with its ancestor untouched, and the next cycle
    /// starts over from a fresh scan.
    pub async fn cycle(&mut self, dry_run: bool) -> Result<CycleReport, CycleError> {
        let result = self.run_cycle(dry_run).await;
        match &result {
            Ok(report) => {
                self.enter(CycleState::Idle);
                info!("Session '{}' cycle finished: {}", self.name, report);
            }
            Err(error) => {
                self.enter(CycleState::Error);
                warn!(
                    "Session '{}' cycle failed (rescan required: {}): {}",
                    self.name,
                    error.requires_rescan(),
                    error
                );
            }
        }
        result
    }

    async fn run_cycle(&mut self, dry_run: bool) -> Result<CycleReport, CycleError> {
        self.enter(CycleState::Scanning);
        let (alpha, beta) = self
            .on_both(|endpoint| endpoint.scan(), |endpoint| endpoint.scan())
            .await?;
        let alpha = alpha.context(ScanSnafu { side: Side::Alpha })?;
        let beta = beta.context(ScanSnafu { side: Side::Beta })?;
        debug!(
            "Scanned {} entries on alpha and {} on beta",
            alpha.count(),
            beta.count()
        );

        self.enter(CycleState::Reconciling);
        let ancestor = self.agreed_ancestor(&alpha, &beta);
        let reconciliation = reconcile(&ancestor, &alpha, &beta);
        for conflict in &reconciliation.conflicts {
            warn!("Session '{}' conflict at {}", self.name, conflict);
        }
        let settled = reconciliation.is_settled();

        let report = CycleReport {
            to_alpha: reconciliation.to_alpha,
            to_beta: reconciliation.to_beta,
            conflicts: reconciliation.conflicts,
            dry_run,
        };
        if dry_run {
            debug!("Dry run, leaving both endpoints untouched");
            return Ok(report);
        }
        if settled {
            debug!("Nothing to propagate, skipping transfer and apply");
            self.ancestor = Some(reconciliation.new_ancestor);
            return Ok(report);
        }

        self.enter(CycleState::Transferring);
        let alpha_requests = stage_requests(&report.to_alpha);
        let beta_requests = stage_requests(&report.to_beta);
        debug!(
            "Staging {} file(s) on alpha and {} on beta",
            alpha_requests.len(),
            beta_requests.len()
        );
        let (alpha_staged, beta_staged) = self
            .on_both(
                move |endpoint| endpoint.stage(&alpha_requests),
                move |endpoint| endpoint.stage(&beta_requests),
            )
            .await?;
        alpha_staged.context(StageSnafu { side: Side::Alpha })?;
        beta_staged.context(StageSnafu { side: Side::Beta })?;

        self.enter(CycleState::Applying);
        let to_alpha = report.to_alpha.clone();
        let to_beta = report.to_beta.clone();
        let (alpha_applied, beta_applied) = self
            .on_both(
                move |endpoint| endpoint.transition(&to_alpha),
                move |endpoint| endpoint.transition(&to_beta),
            )
            .await?;
        alpha_applied.context(ApplySnafu { side: Side::Alpha })?;
        beta_applied.context(ApplySnafu { side: Side::Beta })?;

        self.ancestor = Some(reconciliation.new_ancestor);
        Ok(report)
    }

    /// Ancestor to reconcile against. Before the first successful cycle there
    /// is none, so two directories start from an empty one and anything else
    /// starts from nothing.
    fn agreed_ancestor(&self, alpha: &Entry, beta: &Entry) -> Entry {
        match &self.ancestor {
            Some(ancestor) => ancestor.clone(),
            None if alpha.is_directory() && beta.is_directory() => Entry::empty_directory(),
            None => Entry::Absent,
        }
    }

    fn enter(&mut self, state: CycleState) {
        debug!("Session '{}': {} -> {}", self.name, self.state, state);
        self.state = state;
    }

    /// Runs one job per side on the dispatcher and waits for both.
    async fn on_both<T, A, B>(
        &self,
        alpha_job: A,
        beta_job: B,
    ) -> Result<(SideResult<T>, SideResult<T>), CycleError>
    where
        T: Send + 'static,
        A: FnOnce(&dyn Endpoint) -> SideResult<T> + Send + 'static,
        B: FnOnce(&dyn Endpoint) -> SideResult<T> + Send + 'static,
    {
        let alpha = self.dispatch(Side::Alpha, alpha_job)?;
        let beta = self.dispatch(Side::Beta, beta_job)?;

        let (alpha, beta) = futures::join!(alpha, beta);
        let alpha = alpha.context(CanceledSnafu { side: Side::Alpha })?;
        let beta = beta.context(CanceledSnafu { side: Side::Beta })?;
        Ok((alpha, beta))
    }

    fn dispatch<T, F>(
        &self,
        side: Side,
        job: F,
    ) -> Result<oneshot::Receiver<SideResult<T>>, CycleError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Endpoint) -> SideResult<T> + Send + 'static,
    {
        let endpoint = Arc::clone(match side {
            Side::Alpha => &self.alpha,
            Side::Beta => &self.beta,
        });

        self.dispatcher
            .dispatch(move || async move { job(endpoint.as_ref()) })
            .map_err(|e| CycleError::DispatchError {
                side,
                error: e.to_string(),
            })
    }
}

#[derive(Debug, Snafu)]
pub enum SessionCreationError {
    #[snafu(display("Failed to create session dispatcher"))]
    DispatcherError { source: std::io::Error },
}

#[derive(Debug, Snafu)]
pub enum CycleError {
    #[snafu(display("Failed to scan {}", side))]
    ScanError { side: Side, source: EndpointError },
    #[snafu(display("Failed to stage content on {}", side))]
    StageError { side: Side, source: EndpointError },
    #[snafu(display("Failed to apply changes to {}", side))]
    ApplyError { side: Side, source: EndpointError },
    #[snafu(display("Failed to dispatch work for {}: {}", side, error))]
    DispatchError { side: Side, error: String },
    #[snafu(display("Work for {} got cancelled", side))]
    CanceledError { side: Side, source: Canceled },
}

impl CycleError {
    /// Whether the endpoints may have diverged from the scanned snapshots.
    pub fn requires_rescan(&self) -> bool {
        match self {
            CycleError::ApplyError { source, .. } => source.requires_rescan(),
            _ => false,
        }
    }

    /// Whether running another cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CycleError::ScanError { .. }
                | CycleError::StageError { .. }
                | CycleError::ApplyError { .. }
        )
    }
}
