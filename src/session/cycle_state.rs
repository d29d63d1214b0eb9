use derive_more::Display;

/// Phase a session is in.
///
/// A successful cycle runs `Idle → Scanning → Reconciling → Transferring →
/// Applying → Idle`. Any failure leaves the session in `Error` until the next
/// cycle starts over with a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum CycleState {
    #[default]
    #[display("idle")]
    Idle,
    #[display("scanning")]
    Scanning,
    #[display("reconciling")]
    Reconciling,
    #[display("transferring")]
    Transferring,
    #[display("applying")]
    Applying,
    #[display("error")]
    Error,
}

/// One of the two endpoints of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Side {
    #[display("alpha")]
    Alpha,
    #[display("beta")]
    Beta,
}
