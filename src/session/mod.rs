mod cycle_report;
mod cycle_state;
mod session;

pub use cycle_report::CycleReport;
pub use cycle_state::{CycleState, Side};
pub use session::{CycleError, Session, SessionCreationError};
