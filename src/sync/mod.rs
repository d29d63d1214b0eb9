mod apply;
mod change;
mod conflict;
mod content_hash;
mod diff;
mod entry;
pub mod path;
mod reconcile;

pub use apply::{ApplyError, apply};
pub use change::{Change, StageRequest, stage_requests};
pub use conflict::Conflict;
pub use content_hash::{ContentHash, ContentHashParseError};
pub use diff::diff;
pub use entry::{Children, Entry, EntryKind};
pub use reconcile::{Reconciliation, reconcile};
