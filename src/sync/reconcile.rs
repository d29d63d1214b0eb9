//! Three-way reconciliation of two snapshots against their common ancestor.

use std::sync::Arc;

use tracing::debug;

use super::change::Change;
use super::conflict::Conflict;
use super::diff::diff;
use super::entry::{Children, Entry, child_names};
use super::path::join;

/// Outcome of reconciling alpha and beta against their ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// Beta's edits, to be applied to alpha.
    pub to_alpha: Vec<Change>,
    /// Alpha's edits, to be applied to beta.
    pub to_beta: Vec<Change>,
    /// Paths withheld from propagation this cycle.
    pub conflicts: Vec<Conflict>,
    /// The snapshot both sides converge to once `to_alpha` and `to_beta` have
    /// been applied. Conflicting subtrees keep their ancestor value.
    pub new_ancestor: Entry,
}

impl Reconciliation {
    /// True when nothing needs to be propagated in either direction.
    pub fn is_settled(&self) -> bool {
        self.to_alpha.is_empty() && self.to_beta.is_empty()
    }
}

/// Reconciles `alpha` and `beta` against `ancestor`.
///
/// A path changed on one side only is propagated to the other. A path
/// changed on both sides (or where one side's change lies inside the
/// subtree the other changed) is left alone when both sides ended up with
/// the same value. When both sides only deleted things there, the wider
/// deletion is propagated. Anything else is reported as a conflict, in which
/// case nothing in that subtree is propagated. A deletion facing a
/// modification is always a conflict.
///
/// This is a pure function: identical inputs always give identical output.
pub fn reconcile(ancestor: &Entry, alpha: &Entry, beta: &Entry) -> Reconciliation {
    let mut reconciler = Reconciler::default();
    let new_ancestor = reconciler.reconcile_node(String::new(), ancestor, alpha, beta);

    debug!(
        "Reconciled: {} change(s) to alpha, {} change(s) to beta, {} conflict(s)",
        reconciler.to_alpha.len(),
        reconciler.to_beta.len(),
        reconciler.conflicts.len()
    );

    Reconciliation {
        to_alpha: reconciler.to_alpha,
        to_beta: reconciler.to_beta,
        conflicts: reconciler.conflicts,
        new_ancestor,
    }
}

#[derive(Default)]
struct Reconciler {
    to_alpha: Vec<Change>,
    to_beta: Vec<Change>,
    conflicts: Vec<Conflict>,
}

impl Reconciler {
    /// Reconciles one node and returns the ancestor value for it after the
    /// cycle.
    fn reconcile_node(&mut self, path: String, ancestor: &Entry, alpha: &Entry, beta: &Entry) -> Entry {
        // While all three agree on a directory, neither delta can hold a change
        // for this node itself, only for its descendants
        if let (Entry::Directory { .. }, Entry::Directory { .. }, Entry::Directory { .. }) =
            (ancestor, alpha, beta)
        {
            return self.reconcile_directory(path, ancestor, alpha, beta);
        }

        // Convergent edits, including the case where nothing changed
        if alpha == beta {
            return if ancestor == alpha {
                ancestor.clone()
            } else {
                alpha.clone()
            };
        }

        if ancestor == alpha {
            self.to_alpha.extend(diff(&path, ancestor, beta));
            return beta.clone();
        }
        if ancestor == beta {
            self.to_beta.extend(diff(&path, ancestor, alpha));
            return alpha.clone();
        }

        let alpha_changes = diff(&path, ancestor, alpha);
        let beta_changes = diff(&path, ancestor, beta);

        // Both sides only pruned the ancestor, so the side that removed the
        // whole node loses nothing the other side still has
        if only_deletions(&alpha_changes) && only_deletions(&beta_changes) {
            if alpha.is_absent() {
                self.to_beta.push(Change::new(path, beta.clone(), Entry::Absent));
            } else {
                self.to_alpha.push(Change::new(path, alpha.clone(), Entry::Absent));
            }
            return Entry::Absent;
        }

        debug!("Conflict at '{}'", path);
        self.conflicts.push(Conflict {
            alpha_changes,
            beta_changes,
            path,
        });
        ancestor.clone()
    }

    fn reconcile_directory(&mut self, path: String, ancestor: &Entry, alpha: &Entry, beta: &Entry) -> Entry {
        if alpha.shares(ancestor) && beta.shares(ancestor) {
            return ancestor.clone();
        }

        let mut children = Children::new();
        let mut changed = false;
        for name in child_names(&[ancestor, alpha, beta]) {
            let previous = ancestor.child(name);
            let merged = self.reconcile_node(
                join(&path, name),
                previous,
                alpha.child(name),
                beta.child(name),
            );
            changed |= !merged.shares(previous);
            if !merged.is_absent() {
                children.insert(name.to_owned(), merged);
            }
        }

        if changed {
            Entry::Directory {
                children: Arc::new(children),
            }
        } else {
            ancestor.clone()
        }
    }
}

fn only_deletions(changes: &[Change]) -> bool {
    changes.iter().all(Change::is_deletion)
}
