//! Path Expansion (§4.5, C5): grows the tree to match a newly observed
//! concrete path, never touching symbolic state.

use crate::address::Path;
use crate::error::FuzzError;
use crate::symbolic::SymbolicEngine;
use crate::tree::arena::Tree;
use std::collections::HashSet;

/// Extends `tree` along `path`, inserting White children as needed.
/// Inserts `path` into `discovered` (idempotent). Returns whether any
/// node was newly created.
pub fn expand<Eng: SymbolicEngine>(
    tree: &mut Tree<Eng>,
    discovered: &mut HashSet<Path>,
    path: &Path,
) -> Result<bool, FuzzError> {
    if path.is_empty() {
        return Err(FuzzError::TraceLength(0));
    }
    let root = tree.root();
    let first = path[0];

    if tree.get(root).addr.is_none() {
        tree.get_mut(root).addr = Some(first);
        if let Some(sim) = tree.get(root).simulation {
            tree.get_mut(sim).addr = Some(first);
        }
    }

    let root_addr = tree.get(root).addr.expect("root address just set if absent");
    if root_addr != first {
        return Err(FuzzError::RootMismatch {
            expected: root_addr,
            found: first,
        });
    }

    let mut current = root;
    let mut was_new = false;
    for &addr in path.tail() {
        let (child, new) = tree.child_or_insert(current, addr);
        was_new |= new;
        current = child;
    }

    discovered.insert(path.clone());
    Ok(was_new)
}
