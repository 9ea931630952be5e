//! Reconstruction of a process tree from a flat process listing.
//!
//! The listing only records each process's parent pid. The tree is rebuilt
//! in two passes: index the rows by pid (catching duplicates), then group
//! them by parent pid, then walk down from the single root.

use std::collections::{HashMap, HashSet};
use std::fmt;

use seawall_common::constants::ROOT_PARENT_PID;
use serde::{Deserialize, Serialize};

use crate::error::{PsError, Result};
use crate::row::PsRow;

/// A process and the processes it spawned.
///
/// Children keep the order in which they appeared in the listing, which is
/// usually creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTree {
    /// The process at this node.
    pub row: PsRow,
    /// Child subtrees in listing order.
    pub children: Vec<ProcessTree>,
}

impl ProcessTree {
    /// Creates a node with the given children.
    #[must_use]
    pub const fn new(row: PsRow, children: Vec<Self>) -> Self {
        Self { row, children }
    }

    /// Creates a node without children.
    #[must_use]
    pub const fn leaf(row: PsRow) -> Self {
        Self::new(row, Vec::new())
    }

    /// Number of processes in this subtree, this node included.
    #[must_use]
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Walks the subtree in pre-order: every node before its children,
    /// siblings in listing order.
    #[must_use]
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// The rows of this subtree in pre-order.
    #[must_use]
    pub fn rows(&self) -> Vec<&PsRow> {
        self.iter().map(|node| &node.row).collect()
    }

    /// Finds the subtree rooted at `pid`.
    #[must_use]
    pub fn find(&self, pid: u32) -> Option<&Self> {
        self.iter().find(|node| node.row.pid == pid)
    }
}

impl fmt::Display for ProcessTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            writeln!(f, "{:indent$}{}", "", node.row, indent = depth * 2)?;
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
        Ok(())
    }
}

// Unlinks descendants one at a time so dropping a deep chain does not
// recurse once per level.
impl Drop for ProcessTree {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

impl<'a> IntoIterator for &'a ProcessTree {
    type Item = &'a ProcessTree;
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pre-order iterator over a [`ProcessTree`].
#[derive(Debug, Clone)]
pub struct PreOrder<'a> {
    stack: Vec<&'a ProcessTree>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a ProcessTree;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Builds the unique rooted tree described by `rows`.
///
/// The root is the row whose parent pid does not appear in the table. If
/// several rows qualify and exactly one of them has parent pid 0 (the
/// runtime's own parent for a container's init), that row is the root and
/// the others are reported as unreachable.
///
/// # Errors
///
/// - [`PsError::NoRoot`] for an empty table, or when every row's parent is
///   in the table.
/// - [`PsError::DuplicatePid`] when two rows share a pid.
/// - [`PsError::MultipleRoots`] when the root is ambiguous.
/// - [`PsError::Unreachable`] listing every row not connected to the root.
pub fn build_process_tree(rows: &[PsRow]) -> Result<ProcessTree> {
    if rows.is_empty() {
        return Err(PsError::NoRoot);
    }

    let mut by_pid: HashMap<u32, &PsRow> = HashMap::with_capacity(rows.len());
    for row in rows {
        if by_pid.insert(row.pid, row).is_some() {
            return Err(PsError::DuplicatePid { pid: row.pid });
        }
    }

    let root = find_root(rows, &by_pid)?;

    let mut children_of: HashMap<u32, Vec<&PsRow>> = HashMap::new();
    for row in rows {
        children_of.entry(row.ppid).or_default().push(row);
    }

    let tree = assemble(root, &children_of);
    let count = tree.count();
    tracing::debug!(root = root.pid, count, total = rows.len(), "assembled process tree");

    if count != rows.len() {
        let reached: HashSet<u32> = tree.iter().map(|node| node.row.pid).collect();
        let pids = rows
            .iter()
            .map(|row| row.pid)
            .filter(|pid| !reached.contains(pid))
            .collect();
        return Err(PsError::Unreachable { pids });
    }
    Ok(tree)
}

fn find_root<'a>(rows: &'a [PsRow], by_pid: &HashMap<u32, &PsRow>) -> Result<&'a PsRow> {
    let candidates: Vec<&PsRow> = rows
        .iter()
        .filter(|row| !by_pid.contains_key(&row.ppid))
        .collect();

    match candidates.as_slice() {
        [] => Err(PsError::NoRoot),
        [root] => Ok(*root),
        many => {
            let mut init = many.iter().filter(|row| row.ppid == ROOT_PARENT_PID);
            match (init.next(), init.next()) {
                (Some(root), None) => Ok(*root),
                _ => Err(PsError::MultipleRoots {
                    pids: many.iter().map(|row| row.pid).collect(),
                }),
            }
        }
    }
}

// Pids are unique and the root's parent is outside the table, so the walk
// can never revisit a row. Nodes are built bottom-up from the reversed
// pre-order, which keeps the stack depth constant however deep the chain.
fn assemble(root: &PsRow, children_of: &HashMap<u32, Vec<&PsRow>>) -> ProcessTree {
    let mut order: Vec<(&PsRow, usize)> = Vec::new();
    let mut pending: Vec<&PsRow> = kids(children_of, root).iter().rev().copied().collect();
    while let Some(row) = pending.pop() {
        let row_kids = kids(children_of, row);
        order.push((row, row_kids.len()));
        pending.extend(row_kids.iter().rev().copied());
    }

    let mut built: Vec<ProcessTree> = Vec::with_capacity(order.len());
    for (row, count) in order.into_iter().rev() {
        let children = take_children(&mut built, count);
        built.push(ProcessTree::new(row.clone(), children));
    }
    let children = take_children(&mut built, kids(children_of, root).len());
    ProcessTree::new(root.clone(), children)
}

fn kids<'m, 'r>(children_of: &'m HashMap<u32, Vec<&'r PsRow>>, row: &PsRow) -> &'m [&'r PsRow] {
    children_of.get(&row.pid).map_or(&[][..], Vec::as_slice)
}

// Finished subtrees sit on `built` with the first child on top.
fn take_children(built: &mut Vec<ProcessTree>, count: usize) -> Vec<ProcessTree> {
    let at = built.len().saturating_sub(count);
    let mut children = built.split_off(at);
    children.reverse();
    children
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mkrow(pid: u32, ppid: u32) -> PsRow {
        PsRow::new(pid, ppid, "root", format!("args for pid {pid}"))
    }

    fn leaf(row: &PsRow) -> ProcessTree {
        ProcessTree::leaf(row.clone())
    }

    #[test]
    fn count_includes_all_descendants() {
        assert_eq!(ProcessTree::leaf(mkrow(1, 0)).count(), 1);

        let tree = ProcessTree::new(
            mkrow(1, 0),
            vec![
                ProcessTree::new(mkrow(6, 1), vec![ProcessTree::leaf(mkrow(8, 6))]),
                ProcessTree::new(
                    mkrow(9, 1),
                    vec![
                        ProcessTree::leaf(mkrow(11, 9)),
                        ProcessTree::leaf(mkrow(12, 9)),
                    ],
                ),
            ],
        );
        assert_eq!(tree.count(), 6);
    }

    #[test]
    fn single_process() {
        let row = PsRow::new(1, 0, "root", "tini -- echo \"hi\"");
        assert_eq!(
            build_process_tree(std::slice::from_ref(&row)).unwrap(),
            ProcessTree::leaf(row)
        );
    }

    #[test]
    fn simple_chain() {
        let rows = vec![
            PsRow::new(1, 0, "root", "tini -- nginx -g 'daemon off;'"),
            PsRow::new(6, 1, "root", "nginx: master process nginx -g daemon off;"),
            PsRow::new(8, 6, "nginx", "nginx: worker process"),
        ];
        let tree = build_process_tree(&rows).unwrap();
        assert_eq!(
            tree,
            ProcessTree::new(
                rows[0].clone(),
                vec![ProcessTree::new(rows[1].clone(), vec![leaf(&rows[2])])]
            )
        );
    }

    #[test]
    fn bigger_tree() {
        let r: Vec<PsRow> = [(1, 0), (2, 1), (3, 1), (4, 2), (5, 3), (6, 3), (7, 4), (8, 2), (9, 1)]
            .into_iter()
            .map(|(pid, ppid)| mkrow(pid, ppid))
            .collect();
        let tree = build_process_tree(&r).unwrap();
        let expected = ProcessTree::new(
            r[0].clone(),
            vec![
                ProcessTree::new(
                    r[1].clone(),
                    vec![ProcessTree::new(r[3].clone(), vec![leaf(&r[6])]), leaf(&r[7])],
                ),
                ProcessTree::new(r[2].clone(), vec![leaf(&r[4]), leaf(&r[5])]),
                leaf(&r[8]),
            ],
        );
        assert_eq!(tree, expected);
        assert_eq!(tree.count(), r.len());
    }

    #[test]
    fn children_keep_listing_order_not_pid_order() {
        let rows = vec![mkrow(1, 0), mkrow(9, 1), mkrow(2, 1), mkrow(3, 1)];
        let tree = build_process_tree(&rows).unwrap();
        let pids: Vec<u32> = tree.children.iter().map(|c| c.row.pid).collect();
        assert_eq!(pids, vec![9, 2, 3]);
    }

    #[test]
    fn root_need_not_have_parent_zero() {
        let rows = vec![mkrow(12, 7), mkrow(30, 12)];
        let tree = build_process_tree(&rows).unwrap();
        assert_eq!(tree.row.pid, 12);
        assert_eq!(tree.count(), 2);
    }

    #[test]
    fn root_may_appear_after_its_children() {
        let rows = vec![mkrow(5, 1), mkrow(1, 0), mkrow(6, 5)];
        let tree = build_process_tree(&rows).unwrap();
        assert_eq!(tree.row.pid, 1);
        assert_eq!(tree.rows().iter().map(|r| r.pid).collect::<Vec<_>>(), vec![1, 5, 6]);
    }

    #[test]
    fn empty_table_has_no_root() {
        let err = build_process_tree(&[]).unwrap_err();
        assert_eq!(err, PsError::NoRoot);
        assert!(err.to_string().contains("no process tree root"));
    }

    #[test]
    fn closed_cycle_has_no_root() {
        let err = build_process_tree(&[mkrow(2, 3), mkrow(3, 2)]).unwrap_err();
        assert_eq!(err, PsError::NoRoot);
    }

    #[test]
    fn siblings_without_parent_are_multiple_roots() {
        let err = build_process_tree(&[mkrow(2, 1), mkrow(3, 1), mkrow(4, 2)]).unwrap_err();
        assert_eq!(err, PsError::MultipleRoots { pids: vec![2, 3] });
    }

    #[test]
    fn two_init_processes_are_multiple_roots() {
        let err = build_process_tree(&[mkrow(1, 0), mkrow(2, 0), mkrow(4, 2)]).unwrap_err();
        assert_eq!(err, PsError::MultipleRoots { pids: vec![1, 2] });
        assert!(err.to_string().contains("too many process tree roots"));
    }

    #[test]
    fn disconnected_component_is_unreachable() {
        let err = build_process_tree(&[mkrow(1, 0), mkrow(2, 1), mkrow(4, 3)]).unwrap_err();
        assert_eq!(err, PsError::Unreachable { pids: vec![4] });
        assert!(err.to_string().contains("unreachable processes"));
    }

    #[test]
    fn detached_cycle_is_unreachable() {
        let rows = [mkrow(1, 0), mkrow(2, 1), mkrow(5, 6), mkrow(6, 5), mkrow(7, 6)];
        let err = build_process_tree(&rows).unwrap_err();
        assert_eq!(err, PsError::Unreachable { pids: vec![5, 6, 7] });
    }

    #[test]
    fn self_parented_row_is_unreachable() {
        let err = build_process_tree(&[mkrow(1, 0), mkrow(3, 3)]).unwrap_err();
        assert_eq!(err, PsError::Unreachable { pids: vec![3] });
    }

    #[test]
    fn duplicate_pid_is_reported_before_anything_else() {
        let err =
            build_process_tree(&[mkrow(1, 0), mkrow(2, 1), mkrow(2, 1), mkrow(3, 2)]).unwrap_err();
        assert_eq!(err, PsError::DuplicatePid { pid: 2 });
        assert!(err.to_string().contains("duplicate pid found: 2"));

        // Would also be rootless, but the duplicate wins.
        let err = build_process_tree(&[mkrow(2, 3), mkrow(3, 2), mkrow(3, 2)]).unwrap_err();
        assert_eq!(err, PsError::DuplicatePid { pid: 3 });
    }

    #[test]
    fn pre_order_puts_parents_first() {
        let rows = vec![mkrow(1, 0), mkrow(2, 1), mkrow(3, 1), mkrow(4, 2)];
        let tree = build_process_tree(&rows).unwrap();
        let order: Vec<u32> = tree.iter().map(|n| n.row.pid).collect();
        assert_eq!(order, vec![1, 2, 4, 3]);
    }

    #[test]
    fn deep_chain_is_built_without_recursion() {
        const DEPTH: u32 = 200_000;
        let rows: Vec<PsRow> = (1..=DEPTH)
            .map(|pid| PsRow::new(pid, pid - 1, "root", "sh -c exec"))
            .collect();
        let tree = build_process_tree(&rows).unwrap();
        assert_eq!(tree.count(), DEPTH as usize);
        assert_eq!(tree.find(DEPTH).map(ProcessTree::count), Some(1));
        assert_eq!(tree.iter().last().map(|n| n.row.pid), Some(DEPTH));
        drop(tree);

        let mut broken = rows;
        broken[0].ppid = DEPTH;
        broken.push(PsRow::new(DEPTH + 1, 0, "root", "init"));
        let err = build_process_tree(&broken).unwrap_err();
        assert!(matches!(err, PsError::Unreachable { ref pids } if pids.len() == DEPTH as usize));
    }

    #[test]
    fn find_returns_subtree() {
        let rows = vec![mkrow(1, 0), mkrow(2, 1), mkrow(4, 2)];
        let tree = build_process_tree(&rows).unwrap();
        assert_eq!(tree.find(2).map(ProcessTree::count), Some(2));
        assert!(tree.find(99).is_none());
    }

    #[test]
    fn display_indents_children() {
        let rows = vec![
            PsRow::new(1, 0, "root", "tini -- app"),
            PsRow::new(7, 1, "app", "app --serve"),
        ];
        let tree = build_process_tree(&rows).unwrap();
        assert_eq!(tree.to_string(), "1 root tini -- app\n  7 app app --serve\n");
    }

    #[test]
    fn tree_serializes_to_json() {
        let tree = build_process_tree(&[mkrow(1, 0)]).unwrap();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["row"]["pid"], 1);
        assert_eq!(json["children"], serde_json::json!([]));
    }
}
