//! Expectations over the shape of a process tree.
//!
//! Pids are assigned at runtime, so expectations usually pin only the user
//! and command line of each process. Children are compared as a set: the
//! order in which a supervisor forks its workers does not matter.

use std::fmt;

use crate::tree::ProcessTree;

/// Expected shape of a [`ProcessTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeExpectation {
    ruser: String,
    args: String,
    pid: Option<u32>,
    ppid: Option<u32>,
    children: Vec<TreeExpectation>,
}

impl TreeExpectation {
    /// Expects a childless process run by `ruser` with command line `args`.
    #[must_use]
    pub fn new(ruser: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            ruser: ruser.into(),
            args: args.into(),
            pid: None,
            ppid: None,
            children: Vec::new(),
        }
    }

    /// Also requires the process to have this pid.
    #[must_use]
    pub const fn pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Also requires the process to have this parent pid.
    #[must_use]
    pub const fn ppid(mut self, ppid: u32) -> Self {
        self.ppid = Some(ppid);
        self
    }

    /// Adds one expected child.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Adds several expected children.
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Whether `tree` has the expected shape.
    #[must_use]
    pub fn matches(&self, tree: &ProcessTree) -> bool {
        self.check(tree).is_ok()
    }

    /// Compares `tree` against this expectation.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeMismatch`] describing every differing field of the
    /// root and, recursively, the children that could not be paired up.
    pub fn check(&self, tree: &ProcessTree) -> Result<(), TreeMismatch> {
        let fields = self.field_mismatches(tree);
        let children = self.children_mismatch(&tree.children);
        if fields.is_empty() && children.is_none() {
            return Ok(());
        }
        Err(TreeMismatch {
            expected: self.describe_fields(),
            child_count: self.children.len(),
            fields,
            children,
        })
    }

    fn field_mismatches(&self, tree: &ProcessTree) -> Vec<FieldMismatch> {
        let row = &tree.row;
        let mut out = Vec::new();
        if row.args != self.args {
            out.push(FieldMismatch::new("args", &self.args, &row.args));
        }
        if let Some(pid) = self.pid.filter(|pid| *pid != row.pid) {
            out.push(FieldMismatch::new("pid", pid, row.pid));
        }
        if let Some(ppid) = self.ppid.filter(|ppid| *ppid != row.ppid) {
            out.push(FieldMismatch::new("ppid", ppid, row.ppid));
        }
        if row.ruser != self.ruser {
            out.push(FieldMismatch::new("ruser", &self.ruser, &row.ruser));
        }
        out
    }

    fn children_mismatch(&self, actual: &[ProcessTree]) -> Option<ChildrenMismatch> {
        if actual.len() != self.children.len() {
            return Some(ChildrenMismatch::Count {
                expected: self.children.len(),
                actual: actual.len(),
            });
        }

        let compatible: Vec<Vec<bool>> = self
            .children
            .iter()
            .map(|exp| actual.iter().map(|child| exp.matches(child)).collect())
            .collect();
        let owner = assign(&compatible, actual.len());

        let mut paired = vec![false; self.children.len()];
        for exp in owner.iter().flatten() {
            paired[*exp] = true;
        }
        let spare_children = owner
            .iter()
            .enumerate()
            .filter(|(_, exp)| exp.is_none())
            .map(|(child, _)| &actual[child]);
        let spare_expectations = self
            .children
            .iter()
            .zip(&paired)
            .filter(|(_, done)| !**done)
            .map(|(exp, _)| exp);

        // With a maximum assignment no spare expectation fits a spare child,
        // so every pair below yields a mismatch.
        let mismatches: Vec<TreeMismatch> = spare_expectations
            .zip(spare_children)
            .filter_map(|(exp, child)| exp.check(child).err())
            .collect();
        if mismatches.is_empty() {
            None
        } else {
            Some(ChildrenMismatch::Unpaired(mismatches))
        }
    }

    fn describe_fields(&self) -> String {
        let mut parts = vec![format!("args={:?}", self.args)];
        if let Some(pid) = self.pid {
            parts.push(format!("pid={pid}"));
        }
        if let Some(ppid) = self.ppid {
            parts.push(format!("ppid={ppid}"));
        }
        parts.push(format!("ruser={:?}", self.ruser));
        parts.join(", ")
    }
}

impl fmt::Display for TreeExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeExpectation({}, children=[", self.describe_fields())?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child}")?;
        }
        f.write_str("])")
    }
}

/// Maximum bipartite assignment of expectations to children.
///
/// Returns, for each child, the index of the expectation it was paired with.
fn assign(compatible: &[Vec<bool>], children: usize) -> Vec<Option<usize>> {
    let mut owner = vec![None; children];
    for exp in 0..compatible.len() {
        let mut seen = vec![false; children];
        let _ = augment(exp, compatible, &mut seen, &mut owner);
    }
    owner
}

fn augment(
    exp: usize,
    compatible: &[Vec<bool>],
    seen: &mut [bool],
    owner: &mut [Option<usize>],
) -> bool {
    for child in 0..owner.len() {
        if !compatible[exp][child] || seen[child] {
            continue;
        }
        seen[child] = true;
        let free = match owner[child] {
            None => true,
            Some(other) => augment(other, compatible, seen, owner),
        };
        if free {
            owner[child] = Some(exp);
            return true;
        }
    }
    false
}

/// A row field that differs from the expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    /// Field name.
    pub field: &'static str,
    /// Expected value, formatted.
    pub expected: String,
    /// Actual value, formatted.
    pub actual: String,
}

impl FieldMismatch {
    fn new(field: &'static str, expected: impl fmt::Debug, actual: impl fmt::Debug) -> Self {
        Self {
            field,
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.field, self.expected, self.actual)
    }
}

/// Why the children of a node did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildrenMismatch {
    /// The node has the wrong number of children.
    Count {
        /// Number of expected children.
        expected: usize,
        /// Number of actual children.
        actual: usize,
    },
    /// Some expected children could not be paired with an actual child.
    Unpaired(Vec<TreeMismatch>),
}

impl fmt::Display for ChildrenMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count { expected, actual } => {
                write!(f, "expected {expected} children, got {actual}")
            }
            Self::Unpaired(mismatches) => {
                writeln!(f, "{} unpaired children:", mismatches.len())?;
                for m in mismatches {
                    write!(f, "{m}")?;
                    f.write_str("\n")?;
                }
                Ok(())
            }
        }
    }
}

/// Description of how a tree differs from a [`TreeExpectation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMismatch {
    /// The expected root fields, formatted.
    pub expected: String,
    /// Number of expected children.
    pub child_count: usize,
    /// Differing fields of the root row.
    pub fields: Vec<FieldMismatch>,
    /// Child mismatches, if any.
    pub children: Option<ChildrenMismatch>,
}

impl fmt::Display for TreeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.child_count == 1 { "" } else { "ren" };
        writeln!(
            f,
            "PsTree({} with {} child{suffix}) mismatch: [",
            self.expected, self.child_count
        )?;
        for field in &self.fields {
            writeln!(f, "  {field}")?;
        }
        if let Some(children) = &self.children {
            writeln!(f, "  mismatches in children:")?;
            for line in children.to_string().lines() {
                writeln!(f, "    {line}")?;
            }
        }
        f.write_str("]")
    }
}

impl std::error::Error for TreeMismatch {}
