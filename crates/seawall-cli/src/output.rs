//! Formatted output helpers for CLI commands.

use std::fmt::Write as _;
use std::time::Duration;

use seawall_ps::tree::ProcessTree;

/// Renders a process tree with box-drawing connectors, one process per
/// line, each line terminated by a newline.
#[must_use]
pub fn render_tree(tree: &ProcessTree) -> String {
    let mut out = format!("{}\n", tree.row);
    let mut stack = Vec::new();
    push_children(&mut stack, tree, "");
    while let Some((node, prefix, last)) = stack.pop() {
        let (branch, carry) = if last {
            ("└─ ", "   ")
        } else {
            ("├─ ", "│  ")
        };
        let _ = writeln!(out, "{prefix}{branch}{}", node.row);
        push_children(&mut stack, node, &format!("{prefix}{carry}"));
    }
    out
}

// Pushed last-first so the first child is rendered next.
fn push_children<'a>(
    stack: &mut Vec<(&'a ProcessTree, String, bool)>,
    node: &'a ProcessTree,
    prefix: &str,
) {
    let count = node.children.len();
    stack.extend(
        node.children
            .iter()
            .enumerate()
            .rev()
            .map(|(i, child)| (child, prefix.to_owned(), i + 1 == count)),
    );
}

/// Formats a duration for humans (e.g., "850ms", "2.3s", "1m05s").
#[must_use]
pub fn format_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{}.{}s", millis / 1000, (millis % 1000) / 100)
    } else {
        let secs = elapsed.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use seawall_ps::row::PsRow;

    use super::*;

    #[test]
    fn render_tree_draws_branches() {
        let tree = ProcessTree::new(
            PsRow::new(1, 0, "root", "tini -- app"),
            vec![
                ProcessTree::new(
                    PsRow::new(7, 1, "app", "master"),
                    vec![
                        ProcessTree::leaf(PsRow::new(12, 7, "app", "worker")),
                        ProcessTree::leaf(PsRow::new(11, 7, "app", "worker")),
                    ],
                ),
                ProcessTree::leaf(PsRow::new(9, 1, "root", "cron")),
            ],
        );
        assert_eq!(
            render_tree(&tree),
            "1 root tini -- app\n\
             ├─ 7 app master\n\
             │  ├─ 12 app worker\n\
             │  └─ 11 app worker\n\
             └─ 9 root cron\n"
        );
    }

    #[test]
    fn render_single_process() {
        let tree = ProcessTree::leaf(PsRow::new(1, 0, "root", "sleep 5"));
        assert_eq!(render_tree(&tree), "1 root sleep 5\n");
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(2345)), "2.3s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m05s");
    }
}
