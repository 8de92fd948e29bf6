//! Read-only snapshots of a tree for display.

use std::fmt::Write as _;

use colored::{ColoredString, Colorize};
use serde::Serialize;

use arbor_tree::{Condition, NodeKey, Tree};

/// One node of a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub depth: usize,
    pub id: String,
    pub path: String,
    pub condition: Condition,
    pub summary: String,
    pub details: String,
}

/// A pre-order snapshot of one or more subtrees.
#[derive(Clone, Debug, Default)]
pub struct TreeView {
    rows: Vec<TreeRow>,
}

impl TreeView {
    /// Walk each of `roots` depth-first, in child order.
    pub fn capture(tree: &Tree, roots: &[NodeKey]) -> Self {
        let mut view = Self::default();
        for root in roots {
            view.walk(tree, *root, 0);
        }
        view
    }

    fn walk(&mut self, tree: &Tree, node: NodeKey, depth: usize) {
        let Some(id) = tree.id(node) else {
            return;
        };
        let info = tree.debug_info(node);
        self.rows.push(TreeRow {
            depth,
            id: id.to_string(),
            path: tree.full_path(node).unwrap_or_default(),
            condition: tree.condition(node),
            summary: info.summary,
            details: info.details,
        });
        for child in tree.children(node) {
            self.walk(tree, *child, depth + 1);
        }
    }

    pub fn rows(&self) -> &[TreeRow] {
        &self.rows
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{}{} [{}] {}",
                "  ".repeat(row.depth),
                row.id.bold(),
                paint(row.condition),
                row.summary.dimmed()
            );
        }
        out
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.rows)
    }

    /// Dispose the selected node. Returns `false` if nothing happened.
    pub fn dispose_selected(tree: &mut Tree, node: NodeKey) -> bool {
        tree.dispose(node)
    }
}

fn paint(condition: Condition) -> ColoredString {
    let label = condition.to_string();
    match condition {
        Condition::Available => label.green(),
        Condition::Unavailable => label.yellow(),
        Condition::Destroying | Condition::Destroyed => label.red(),
    }
}
