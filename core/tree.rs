use crate::error::{AppError, Result};
use log;
use serde::Serialize;
use std::cmp::Ordering;

/// One node of the directory tree built from the packed file paths.
///
/// Children are kept sorted: directories first, then by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

fn sibling_order(a: &TreeNode, b: &TreeNode) -> Ordering {
    b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name))
}

impl TreeNode {
    fn new(name: &str, is_dir: bool) -> Self {
        Self {
            name: name.to_string(),
            is_dir,
            children: Vec::new(),
        }
    }

    /// An empty root standing for the source directory.
    pub fn root() -> Self {
        Self::new("", true)
    }

    fn insert(&mut self, components: &[&str]) -> Result<()> {
        let Some((first, rest)) = components.split_first() else {
            return Ok(());
        };
        let is_dir = !rest.is_empty();

        let index = match self.children.iter().position(|child| child.name == *first) {
            Some(index) => {
                let existing = &self.children[index];
                if existing.is_dir != is_dir {
                    return Err(AppError::TreeConflict(format!(
                        "'{}' is both a file and a directory",
                        first
                    )));
                }
                if !is_dir {
                    log::debug!("Duplicate file path component ignored: {}", first);
                    return Ok(());
                }
                index
            }
            None => {
                let node = TreeNode::new(first, is_dir);
                let position = self
                    .children
                    .binary_search_by(|child| sibling_order(child, &node))
                    .unwrap_or_else(|position| position);
                self.children.insert(position, node);
                position
            }
        };

        if is_dir {
            self.children[index].insert(rest)?;
        }
        Ok(())
    }

    /// Every file reachable from this node, as forward-slash paths relative to it.
    pub fn file_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for child in &self.children {
            child.collect_paths("", &mut paths);
        }
        paths
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", prefix, self.name)
        };
        if self.is_dir {
            for child in &self.children {
                child.collect_paths(&path, out);
            }
        } else {
            out.push(path);
        }
    }

    /// True when every level below this node respects the sibling ordering.
    pub fn is_sorted(&self) -> bool {
        self.children
            .windows(2)
            .all(|pair| sibling_order(&pair[0], &pair[1]) == Ordering::Less)
            && self.children.iter().all(TreeNode::is_sorted)
    }
}

/// Builds the tree for a list of forward-slash relative file paths.
///
/// A path that contradicts an earlier one (a file used as a directory) is
/// logged and skipped.
pub fn build_tree<S: AsRef<str>>(paths: &[S]) -> TreeNode {
    log::debug!("Building tree structure from {} paths...", paths.len());
    let mut root = TreeNode::root();
    for path in paths {
        let path = path.as_ref();
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        if let Err(e) = root.insert(&components) {
            log::error!("Error inserting node into tree for path \"{}\": {}", path, e);
        }
    }
    root
}

/// Renders one line per node below `root`, two spaces per level, directories with a trailing `/`.
pub fn render_tree(root: &TreeNode) -> String {
    let mut out = String::new();
    for child in &root.children {
        render_node(child, 0, &mut out);
    }
    out
}

fn render_node(node: &TreeNode, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.name);
    if node.is_dir {
        out.push('/');
    }
    out.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}
