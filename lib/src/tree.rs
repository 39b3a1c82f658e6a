use crate::schema::Schema;
use log::{debug, warn};
use std::collections::HashSet;
use std::fmt;

/// A node in the ordered labeled tree of a shape.
///
/// One node per constraint occurrence: unlike [`crate::graph::SchemaGraph`],
/// identical labels are never merged, so the tree preserves multiplicity.
/// Evaluation sizes schemas by this tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeNode {
    pub label: String,
    pub children: Vec<ShapeNode>,
}

impl ShapeNode {
    pub fn new(label: impl Into<String>) -> Self {
        ShapeNode {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Builder-style child attachment.
    pub fn with_child(mut self, child: ShapeNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes below this one. A tree of `n` triple constraints has
    /// size `3 * n`: predicate, value constraint, and cardinality node each.
    pub fn size(&self) -> usize {
        self.children.iter().map(|c| c.size() + 1).sum()
    }

    fn collect_paths<'a>(&'a self, current: &mut Vec<&'a str>, paths: &mut Vec<Vec<&'a str>>) {
        current.push(&self.label);
        if self.children.is_empty() {
            paths.push(current.clone());
        } else {
            for child in &self.children {
                child.collect_paths(current, paths);
            }
        }
        current.pop();
    }
}

/// Prints one root-to-leaf path per line.
impl fmt::Display for ShapeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths = Vec::new();
        self.collect_paths(&mut Vec::new(), &mut paths);
        let rendered: Vec<String> = paths.iter().map(|path| path.join(" -> ")).collect();
        write!(f, "{}", rendered.join("\n"))
    }
}

/// Builds the ordered labeled tree for `shape_id`.
///
/// A shape id absent from the schema falls back to the first declared shape
/// with a warning. Each constraint contributes a
/// `predicate → value constraint → cardinality` chain under the root;
/// constraints whose predicate label cannot be determined are skipped.
pub fn build_shape_tree(schema: &Schema, shape_id: &str) -> ShapeNode {
    let (id, shape) = match schema.resolve(shape_id) {
        Some(shape) => (shape_id, shape),
        None => match schema.shapes.first() {
            Some(first) => {
                warn!(
                    "shape '{}' not declared, falling back to '{}'",
                    shape_id, first.id
                );
                (first.id.as_str(), first)
            }
            None => {
                warn!("schema declares no shapes, building root-only tree");
                return ShapeNode::new(shape_id);
            }
        },
    };

    let mut root = ShapeNode::new(id);
    let constraints = match shape.expression.as_ref() {
        Some(expression) => match &expression.expressions {
            Some(constraints) => constraints,
            None => {
                warn!("no constraint sequence in shape '{}'", id);
                return root;
            }
        },
        None => {
            warn!("no expression in shape '{}'", id);
            return root;
        }
    };

    for tc in constraints {
        let predicate = match tc.predicate_label() {
            Some(predicate) => predicate,
            None => {
                debug!("skipping constraint without predicate in '{}'", id);
                continue;
            }
        };
        root.children.push(
            ShapeNode::new(predicate).with_child(
                ShapeNode::new(tc.constraint_label(schema))
                    .with_child(ShapeNode::new(tc.cardinality_label())),
            ),
        );
    }
    root
}

/// Imposes the canonical sibling order on a pair of trees prior to edit
/// distance.
///
/// Children whose label also occurs among the other tree's root children
/// sort before children whose label does not, ties broken by label; the
/// sort recurses through every level with that same membership set. Ordered
/// tree edit distance is order-sensitive and the source data has no
/// canonical child order, so this lines the structurally common branches up
/// at matching positions.
pub fn canonicalize_pair(a: &mut ShapeNode, b: &mut ShapeNode) {
    let b_labels: HashSet<String> = b.children.iter().map(|c| c.label.clone()).collect();
    let a_labels: HashSet<String> = a.children.iter().map(|c| c.label.clone()).collect();
    sort_recursive(a, &b_labels);
    sort_recursive(b, &a_labels);
}

fn sort_recursive(node: &mut ShapeNode, shared: &HashSet<String>) {
    node.children
        .sort_by(|x, y| {
            (!shared.contains(&x.label), &x.label).cmp(&(!shared.contains(&y.label), &y.label))
        });
    for child in &mut node.children {
        sort_recursive(child, shared);
    }
}
