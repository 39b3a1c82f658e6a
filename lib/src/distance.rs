use crate::tree::{canonicalize_pair, ShapeNode};
use log::warn;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default wall-clock budget for the graph edit distance search.
pub const DEFAULT_GED_TIMEOUT: Duration = Duration::from_secs(60);

/// Unit-cost Zhang–Shasha edit distance between two ordered labeled trees:
/// insert 1, delete 1, relabel 0 when labels are equal and 1 otherwise.
/// Deterministic given canonically ordered inputs.
pub fn tree_edit_distance(a: &ShapeNode, b: &ShapeNode) -> usize {
    let t1 = PostOrder::of(a);
    let t2 = PostOrder::of(b);
    let n = t1.len();
    let m = t2.len();
    let mut td = vec![vec![0usize; m + 1]; n + 1];
    for &i in &t1.keyroots {
        for &j in &t2.keyroots {
            forest_distance(&t1, &t2, i, j, &mut td);
        }
    }
    td[n][m]
}

/// Canonicalizes the sibling order of both trees, then computes their edit
/// distance. Mutates the trees in place, like the ordering requires.
pub fn canonical_tree_edit_distance(a: &mut ShapeNode, b: &mut ShapeNode) -> usize {
    canonicalize_pair(a, b);
    tree_edit_distance(a, b)
}

/// Distance normalized by ground-truth tree size: `ted / (3 * size)`, the
/// factor 3 reflecting the three tree nodes each triple constraint
/// contributes. `None` when the ground-truth tree is empty.
pub fn normalized_tree_edit_distance(ted: usize, ground_truth: &ShapeNode) -> Option<f64> {
    let size = ground_truth.size();
    if size == 0 {
        warn!(
            "ground-truth tree '{}' is empty, normalized distance undefined",
            ground_truth.label
        );
        return None;
    }
    Some(ted as f64 / (3.0 * size as f64))
}

/// Trees flattened to postorder, 1-based, with leftmost-leaf indices and
/// keyroots, as the Zhang–Shasha recurrence wants them.
struct PostOrder {
    labels: Vec<String>,
    lml: Vec<usize>,
    keyroots: Vec<usize>,
}

impl PostOrder {
    fn of(root: &ShapeNode) -> PostOrder {
        let mut labels = vec![String::new()];
        let mut lml = vec![0];
        walk(root, &mut labels, &mut lml);

        // A keyroot is the highest postorder index sharing its leftmost
        // leaf; the root is always one.
        let mut last: HashMap<usize, usize> = HashMap::new();
        for (idx, &leaf) in lml.iter().enumerate().skip(1) {
            last.insert(leaf, idx);
        }
        let mut keyroots: Vec<usize> = last.into_values().collect();
        keyroots.sort_unstable();
        PostOrder { labels, lml, keyroots }
    }

    fn len(&self) -> usize {
        self.labels.len() - 1
    }
}

fn walk(node: &ShapeNode, labels: &mut Vec<String>, lml: &mut Vec<usize>) -> usize {
    let mut first_leaf = None;
    for child in &node.children {
        let child_idx = walk(child, labels, lml);
        if first_leaf.is_none() {
            first_leaf = Some(lml[child_idx]);
        }
    }
    labels.push(node.label.clone());
    let idx = labels.len() - 1;
    lml.push(first_leaf.unwrap_or(idx));
    idx
}

fn forest_distance(t1: &PostOrder, t2: &PostOrder, i: usize, j: usize, td: &mut [Vec<usize>]) {
    let li = t1.lml[i];
    let lj = t2.lml[j];
    let w = i - li + 2;
    let h = j - lj + 2;
    let mut fd = vec![vec![0usize; h]; w];
    for x in 1..w {
        fd[x][0] = fd[x - 1][0] + 1;
    }
    for y in 1..h {
        fd[0][y] = fd[0][y - 1] + 1;
    }
    for x in 1..w {
        for y in 1..h {
            let node1 = li + x - 1;
            let node2 = lj + y - 1;
            if t1.lml[node1] == li && t2.lml[node2] == lj {
                let relabel = usize::from(t1.labels[node1] != t2.labels[node2]);
                fd[x][y] = (fd[x - 1][y] + 1)
                    .min(fd[x][y - 1] + 1)
                    .min(fd[x - 1][y - 1] + relabel);
                td[node1][node2] = fd[x][y];
            } else {
                let p = t1.lml[node1] - li;
                let q = t2.lml[node2] - lj;
                fd[x][y] = (fd[x - 1][y] + 1)
                    .min(fd[x][y - 1] + 1)
                    .min(fd[p][q] + td[node1][node2]);
            }
        }
    }
}

/// Outcome of a bounded graph edit distance search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GedOutcome {
    /// Best total edit cost found; `None` when the deadline expired before
    /// any complete mapping was explored.
    pub distance: Option<u64>,
    /// Whether the search ran to completion. When false the distance is a
    /// best-effort upper bound, not guaranteed optimal.
    pub exact: bool,
}

/// Edit distance between two directed label graphs.
///
/// Substitution costs 0 for equal labels and 1 otherwise, for nodes and
/// edges alike; insertions and deletions cost 1. `roots` anchors the search
/// so the two roots map to each other. The branch-and-bound search is cut
/// off at `timeout` and reports whatever bound it has reached by then —
/// a timeout is a degraded answer, never an error.
pub fn graph_edit_distance(
    g1: &DiGraph<String, String>,
    g2: &DiGraph<String, String>,
    roots: Option<(NodeIndex, NodeIndex)>,
    timeout: Duration,
) -> GedOutcome {
    let mut order: Vec<NodeIndex> = g1.node_indices().collect();
    if let Some((root1, _)) = roots {
        order.retain(|&n| n != root1);
        order.insert(0, root1);
    }
    let mut search = Search {
        g1,
        g2,
        order,
        g2_nodes: g2.node_indices().collect(),
        root2: roots.map(|(_, root2)| root2),
        deadline: Instant::now() + timeout,
        expired: false,
        best: None,
    };
    let mut mapping = Vec::with_capacity(search.order.len());
    let mut used = vec![false; g2.node_count()];
    search.dfs(&mut mapping, &mut used, 0);

    if search.expired {
        warn!(
            "graph edit distance timed out after {:?}, returning best effort",
            timeout
        );
    }
    GedOutcome {
        distance: search.best,
        exact: !search.expired,
    }
}

struct Search<'a> {
    g1: &'a DiGraph<String, String>,
    g2: &'a DiGraph<String, String>,
    order: Vec<NodeIndex>,
    g2_nodes: Vec<NodeIndex>,
    root2: Option<NodeIndex>,
    deadline: Instant,
    expired: bool,
    best: Option<u64>,
}

impl Search<'_> {
    fn dfs(&mut self, mapping: &mut Vec<Option<NodeIndex>>, used: &mut [bool], cost: u64) {
        if self.expired {
            return;
        }
        if Instant::now() >= self.deadline {
            self.expired = true;
            return;
        }
        let pos = mapping.len();
        let available = used.iter().filter(|&&u| !u).count();
        let remaining = self.order.len() - pos;
        // Every surplus node on either side costs at least one edit.
        let bound = cost + remaining.abs_diff(available) as u64;
        if let Some(best) = self.best {
            if bound >= best {
                return;
            }
        }
        if pos == self.order.len() {
            let total = cost + self.insertion_cost(used);
            if total < self.best.unwrap_or(u64::MAX) {
                self.best = Some(total);
            }
            return;
        }

        let u = self.order[pos];
        let mut candidates: Vec<NodeIndex> = self
            .g2_nodes
            .iter()
            .copied()
            .filter(|&v| !used[v.index()])
            .collect();
        if pos == 0 {
            if let Some(root2) = self.root2 {
                candidates.retain(|&v| v == root2);
            }
        }
        // Equal labels first so a cheap complete mapping is found early.
        candidates.sort_by_key(|&v| self.g2[v] != self.g1[u]);

        for v in candidates {
            let delta =
                u64::from(self.g1[u] != self.g2[v]) + self.edge_delta(u, Some(v), mapping);
            mapping.push(Some(v));
            used[v.index()] = true;
            self.dfs(mapping, used, cost + delta);
            used[v.index()] = false;
            mapping.pop();
        }

        // Deletion branch; an anchored root is never deleted.
        if pos != 0 || self.root2.is_none() {
            let delta = 1 + self.edge_delta(u, None, mapping);
            mapping.push(None);
            self.dfs(mapping, used, cost + delta);
            mapping.pop();
        }
    }

    /// Edge cost incurred by giving `u` the image `image`, against all
    /// previously placed nodes, in both directions.
    fn edge_delta(
        &self,
        u: NodeIndex,
        image: Option<NodeIndex>,
        mapping: &[Option<NodeIndex>],
    ) -> u64 {
        let mut cost = 0;
        for (k, &mw) in mapping.iter().enumerate() {
            let w = self.order[k];
            for (a, b, ia, ib) in [(u, w, image, mw), (w, u, mw, image)] {
                let e1 = self.g1.find_edge(a, b);
                match (ia, ib) {
                    (Some(x), Some(y)) => {
                        let e2 = self.g2.find_edge(x, y);
                        cost += match (e1, e2) {
                            (Some(e1), Some(e2)) => u64::from(self.g1[e1] != self.g2[e2]),
                            (None, None) => 0,
                            _ => 1,
                        };
                    }
                    // One endpoint is deleted: a g1 edge there is deleted too.
                    _ => cost += u64::from(e1.is_some()),
                }
            }
        }
        cost
    }

    /// Cost of inserting every g2 node that received no preimage, plus
    /// every g2 edge touching one.
    fn insertion_cost(&self, used: &[bool]) -> u64 {
        let mut cost = self
            .g2_nodes
            .iter()
            .filter(|&&v| !used[v.index()])
            .count() as u64;
        for edge in self.g2.edge_references() {
            if !used[edge.source().index()] || !used[edge.target().index()] {
                cost += 1;
            }
        }
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::GrammarEngine;
    use crate::graph::SchemaGraph;
    use crate::syntax::CompactReader;
    use crate::tree::build_shape_tree;

    fn tree(text: &str, shape: &str) -> ShapeNode {
        let schema = CompactReader.parse(text).0.unwrap();
        build_shape_tree(&schema, shape)
    }

    fn leaf(label: &str) -> ShapeNode {
        ShapeNode::new(label)
    }

    #[test]
    fn identical_trees_are_at_distance_zero() {
        let mut a = tree("start = @<H>\n<H> {\n  wdt:P31 [wd:Q5] ;\n  wdt:P569 . ?\n}", "H");
        let mut b = a.clone();
        assert_eq!(canonical_tree_edit_distance(&mut a, &mut b), 0);
        assert_eq!(normalized_tree_edit_distance(0, &a), Some(0.0));
    }

    #[test]
    fn distance_is_symmetric() {
        let a0 = tree("<A> {\n  wdt:P31 [wd:Q5] ;\n  wdt:P19 @<A> *\n}", "A");
        let b0 = tree("<A> {\n  wdt:P31 IRI ;\n  wdt:P569 . ?\n}", "A");
        let (mut a, mut b) = (a0.clone(), b0.clone());
        let ab = canonical_tree_edit_distance(&mut a, &mut b);
        let (mut b, mut a) = (b0, a0);
        let ba = canonical_tree_edit_distance(&mut b, &mut a);
        assert_eq!(ab, ba);
        assert!(ab > 0);
    }

    #[test]
    fn zhang_shasha_reference_example() {
        // The classic pair: f(d(a, c(b)), e) vs f(c(d(a, b)), e).
        let a = leaf("f")
            .with_child(leaf("d").with_child(leaf("a")).with_child(leaf("c").with_child(leaf("b"))))
            .with_child(leaf("e"));
        let b = leaf("f")
            .with_child(leaf("c").with_child(leaf("d").with_child(leaf("a")).with_child(leaf("b"))))
            .with_child(leaf("e"));
        assert_eq!(tree_edit_distance(&a, &b), 2);
    }

    #[test]
    fn single_relabel_costs_one() {
        // Same constraint, cardinality (0,unbounded) vs the (1,1) default:
        // only the cardinality leaf differs.
        let mut truth = tree("start = @<Person>\n<Person> {\n  knows @<Person> *\n}", "Person");
        let mut predicted = tree("start = @<Person>\n<Person> {\n  knows @<Person>\n}", "Person");
        assert_eq!(truth.size(), 3);
        let ted = canonical_tree_edit_distance(&mut truth, &mut predicted);
        assert_eq!(ted, 1);
        let normalized = normalized_tree_edit_distance(ted, &truth).unwrap();
        assert!((normalized - 1.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn insertion_and_deletion_are_unit_cost() {
        let a = leaf("r").with_child(leaf("x"));
        let b = leaf("r").with_child(leaf("x")).with_child(leaf("y"));
        assert_eq!(tree_edit_distance(&a, &b), 1);
        assert_eq!(tree_edit_distance(&b, &a), 1);
    }

    #[test]
    fn normalization_of_an_empty_tree_is_undefined() {
        assert_eq!(normalized_tree_edit_distance(3, &leaf("empty")), None);
    }

    fn graph(text: &str) -> SchemaGraph {
        SchemaGraph::build(&CompactReader.parse(text).0.unwrap())
    }

    #[test]
    fn ged_of_identical_graphs_is_zero() {
        let g1 = graph("start = @<S>\n<S> {\n  wdt:P31 [wd:Q5] +\n}");
        let g2 = graph("start = @<S>\n<S> {\n  wdt:P31 [wd:Q5] +\n}");
        let outcome = graph_edit_distance(
            g1.graph(),
            g2.graph(),
            Some((g1.root(), g2.root())),
            DEFAULT_GED_TIMEOUT,
        );
        assert_eq!(outcome.distance, Some(0));
        assert!(outcome.exact);
    }

    #[test]
    fn ged_counts_node_and_edge_relabels() {
        // B vs C: one node substitution plus the incident edge label change.
        let g1 = graph("start = @<S>\n<S> {\n  wdt:P31 @<B>\n}\n<B> {\n}");
        let g2 = graph("start = @<S>\n<S> {\n  wdt:P31 @<C>\n}\n<C> {\n}");
        let outcome = graph_edit_distance(
            g1.graph(),
            g2.graph(),
            Some((g1.root(), g2.root())),
            DEFAULT_GED_TIMEOUT,
        );
        assert!(outcome.exact);
        // Value node B→C plus the two incident edge label changes.
        assert_eq!(outcome.distance, Some(3));
    }

    #[test]
    fn ged_timeout_yields_best_effort_not_an_error() {
        let g1 = graph("start = @<S>\n<S> {\n  wdt:P1 . ;\n  wdt:P2 . ;\n  wdt:P3 . ;\n  wdt:P4 .\n}");
        let g2 = graph("start = @<S>\n<S> {\n  wdt:P5 . ;\n  wdt:P6 . ;\n  wdt:P7 . ;\n  wdt:P8 .\n}");
        let outcome =
            graph_edit_distance(g1.graph(), g2.graph(), None, Duration::from_secs(0));
        assert!(!outcome.exact);
        assert_eq!(outcome.distance, None);
    }
}
