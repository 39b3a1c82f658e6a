use crate::schema::Schema;
use log::{debug, warn};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Directed label graph over one schema, rooted at the start shape.
///
/// Nodes are keyed by label, not by occurrence: two constraints sharing a
/// predicate or value label collapse into a single node. The tree
/// representation in [`crate::tree`] keeps the per-occurrence multiplicity
/// instead; evaluation relies on that difference, so the two builders stay
/// separate.
pub struct SchemaGraph {
    graph: DiGraph<String, String>,
    root: NodeIndex,
}

impl SchemaGraph {
    /// Builds the label graph for a schema. Each triple constraint of the
    /// start shape contributes a three-hop chain
    /// `root → predicate → value constraint → cardinality`; a structurally
    /// empty start shape yields the root-only graph with a warning.
    pub fn build(schema: &Schema) -> SchemaGraph {
        let start_id = match schema.resolve(&schema.start) {
            Some(_) => schema.start.as_str(),
            None => match schema.first_shape_id() {
                Some(first) => {
                    warn!(
                        "start shape '{}' not declared, falling back to '{}'",
                        schema.start, first
                    );
                    first
                }
                None => {
                    warn!("schema declares no shapes, building root-only graph");
                    schema.start.as_str()
                }
            },
        };

        let mut graph = DiGraph::new();
        let mut interned: HashMap<String, NodeIndex> = HashMap::new();
        let root = *interned
            .entry(start_id.to_string())
            .or_insert_with(|| graph.add_node(start_id.to_string()));

        let constraints = match schema
            .resolve(start_id)
            .and_then(|shape| shape.expression.as_ref())
        {
            Some(expression) => match &expression.expressions {
                Some(constraints) => constraints,
                None => {
                    warn!("no constraint sequence in shape '{}'", start_id);
                    return SchemaGraph { graph, root };
                }
            },
            None => {
                warn!("no expression in shape '{}'", start_id);
                return SchemaGraph { graph, root };
            }
        };

        for tc in constraints {
            let predicate = match tc.predicate_label() {
                Some(predicate) => predicate.to_string(),
                None => {
                    debug!("skipping constraint without predicate in '{}'", start_id);
                    continue;
                }
            };
            let chain = [
                predicate,
                tc.constraint_label(schema),
                tc.cardinality_label(),
            ];
            let mut source = root;
            for label in chain {
                let target = *interned
                    .entry(label.clone())
                    .or_insert_with(|| graph.add_node(label));
                let edge_label = format!("{} {}", graph[source], graph[target]);
                graph.update_edge(source, target, edge_label);
                source = target;
            }
        }

        SchemaGraph { graph, root }
    }

    pub fn graph(&self) -> &DiGraph<String, String> {
        &self.graph
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Graphviz DOT rendering of the label graph.
    pub fn to_graphviz(&self) -> String {
        let mut out = String::from("digraph schema {\n");
        for idx in self.graph.node_indices() {
            out.push_str(&format!(
                "  n{} [label=\"{}\"];\n",
                idx.index(),
                escape(&self.graph[idx])
            ));
        }
        for edge in self.graph.edge_references() {
            out.push_str(&format!(
                "  n{} -> n{} [label=\"{}\"];\n",
                edge.source().index(),
                edge.target().index(),
                escape(edge.weight())
            ));
        }
        out.push('}');
        out
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::GrammarEngine;
    use crate::syntax::CompactReader;
    use crate::tree::build_shape_tree;

    fn schema(text: &str) -> Schema {
        CompactReader.parse(text).0.unwrap()
    }

    #[test]
    fn chains_run_root_to_cardinality() {
        let s = schema(
            "start = @<Human>\n<Human> {\n  wdt:P31 [wd:Q5] ;\n  wdt:P19 @<Place> ?\n}\n<Place> {\n}",
        );
        let g = SchemaGraph::build(&s);
        // root + 2 predicates + 2 value constraints + 2 cardinalities
        assert_eq!(g.node_count(), 7);
        assert_eq!(g.edge_count(), 6);
        assert_eq!(g.graph()[g.root()], "Human");
    }

    #[test]
    fn shared_labels_merge_into_one_node() {
        let text = "start = @<S>\n<S> {\n  wdt:P31 [wd:Q5] ;\n  wdt:P31 [wd:Q5] {2,4}\n}";
        let s = schema(text);
        let g = SchemaGraph::build(&s);
        // Both constraints share predicate and value labels; only the
        // cardinality nodes differ.
        assert_eq!(g.node_count(), 5);

        // The tree keeps the multiplicity, so it is strictly larger.
        let tree = build_shape_tree(&s, "S");
        assert!(g.node_count() < tree.size() + 1);
    }

    #[test]
    fn empty_shape_builds_root_only_graph() {
        let s = schema("<Empty> {\n}");
        let g = SchemaGraph::build(&s);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn dot_output_names_every_label() {
        let s = schema("start = @<S>\n<S> {\n  wdt:P31 IRI +\n}");
        let dot = SchemaGraph::build(&s).to_graphviz();
        assert!(dot.starts_with("digraph schema {"));
        assert!(dot.contains("[label=\"wdt:P31\"]"));
        assert!(dot.contains("[label=\"S wdt:P31\"]"));
    }
}
