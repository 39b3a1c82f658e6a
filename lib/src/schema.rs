use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel for an unbounded maximum cardinality, as in ShExJ.
pub const UNBOUNDED: i64 = -1;

/// A shape schema: a set of shape declarations with a designated start
/// shape. This is the structured (ShExJ) form of a compact-syntax document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub start: String,
    pub shapes: Vec<ShapeDecl>,
}

impl Schema {
    /// Looks up a shape declaration by id.
    pub fn resolve(&self, id: &str) -> Option<&ShapeDecl> {
        self.shapes.iter().find(|s| s.id == id)
    }

    /// Id of the first declared shape, used as the fallback when a
    /// requested shape id does not resolve.
    pub fn first_shape_id(&self) -> Option<&str> {
        self.shapes.first().map(|s| s.id.as_str())
    }

    /// Shape lookup table keyed by id.
    pub fn shapes_map(&self) -> HashMap<&str, &ShapeDecl> {
        self.shapes.iter().map(|s| (s.id.as_str(), s)).collect()
    }

    pub fn from_json(text: &str) -> serde_json::Result<Schema> {
        serde_json::from_str(text)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A single shape declaration. A declaration without an expression is valid
/// but structurally empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDecl {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<ShapeExpression>,
}

/// The expression carried by a shape declaration: an ordered sequence of
/// triple constraints. An expression without the sequence is valid but
/// structurally empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeExpression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expressions: Option<Vec<TripleConstraint>>,
}

/// One predicate-plus-value-type-plus-cardinality rule within a shape.
///
/// `min`/`max` default to `(1, 1)` when absent; `max == UNBOUNDED` means no
/// upper bound. A constraint without a predicate (e.g. a disjunction
/// placeholder) yields no predicate label and is skipped by the tree and
/// graph builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripleConstraint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(rename = "valueExpr", skip_serializing_if = "Option::is_none")]
    pub value_expr: Option<ValueExpr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl TripleConstraint {
    pub fn predicate_label(&self) -> Option<&str> {
        self.predicate.as_deref()
    }

    /// Effective `(min, max)` pair with the `(1, 1)` default applied.
    pub fn cardinality(&self) -> (i64, i64) {
        (self.min.unwrap_or(1), self.max.unwrap_or(1))
    }

    /// Display label for the cardinality: a well-known shorthand where one
    /// exists, `{min,max}` otherwise (`{min,}` when unbounded).
    pub fn cardinality_label(&self) -> String {
        match self.cardinality() {
            (0, UNBOUNDED) => "*".to_string(),
            (1, UNBOUNDED) => "+".to_string(),
            (0, 1) => "?".to_string(),
            (min, UNBOUNDED) => format!("{{{},}}", min),
            (min, max) => format!("{{{},{}}}", min, max),
        }
    }

    /// Display label for the value type: the referenced shape id, a
    /// node-kind keyword, a datatype name, a rendered value set, or `.`
    /// when the constraint accepts any node.
    pub fn constraint_label(&self, schema: &Schema) -> String {
        match &self.value_expr {
            None => ".".to_string(),
            Some(ValueExpr::Ref(id)) => {
                if schema.resolve(id).is_none() {
                    debug!("shape reference '{}' does not resolve in schema", id);
                }
                id.clone()
            }
            Some(ValueExpr::Node(nc)) => {
                if let Some(kind) = &nc.node_kind {
                    kind.keyword().to_string()
                } else if let Some(datatype) = &nc.datatype {
                    datatype.clone()
                } else if let Some(values) = &nc.values {
                    format!("[{}]", values.join(" "))
                } else {
                    ".".to_string()
                }
            }
        }
    }
}

/// The value-type descriptor of a triple constraint: either a reference to
/// another shape by id, or an inline node constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueExpr {
    Ref(String),
    Node(NodeConstraint),
}

/// An inline node constraint: a node-kind restriction, a datatype, or an
/// enumerated value set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConstraint {
    #[serde(rename = "nodeKind", skip_serializing_if = "Option::is_none")]
    pub node_kind: Option<NodeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl NodeConstraint {
    pub fn kind(kind: NodeKind) -> Self {
        NodeConstraint {
            node_kind: Some(kind),
            datatype: None,
            values: None,
        }
    }

    pub fn datatype(datatype: impl Into<String>) -> Self {
        NodeConstraint {
            node_kind: None,
            datatype: Some(datatype.into()),
            values: None,
        }
    }

    pub fn value_set(values: Vec<String>) -> Self {
        NodeConstraint {
            node_kind: None,
            datatype: None,
            values: Some(values),
        }
    }
}

/// Node-kind restriction of a node constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Iri,
    BNode,
    NonLiteral,
    Literal,
}

impl NodeKind {
    /// The compact-syntax keyword for this node kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            NodeKind::Iri => "IRI",
            NodeKind::BNode => "BNODE",
            NodeKind::NonLiteral => "NONLITERAL",
            NodeKind::Literal => "LITERAL",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<NodeKind> {
        match keyword {
            "IRI" => Some(NodeKind::Iri),
            "BNODE" => Some(NodeKind::BNode),
            "NONLITERAL" => Some(NodeKind::NonLiteral),
            "LITERAL" => Some(NodeKind::Literal),
            _ => None,
        }
    }
}
