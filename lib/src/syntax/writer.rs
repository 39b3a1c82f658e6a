use crate::convert::SchemaWriter;
use crate::namespaces::{NamespaceTable, RDF_TYPE};
use crate::schema::{Schema, TripleConstraint, ValueExpr};
use log::warn;

/// Serializer for the minimal compact-syntax profile.
///
/// Prints `BASE`/`PREFIX` declarations, the start declaration, and one
/// shape block per declaration. URIs are compacted through the supplied
/// namespace table where possible; `rdf:type` prints as `a`. Default
/// `(1,1)` cardinalities print no suffix.
pub struct CompactWriter;

impl SchemaWriter for CompactWriter {
    fn write(&self, schema: &Schema, base: Option<&str>, namespaces: &NamespaceTable) -> String {
        let mut lines: Vec<String> = Vec::new();
        if let Some(base) = base {
            lines.push(format!("BASE <{}>", base));
        }
        for (prefix, uri) in namespaces.iter() {
            lines.push(format!("PREFIX {}: <{}>", prefix, uri));
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("start = @{}", name_ref(&schema.start, namespaces)));

        for shape in &schema.shapes {
            lines.push(String::new());
            lines.push(format!("{} {{", name_ref(&shape.id, namespaces)));
            let constraints = shape
                .expression
                .as_ref()
                .and_then(|e| e.expressions.as_deref())
                .unwrap_or(&[]);
            let rendered: Vec<String> = constraints
                .iter()
                .filter_map(|tc| {
                    if tc.predicate.is_none() {
                        warn!(
                            "constraint without predicate in shape '{}' is not serializable",
                            shape.id
                        );
                        return None;
                    }
                    Some(render_constraint(tc, namespaces))
                })
                .collect();
            let last = rendered.len().saturating_sub(1);
            for (idx, constraint) in rendered.iter().enumerate() {
                let separator = if idx < last { " ;" } else { "" };
                lines.push(format!("  {}{}", constraint, separator));
            }
            lines.push("}".to_string());
        }
        lines.join("\n")
    }
}

/// Renders a shape id, predicate, or value URI: compacted to a prefixed
/// name when the table allows, `<...>`-delimited otherwise.
fn name_ref(id: &str, namespaces: &NamespaceTable) -> String {
    namespaces
        .compact(id)
        .unwrap_or_else(|| format!("<{}>", id))
}

fn render_constraint(tc: &TripleConstraint, namespaces: &NamespaceTable) -> String {
    let predicate = match tc.predicate_label() {
        Some(RDF_TYPE) => "a".to_string(),
        Some(predicate) => name_ref(predicate, namespaces),
        None => unreachable!("filtered by caller"),
    };
    let value = match &tc.value_expr {
        None => ".".to_string(),
        Some(ValueExpr::Ref(id)) => format!("@{}", name_ref(id, namespaces)),
        Some(ValueExpr::Node(nc)) => {
            if let Some(kind) = &nc.node_kind {
                kind.keyword().to_string()
            } else if let Some(datatype) = &nc.datatype {
                name_ref(datatype, namespaces)
            } else if let Some(values) = &nc.values {
                let values: Vec<String> = values.iter().map(|v| name_ref(v, namespaces)).collect();
                format!("[{}]", values.join(" "))
            } else {
                ".".to_string()
            }
        }
    };
    let suffix = match tc.cardinality() {
        (1, 1) => String::new(),
        _ => format!(" {}", tc.cardinality_label()),
    };
    format!("{} {}{}", predicate, value, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::GrammarEngine;
    use crate::syntax::CompactReader;

    fn table() -> NamespaceTable {
        let mut table = NamespaceTable::new();
        table.bind("wdt", "http://www.wikidata.org/prop/direct/");
        table.bind("wd", "http://www.wikidata.org/entity/");
        table.bind("xsd", "http://www.w3.org/2001/XMLSchema#");
        table
    }

    const DOC: &str = "\
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
PREFIX wd: <http://www.wikidata.org/entity/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>

start = @<Human>

<Human> {
  a [wd:Q5] ;
  wdt:P19 @<Place> ;
  wdt:P569 xsd:dateTime ? ;
  wdt:P735 IRI *
}

<Place> {
  wdt:P625 . {1,2}
}";

    #[test]
    fn writes_what_the_reader_read() {
        let (schema, _) = CompactReader.parse(DOC);
        let schema = schema.unwrap();
        let written = CompactWriter.write(&schema, None, &table());
        assert_eq!(written, DOC);
    }

    #[test]
    fn reparse_of_written_text_is_lossless() {
        let (schema, _) = CompactReader.parse(DOC);
        let schema = schema.unwrap();
        let written = CompactWriter.write(&schema, None, &table());
        let (reparsed, diagnostics) = CompactReader.parse(&written);
        assert!(diagnostics.is_empty());
        assert_eq!(reparsed.unwrap(), schema);
    }

    #[test]
    fn base_declaration_leads_the_document() {
        let (schema, _) = CompactReader.parse("<S> {\n}");
        let written = CompactWriter.write(
            &schema.unwrap(),
            Some("http://example.org/base"),
            &NamespaceTable::new(),
        );
        assert!(written.starts_with("BASE <http://example.org/base>\n"));
        assert!(written.contains("start = @<S>"));
    }

    #[test]
    fn uncompactable_names_stay_angle_delimited() {
        let mut uri_only = NamespaceTable::new();
        uri_only.bind("wd", "http://www.wikidata.org/entity/");
        assert_eq!(name_ref("Human", &uri_only), "<Human>");
        assert_eq!(name_ref("http://www.wikidata.org/entity/Q5", &uri_only), "wd:Q5");
    }
}
