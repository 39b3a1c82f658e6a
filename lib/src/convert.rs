use crate::comments::{extract_comments, reinsert_comments, CommentRecord};
use crate::error::ConvertError;
use crate::namespaces::{scan_base, scan_prefixes, NamespaceTable};
use crate::schema::Schema;
use log::warn;

/// A line-tagged message reported by a grammar engine. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub message: String,
    pub line: usize,
}

/// The external grammar collaborator: turns compact-syntax text into a
/// structured schema, or reports where it could not.
///
/// The contract the converter relies on: a successful parse yields a
/// non-empty schema; an unsuccessful one yields no schema and, when the
/// failure is attributable to specific lines, one diagnostic per offending
/// line.
pub trait GrammarEngine {
    fn parse(&self, text: &str) -> (Option<Schema>, Vec<ParseDiagnostic>);
}

/// The external serializer collaborator: renders a structured schema back
/// to compact-syntax text using the supplied namespace table.
pub trait SchemaWriter {
    fn write(&self, schema: &Schema, base: Option<&str>, namespaces: &NamespaceTable) -> String;
}

/// Everything recovered from one compact-syntax document.
#[derive(Debug)]
pub struct Conversion {
    pub schema: Schema,
    pub base: Option<String>,
    pub namespaces: NamespaceTable,
    pub comments: Vec<CommentRecord>,
    /// 1-based line numbers dropped during parse recovery; empty on a clean
    /// parse.
    pub dropped_lines: Vec<usize>,
}

/// Converts compact-syntax text to its structured form, recovering once
/// from a partial parse failure.
///
/// If the first engine invocation yields no schema but line-tagged
/// diagnostics, the distinct offending lines are stripped and the engine is
/// invoked exactly once more; a second failure is terminal. The comment,
/// base-URI and namespace scans always run against the original text, so
/// declarations and comments outside the dropped lines survive a degraded
/// parse.
pub fn shexc_to_shexj<E: GrammarEngine>(
    engine: &E,
    text: &str,
) -> Result<Conversion, ConvertError> {
    let (schema, diagnostics) = engine.parse(text);
    let (schema, dropped_lines) = match schema {
        Some(schema) => (schema, Vec::new()),
        None if !diagnostics.is_empty() => {
            let mut lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
            lines.sort_unstable();
            lines.dedup();
            for diagnostic in &diagnostics {
                warn!("line {}: {}", diagnostic.line, diagnostic.message);
            }
            warn!("parse failed, retrying without lines {:?}", lines);
            let reduced = remove_lines(text, &lines);
            match engine.parse(&reduced).0 {
                Some(schema) => (schema, lines),
                None => return Err(ConvertError::UnrecoverableParse { lines }),
            }
        }
        None => return Err(ConvertError::ParseFailure),
    };

    Ok(Conversion {
        schema,
        base: scan_base(text),
        namespaces: scan_prefixes(text),
        comments: extract_comments(text),
        dropped_lines,
    })
}

/// Renders a structured schema back to compact-syntax text and reinserts
/// the given comments. Falls back to the well-known namespace table when
/// none (or an empty one) is supplied. This path cannot fail structurally;
/// comments whose anchors cannot be relocated are dropped with a warning.
pub fn shexj_to_shexc<W: SchemaWriter>(
    writer: &W,
    schema: &Schema,
    base: Option<&str>,
    namespaces: Option<&NamespaceTable>,
    comments: &[CommentRecord],
) -> String {
    let fallback;
    let namespaces = match namespaces {
        Some(table) if !table.is_empty() => table,
        _ => {
            fallback = NamespaceTable::well_known();
            &fallback
        }
    };
    let text = writer.write(schema, base, namespaces);
    reinsert_comments(&text, comments)
}

/// Drops the given 1-based lines from `text`.
fn remove_lines(text: &str, lines: &[usize]) -> String {
    text.split('\n')
        .enumerate()
        .filter(|(idx, _)| !lines.contains(&(idx + 1)))
        .map(|(_, line)| line)
        .collect::<Vec<_>>()
        .join("\n")
}
