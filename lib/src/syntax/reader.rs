use crate::convert::{GrammarEngine, ParseDiagnostic};
use crate::namespaces::{parse_base_line, parse_prefix_line, NamespaceTable, RDF_TYPE};
use crate::schema::{
    NodeConstraint, NodeKind, Schema, ShapeDecl, ShapeExpression, TripleConstraint, ValueExpr,
    UNBOUNDED,
};
use log::warn;
use regex::Regex;
use std::sync::OnceLock;

fn start_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i:start)\s*=\s*@(.+)$").unwrap())
}

fn braces_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{(\d+)(,(\d+)?)?\}$").unwrap())
}

/// Line-oriented reader for the minimal compact-syntax profile.
///
/// The reader is strict: any line it cannot account for yields a
/// line-tagged diagnostic and no schema, which is what lets the converter's
/// strip-and-retry recovery decide how much of a document is salvageable.
/// Prefixed names are expanded to full URIs through the `PREFIX`
/// declarations seen so far.
pub struct CompactReader;

impl GrammarEngine for CompactReader {
    fn parse(&self, text: &str) -> (Option<Schema>, Vec<ParseDiagnostic>) {
        let mut prefixes = NamespaceTable::new();
        let mut start: Option<String> = None;
        let mut shapes: Vec<ShapeDecl> = Vec::new();
        // id, opening line, constraints collected so far
        let mut current: Option<(String, usize, Vec<TripleConstraint>)> = None;
        let mut diagnostics = Vec::new();

        for (idx, raw) in text.split('\n').enumerate() {
            let lineno = idx + 1;
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            if let Some((id, opened_at, mut constraints)) = current.take() {
                if line == "}" {
                    shapes.push(ShapeDecl {
                        id,
                        expression: Some(ShapeExpression {
                            expressions: Some(constraints),
                        }),
                    });
                } else {
                    match parse_constraint(line, &prefixes) {
                        Ok(tc) => constraints.push(tc),
                        Err(message) => diagnostics.push(ParseDiagnostic { message, line: lineno }),
                    }
                    current = Some((id, opened_at, constraints));
                }
                continue;
            }

            if parse_base_line(line).is_some() {
                // Captured separately by the converter's base scan.
                continue;
            }
            if let Some((prefix, uri)) = parse_prefix_line(line) {
                prefixes.bind(prefix, uri);
                continue;
            }
            if let Some(caps) = start_pattern().captures(line) {
                start = Some(parse_name(caps[1].trim(), &prefixes));
                continue;
            }
            if let Some(head) = line.strip_suffix('{') {
                let head = head.trim();
                if !head.is_empty() {
                    current = Some((parse_name(head, &prefixes), lineno, Vec::new()));
                    continue;
                }
            }
            diagnostics.push(ParseDiagnostic {
                message: format!("unrecognized line '{}'", line),
                line: lineno,
            });
        }

        if let Some((id, opened_at, _)) = current {
            diagnostics.push(ParseDiagnostic {
                message: format!("unterminated shape '{}'", id),
                line: opened_at,
            });
        }
        if !diagnostics.is_empty() || shapes.is_empty() {
            return (None, diagnostics);
        }

        let start = match start {
            Some(start) => start,
            None => {
                let fallback = shapes[0].id.clone();
                warn!(
                    "no start declaration, falling back to first shape '{}'",
                    fallback
                );
                fallback
            }
        };
        (Some(Schema { start, shapes }), Vec::new())
    }
}

/// Cuts a `#` comment off a line. A `#` inside `<...>` or `[...]` is part
/// of an IRI or value set, not a comment.
fn strip_comment(line: &str) -> &str {
    let mut angle = 0usize;
    let mut bracket = 0usize;
    for (pos, c) in line.char_indices() {
        match c {
            '<' => angle += 1,
            '>' => angle = angle.saturating_sub(1),
            '[' => bracket += 1,
            ']' => bracket = bracket.saturating_sub(1),
            '#' if angle == 0 && bracket == 0 => return &line[..pos],
            _ => {}
        }
    }
    line
}

/// Resolves a name token: `<...>`-delimited identifiers are unwrapped,
/// prefixed names are expanded when the prefix is bound, anything else is
/// kept verbatim.
fn parse_name(token: &str, prefixes: &NamespaceTable) -> String {
    if let Some(inner) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        inner.to_string()
    } else if let Some(uri) = prefixes.expand(token) {
        uri
    } else {
        token.to_string()
    }
}

fn parse_constraint(line: &str, prefixes: &NamespaceTable) -> Result<TripleConstraint, String> {
    let line = line.strip_suffix(';').unwrap_or(line).trim_end();
    let tokens = tokenize(line)?;
    let mut tokens = tokens.as_slice();

    let predicate = match tokens.first() {
        Some(token) if token == "a" => RDF_TYPE.to_string(),
        Some(token) => parse_name(token, prefixes),
        None => return Err("empty constraint".to_string()),
    };
    tokens = &tokens[1..];

    let mut value_expr = None;
    if let Some(token) = tokens.first() {
        if !is_cardinality(token) {
            value_expr = parse_value_expr(token, prefixes)?;
            tokens = &tokens[1..];
        }
    }

    let (mut min, mut max) = (None, None);
    if let Some(token) = tokens.first() {
        let (m, x) = parse_cardinality(token)?;
        min = Some(m);
        max = Some(x);
        tokens = &tokens[1..];
    }

    if !tokens.is_empty() {
        return Err(format!("trailing tokens {:?} in constraint", tokens));
    }
    Ok(TripleConstraint {
        predicate: Some(predicate),
        value_expr,
        min,
        max,
    })
}

fn parse_value_expr(
    token: &str,
    prefixes: &NamespaceTable,
) -> Result<Option<ValueExpr>, String> {
    if token == "." {
        return Ok(None);
    }
    if let Some(reference) = token.strip_prefix('@') {
        return Ok(Some(ValueExpr::Ref(parse_name(reference, prefixes))));
    }
    if let Some(kind) = NodeKind::from_keyword(token) {
        return Ok(Some(ValueExpr::Node(NodeConstraint::kind(kind))));
    }
    if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let values = inner
            .split_whitespace()
            .map(|v| parse_name(v, prefixes))
            .collect();
        return Ok(Some(ValueExpr::Node(NodeConstraint::value_set(values))));
    }
    if token.starts_with('<') || token.contains(':') {
        return Ok(Some(ValueExpr::Node(NodeConstraint::datatype(parse_name(
            token, prefixes,
        )))));
    }
    Err(format!("unrecognized value expression '{}'", token))
}

fn is_cardinality(token: &str) -> bool {
    matches!(token, "*" | "+" | "?") || token.starts_with('{')
}

fn parse_cardinality(token: &str) -> Result<(i64, i64), String> {
    match token {
        "*" => return Ok((0, UNBOUNDED)),
        "+" => return Ok((1, UNBOUNDED)),
        "?" => return Ok((0, 1)),
        _ => {}
    }
    let caps = braces_pattern()
        .captures(token)
        .ok_or_else(|| format!("unrecognized cardinality '{}'", token))?;
    let min: i64 = caps[1].parse().map_err(|_| format!("bad minimum in '{}'", token))?;
    let max = match (caps.get(2), caps.get(3)) {
        (None, _) => min,
        (Some(_), None) => UNBOUNDED,
        (Some(_), Some(m)) => m
            .as_str()
            .parse()
            .map_err(|_| format!("bad maximum in '{}'", token))?,
    };
    Ok((min, max))
}

/// Splits a constraint line into tokens, keeping `[...]` value sets whole.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let mut token = String::new();
        if chars[i] == '[' {
            while i < chars.len() && chars[i] != ']' {
                token.push(chars[i]);
                i += 1;
            }
            if i == chars.len() {
                return Err("unterminated value set".to_string());
            }
            token.push(']');
            i += 1;
        } else {
            while i < chars.len() && !chars[i].is_whitespace() {
                token.push(chars[i]);
                i += 1;
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (Option<Schema>, Vec<ParseDiagnostic>) {
        CompactReader.parse(text)
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
    fn parses_the_minimal_profile() {
        let (schema, diagnostics) = parse(DOC);
        assert!(diagnostics.is_empty());
        let schema = schema.unwrap();
        assert_eq!(schema.start, "Human");
        assert_eq!(schema.shapes.len(), 2);

        let human = schema.resolve("Human").unwrap();
        let constraints = human
            .expression
            .as_ref()
            .unwrap()
            .expressions
            .as_ref()
            .unwrap();
        assert_eq!(constraints.len(), 4);

        assert_eq!(constraints[0].predicate.as_deref(), Some(RDF_TYPE));
        assert_eq!(
            constraints[0].value_expr,
            Some(ValueExpr::Node(NodeConstraint::value_set(vec![
                "http://www.wikidata.org/entity/Q5".to_string()
            ])))
        );
        assert_eq!(
            constraints[1].value_expr,
            Some(ValueExpr::Ref("Place".to_string()))
        );
        assert_eq!(
            constraints[2].value_expr,
            Some(ValueExpr::Node(NodeConstraint::datatype(
                "http://www.w3.org/2001/XMLSchema#dateTime"
            )))
        );
        assert_eq!(constraints[2].cardinality(), (0, 1));
        assert_eq!(constraints[3].cardinality(), (0, UNBOUNDED));

        let place = schema.resolve("Place").unwrap();
        let constraints = place
            .expression
            .as_ref()
            .unwrap()
            .expressions
            .as_ref()
            .unwrap();
        assert_eq!(constraints[0].value_expr, None);
        assert_eq!(constraints[0].cardinality(), (1, 2));
    }

    #[test]
    fn unrecognized_lines_fail_the_parse_with_line_numbers() {
        let (schema, diagnostics) = parse("<S> {\n  wdt:P31 [wd:Q5]\n}\nnot shex at all");
        assert!(schema.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 4);
    }

    #[test]
    fn unterminated_shape_reports_its_opening_line() {
        let (schema, diagnostics) = parse("\n<S> {\n  wdt:P31 .");
        assert!(schema.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 2);
        assert!(diagnostics[0].message.contains("unterminated"));
    }

    #[test]
    fn missing_start_falls_back_to_first_shape() {
        let (schema, diagnostics) = parse("<Only> {\n}");
        assert!(diagnostics.is_empty());
        assert_eq!(schema.unwrap().start, "Only");
    }

    #[test]
    fn empty_input_yields_neither_schema_nor_diagnostics() {
        let (schema, diagnostics) = parse("\n\n");
        assert!(schema.is_none());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn comments_and_iri_fragments_are_distinguished() {
        let (schema, diagnostics) =
            parse("<S> {\n  <http://example.org/vocab#p> . + # trailing note\n}");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let schema = schema.unwrap();
        let constraints = schema.shapes[0]
            .expression
            .as_ref()
            .unwrap()
            .expressions
            .as_ref()
            .unwrap();
        assert_eq!(
            constraints[0].predicate.as_deref(),
            Some("http://example.org/vocab#p")
        );
        assert_eq!(constraints[0].cardinality(), (1, UNBOUNDED));
    }
}
