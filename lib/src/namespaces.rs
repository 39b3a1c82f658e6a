use log::warn;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// IRI of `rdf:type`, written `a` in the compact syntax.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

fn base_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i:base)\s+<(.+)>$").unwrap())
}

fn prefix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i:prefix)\s+([A-Za-z][\w.-]*)?:\s*<([^>]*)>").unwrap())
}

/// An insertion-ordered prefix-to-namespace mapping.
///
/// There is no process-wide default binding: the table is an explicit value
/// handed to the serializer at call time. [`NamespaceTable::well_known`]
/// supplies the fallback table used when a caller has none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTable {
    entries: Vec<(String, String)>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        NamespaceTable::default()
    }

    /// The default table used by the serializer when no namespaces are
    /// supplied: the RDF core vocabularies plus the Wikidata prefixes the
    /// evaluation datasets use.
    pub fn well_known() -> Self {
        let mut table = NamespaceTable::new();
        for (prefix, uri) in [
            ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
            ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
            ("xsd", "http://www.w3.org/2001/XMLSchema#"),
            ("foaf", "http://xmlns.com/foaf/0.1/"),
            ("schema", "http://schema.org/"),
            ("skos", "http://www.w3.org/2004/02/skos/core#"),
            ("wd", "http://www.wikidata.org/entity/"),
            ("wdt", "http://www.wikidata.org/prop/direct/"),
            ("p", "http://www.wikidata.org/prop/"),
            ("ps", "http://www.wikidata.org/prop/statement/"),
            ("pq", "http://www.wikidata.org/prop/qualifier/"),
        ] {
            table.bind(prefix, uri);
        }
        table
    }

    /// Binds `prefix` to `uri`, replacing any existing binding for the
    /// prefix. Invalid URIs are kept verbatim but reported.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        if Url::parse(uri).is_err() {
            warn!("namespace '{}' bound to invalid URI '{}'", prefix, uri);
        }
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| p == prefix) {
            entry.1 = uri.to_string();
        } else {
            self.entries.push((prefix.to_string(), uri.to_string()));
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Expands a `prefix:local` name to a full URI, if the prefix is bound.
    pub fn expand(&self, qname: &str) -> Option<String> {
        let (prefix, local) = qname.split_once(':')?;
        Some(format!("{}{}", self.get(prefix)?, local))
    }

    /// Compacts a full URI to a `prefix:local` name using the longest
    /// matching namespace, if the remainder forms a plausible local name.
    pub fn compact(&self, uri: &str) -> Option<String> {
        self.entries
            .iter()
            .filter_map(|(prefix, ns)| {
                let local = uri.strip_prefix(ns.as_str())?;
                if local.is_empty() || local.contains(['/', '#', ':']) {
                    return None;
                }
                Some((ns.len(), format!("{}:{}", prefix, local)))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, qname)| qname)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Parses a single `BASE <uri>` line.
pub(crate) fn parse_base_line(line: &str) -> Option<&str> {
    base_pattern()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parses a single `PREFIX p: <uri>` line into its prefix/URI pair.
pub(crate) fn parse_prefix_line(line: &str) -> Option<(&str, &str)> {
    prefix_pattern().captures(line).map(|caps| {
        let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let uri = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        (prefix, uri)
    })
}

/// Extracts the base URI declared in a compact-syntax document, if any.
pub fn scan_base(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| parse_base_line(line).map(str::to_string))
}

/// Collects the prefix declarations of a compact-syntax document into a
/// namespace table, in document order.
pub fn scan_prefixes(text: &str) -> NamespaceTable {
    let mut table = NamespaceTable::new();
    for line in text.lines() {
        if let Some((prefix, uri)) = parse_prefix_line(line) {
            table.bind(prefix, uri);
        }
    }
    table
}
