//! Round-tripping and structural comparison of RDF shape schemas.
//!
//! The library converts between the compact textual schema syntax and its
//! structured JSON form with line-level error recovery and comment
//! preservation, and measures structural similarity between two schemas via
//! canonicalized tree and graph representations and edit distances.
#![deny(clippy::all)]

pub mod comments;
pub mod convert;
pub mod distance;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod namespaces;
pub mod schema;
pub mod syntax;
pub mod tree;

pub use convert::{Conversion, GrammarEngine, ParseDiagnostic, SchemaWriter};
pub use error::{ConvertError, EmptyEvaluation};
pub use syntax::{CompactReader, CompactWriter};

/// A simple facade over the conversion pipeline.
///
/// Bundles a grammar engine and a serializer so callers round-tripping
/// documents do not have to thread the collaborators through every call.
/// For finer control use the [`convert`] module directly.
pub struct Converter<E, W> {
    engine: E,
    writer: W,
}

impl Converter<CompactReader, CompactWriter> {
    /// A converter backed by the bundled minimal-profile syntax engine.
    pub fn minimal() -> Self {
        Converter {
            engine: CompactReader,
            writer: CompactWriter,
        }
    }
}

impl<E: GrammarEngine, W: SchemaWriter> Converter<E, W> {
    pub fn new(engine: E, writer: W) -> Self {
        Converter { engine, writer }
    }

    /// Compact syntax → structured schema, recovering once from a partial
    /// parse failure; also captures the document's base URI, namespace
    /// table, and comments.
    pub fn forward(&self, text: &str) -> Result<Conversion, ConvertError> {
        convert::shexc_to_shexj(&self.engine, text)
    }

    /// Structured schema → compact syntax, reinserting the comments carried
    /// by the conversion.
    pub fn backward(&self, conversion: &Conversion) -> String {
        convert::shexj_to_shexc(
            &self.writer,
            &conversion.schema,
            conversion.base.as_deref(),
            Some(&conversion.namespaces),
            &conversion.comments,
        )
    }

    /// Full text-to-text round trip.
    pub fn roundtrip(&self, text: &str) -> Result<String, ConvertError> {
        Ok(self.backward(&self.forward(text)?))
    }
}
