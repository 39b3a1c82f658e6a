use thiserror::Error;

/// Fatal conversion failures.
///
/// Warning-grade conditions (structurally empty schemas, unresolved start
/// shapes, unmatched comment anchors, edit-distance timeouts, missing
/// predicted files) are reported through `log::warn!` and never surface as
/// error values; a parse failure is terminal for the single document being
/// converted but must not abort a batch.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The grammar engine reported neither a schema nor line diagnostics,
    /// so there is nothing to recover from.
    #[error("grammar engine produced neither a schema nor diagnostics")]
    ParseFailure,

    /// The retry on line-stripped input also failed to produce a schema.
    /// Exactly one retry is attempted.
    #[error("schema still unparsable after dropping lines {lines:?}")]
    UnrecoverableParse { lines: Vec<usize> },
}

/// Returned by the evaluator when not a single class in the batch could be
/// compared. Individual skips are warnings, not errors.
#[derive(Debug, Error)]
#[error("no classes could be compared ({skipped} skipped)")]
pub struct EmptyEvaluation {
    pub skipped: usize,
}
