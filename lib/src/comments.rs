use log::warn;

/// Where a comment sits relative to the schema body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// Header comment above the first shape-declaring line; reinserted as a
    /// line of its own above its anchor.
    General,
    /// Comment at or below the first shape-declaring line; full-line
    /// comments are reinserted above their anchor, inline comments are
    /// appended to it.
    Constraint,
}

/// One comment lifted out of a compact-syntax document.
///
/// `anchor` is the verbatim text of the line the comment re-attaches to
/// after serialization; `None` pins the comment to the start of the
/// document. Anchor matching is plain string equality against possibly
/// regenerated text, so a failed match is an expected outcome, not an
/// exceptional one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub text: String,
    pub kind: CommentKind,
    pub anchor: Option<String>,
}

/// Index of the first shape-declaring line: the first line opening with the
/// `start` keyword or a `<`-delimited identifier, 0 when neither occurs.
fn first_shape_line(lines: &[&str]) -> usize {
    lines
        .iter()
        .position(|line| line.starts_with("start") || line.starts_with('<'))
        .unwrap_or(0)
}

/// First non-blank line at or after `from`, verbatim.
fn next_nonblank(lines: &[&str], from: usize) -> Option<String> {
    lines[from..]
        .iter()
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}

/// Trailing space/semicolon run stripped, for anchor comparison on both the
/// extraction and reinsertion side.
fn strip_trailing(line: &str) -> &str {
    line.trim_end_matches([' ', '\t', ';'])
}

/// Scans a document and records every comment with its anchor, in document
/// order. Lines that carry no comment produce no record.
pub fn extract_comments(text: &str) -> Vec<CommentRecord> {
    let lines: Vec<&str> = text.split('\n').collect();
    let start = first_shape_line(&lines);
    let mut records = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let is_full_line = line.trim_start().starts_with('#');
        if idx < start {
            if is_full_line {
                records.push(CommentRecord {
                    text: line.to_string(),
                    kind: CommentKind::General,
                    anchor: next_nonblank(&lines, idx + 1),
                });
            }
        } else if is_full_line {
            records.push(CommentRecord {
                text: line.to_string(),
                kind: CommentKind::Constraint,
                anchor: next_nonblank(&lines, idx + 1),
            });
        } else if let Some(pos) = line.find('#') {
            let prefix = &line[..pos];
            let anchor = if prefix.trim().is_empty() {
                next_nonblank(&lines, idx + 1)
            } else {
                Some(strip_trailing(prefix).to_string())
            };
            records.push(CommentRecord {
                text: line[pos..].to_string(),
                kind: CommentKind::Constraint,
                anchor,
            });
        }
    }
    records
}

/// Reinserts extracted comments into regenerated text.
///
/// Records are processed in reverse document order so that insertions never
/// shift a not-yet-processed anchor. A record whose anchor no longer occurs
/// in the text is dropped with a warning.
pub fn reinsert_comments(text: &str, comments: &[CommentRecord]) -> String {
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();

    for record in comments.iter().rev() {
        let anchor = match &record.anchor {
            None => {
                lines.insert(0, record.text.clone());
                continue;
            }
            Some(anchor) => anchor,
        };
        let found = lines
            .iter()
            .position(|line| line == anchor || strip_trailing(line) == anchor.as_str());
        match found {
            Some(idx) => match record.kind {
                CommentKind::General => lines.insert(idx, record.text.clone()),
                CommentKind::Constraint => {
                    lines[idx] =
                        format!("{}  {}", lines[idx].trim_end(), record.text.trim_start());
                }
            },
            None => warn!(
                "comment anchor '{}' not found, dropping comment '{}'",
                anchor,
                record.text.trim()
            ),
        }
    }
    lines.join("\n")
}
