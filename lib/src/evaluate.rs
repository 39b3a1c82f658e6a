use crate::convert::{shexc_to_shexj, GrammarEngine};
use crate::distance::{canonical_tree_edit_distance, normalized_tree_edit_distance};
use crate::error::EmptyEvaluation;
use crate::tree::{build_shape_tree, ShapeNode};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// One class to score: its URI and its human label.
#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub url: String,
    pub label: String,
}

/// Per-class comparison outcome.
#[derive(Debug)]
pub struct ClassResult {
    pub class_id: String,
    pub shape_id: String,
    pub ted: usize,
    /// Ground-truth tree size (nodes below the root).
    pub tree_size: usize,
    pub normalized_ted: f64,
}

/// Aggregated batch outcome.
#[derive(Debug)]
pub struct EvalSummary {
    pub results: Vec<ClassResult>,
    pub skipped: usize,
    pub mean_ted: f64,
    pub mean_normalized_ted: f64,
}

/// Batch evaluator: compares ground-truth against predicted schemas class
/// by class, strictly sequentially.
///
/// Every per-class failure — missing file, unreadable file, terminal parse
/// failure, empty ground-truth tree — is isolated: the class is skipped
/// with a warning and excluded from aggregation, and the batch carries on.
pub struct Evaluator<'a, E> {
    engine: &'a E,
    dataset: String,
    ground_truth_dir: PathBuf,
    predicted_dir: PathBuf,
}

impl<'a, E: GrammarEngine> Evaluator<'a, E> {
    pub fn new(
        engine: &'a E,
        dataset: impl Into<String>,
        ground_truth_dir: impl Into<PathBuf>,
        predicted_dir: impl Into<PathBuf>,
    ) -> Self {
        Evaluator {
            engine,
            dataset: dataset.into(),
            ground_truth_dir: ground_truth_dir.into(),
            predicted_dir: predicted_dir.into(),
        }
    }

    /// Runs the batch and aggregates mean raw and mean normalized tree edit
    /// distance over the successfully compared classes.
    pub fn run(&self, classes: &[ClassEntry]) -> Result<EvalSummary, EmptyEvaluation> {
        let mut results = Vec::new();
        let mut skipped = 0usize;
        for entry in classes {
            match self.evaluate_class(entry) {
                Some(result) => results.push(result),
                None => skipped += 1,
            }
        }
        if results.is_empty() {
            return Err(EmptyEvaluation { skipped });
        }

        let count = results.len() as f64;
        let mean_ted = results.iter().map(|r| r.ted as f64).sum::<f64>() / count;
        let mean_normalized_ted =
            results.iter().map(|r| r.normalized_ted).sum::<f64>() / count;
        info!("average ted (over {} schemas): {:.3}", results.len(), mean_ted);
        info!(
            "normalized average ted (over {} schemas): {:.3}",
            results.len(),
            mean_normalized_ted
        );
        Ok(EvalSummary {
            results,
            skipped,
            mean_ted,
            mean_normalized_ted,
        })
    }

    fn evaluate_class(&self, entry: &ClassEntry) -> Option<ClassResult> {
        let class_id = class_id_of(&entry.url).to_string();
        let shape_id = shape_id_for(&self.dataset, &entry.label);
        info!("evaluating shape '{}' in class '{}'", shape_id, class_id);

        let predicted_path = self.predicted_dir.join(format!("{}.shex", class_id));
        if !predicted_path.exists() {
            warn!(
                "file '{}' does not exist, skipping class '{}'",
                predicted_path.display(),
                class_id
            );
            return None;
        }

        let truth_path = self.ground_truth_dir.join(format!("{}.shex", class_id));
        let mut truth = self.load_tree(&truth_path, &shape_id)?;
        let mut predicted = self.load_tree(&predicted_path, &shape_id)?;

        let tree_size = truth.size();
        let ted = canonical_tree_edit_distance(&mut truth, &mut predicted);
        let normalized_ted = match normalized_tree_edit_distance(ted, &truth) {
            Some(normalized) => normalized,
            None => {
                warn!("skipping class '{}'", class_id);
                return None;
            }
        };
        info!(
            "class: {} | ted: {} | ground truth tree size: {} | normalized ted: {:.3}",
            class_id, ted, tree_size, normalized_ted
        );
        Some(ClassResult {
            class_id,
            shape_id,
            ted,
            tree_size,
            normalized_ted,
        })
    }

    fn load_tree(&self, path: &Path, shape_id: &str) -> Option<ShapeNode> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!("failed to read '{}': {}", path.display(), err);
                return None;
            }
        };
        match shexc_to_shexj(self.engine, &text) {
            Ok(conversion) => Some(build_shape_tree(&conversion.schema, shape_id)),
            Err(err) => {
                warn!("failed to convert '{}': {}", path.display(), err);
                None
            }
        }
    }
}

fn class_id_of(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Dataset-specific naming convention for the shape to compare: the `wes`
/// dataset joins the capitalized words of the label, everything else uses
/// the label verbatim.
fn shape_id_for(dataset: &str, label: &str) -> String {
    if dataset == "wes" {
        label.split_whitespace().map(capitalize).collect()
    } else {
        label.to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
