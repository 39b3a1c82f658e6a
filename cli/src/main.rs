use clap::Parser;
use graphviz_rust::cmd::{CommandArg, Format};
use graphviz_rust::exec_dot;
use shexdiff::distance::{
    graph_edit_distance, normalized_tree_edit_distance, tree_edit_distance, DEFAULT_GED_TIMEOUT,
};
use shexdiff::evaluate::{ClassEntry, Evaluator};
use shexdiff::graph::SchemaGraph;
use shexdiff::schema::Schema;
use shexdiff::tree::{build_shape_tree, canonicalize_pair};
use shexdiff::{CompactReader, CompactWriter, Conversion, Converter};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct ConvertArgs {
    /// Path to the compact-syntax schema file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,
}

#[derive(Parser)]
struct RenderArgs {
    /// Path to the structured (JSON) schema file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Base URI to declare in the output
    #[arg(long, value_name = "URI")]
    base: Option<String>,

    /// Compact-syntax file whose prefix declarations and comments are
    /// carried into the output
    #[arg(long, value_name = "FILE")]
    prefixes_from: Option<PathBuf>,
}

#[derive(Parser)]
struct RoundtripArgs {
    /// Path to the compact-syntax schema file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,
}

#[derive(Parser)]
struct GraphvizArgs {
    /// Path to the compact-syntax schema file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,
}

#[derive(Parser)]
struct PdfArgs {
    /// Path to the compact-syntax schema file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Path to the output PDF file
    #[arg(short, long, value_name = "FILE")]
    output_file: PathBuf,
}

#[derive(Parser)]
struct CompareArgs {
    /// Path to the ground-truth schema file
    #[arg(short, long, value_name = "FILE")]
    truth: PathBuf,

    /// Path to the predicted schema file
    #[arg(short, long, value_name = "FILE")]
    predicted: PathBuf,

    /// Shape id to compare; falls back to the first declared shape
    #[arg(short, long, value_name = "ID")]
    shape: String,

    /// Also compute the (timeout-bounded) graph edit distance
    #[arg(long)]
    graph: bool,

    /// Wall-clock budget for the graph edit distance search, in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Parser)]
struct EvaluateArgs {
    /// Dataset name; `wes` selects its label-to-shape-id convention
    #[arg(short, long, value_name = "NAME")]
    dataset: String,

    /// File of classes to evaluate, one `url<TAB|,>label` per line
    #[arg(short, long, value_name = "FILE")]
    classes: PathBuf,

    /// Directory of ground-truth `<class>.shex` files
    #[arg(long, value_name = "DIR")]
    ground_truth_dir: PathBuf,

    /// Directory of predicted `<class>.shex` files
    #[arg(long, value_name = "DIR")]
    predicted_dir: PathBuf,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Convert a compact-syntax schema to its structured JSON form
    Convert(ConvertArgs),
    /// Render a structured JSON schema back to compact syntax
    Render(RenderArgs),
    /// Parse a compact-syntax schema and serialize it again, comments included
    Roundtrip(RoundtripArgs),
    /// Output the Graphviz DOT string of the schema graph
    Graphviz(GraphvizArgs),
    /// Generate a PDF of the schema graph using Graphviz
    Pdf(PdfArgs),
    /// Compare two schema files by tree (and optionally graph) edit distance
    Compare(CompareArgs),
    /// Evaluate predicted schemas against ground truth over a batch of classes
    Evaluate(EvaluateArgs),
}

fn load_conversion(path: &Path) -> Result<Conversion, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {}", path.display(), e))?;
    Converter::minimal()
        .forward(&text)
        .map_err(|e| format!("Error converting {}: {}", path.display(), e).into())
}

fn render_dot(dot_string: String, output_file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let output_file_path_str = output_file.to_str().ok_or("Invalid output file path")?;

    let cmd_args = vec![
        CommandArg::Format(Format::Pdf),
        CommandArg::Output(output_file_path_str.to_string()),
    ];

    exec_dot(dot_string, cmd_args).map_err(|e| format!("Graphviz execution error: {}", e))?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert(args) => {
            let conversion = load_conversion(&args.input)?;
            println!("{}", conversion.schema.to_json_pretty()?);
        }
        Commands::Render(args) => {
            let json = std::fs::read_to_string(&args.input)?;
            let schema = Schema::from_json(&json)?;
            let (namespaces, comments) = match &args.prefixes_from {
                Some(path) => {
                    let source = std::fs::read_to_string(path)?;
                    (
                        Some(shexdiff::namespaces::scan_prefixes(&source)),
                        shexdiff::comments::extract_comments(&source),
                    )
                }
                None => (None, Vec::new()),
            };
            let text = shexdiff::convert::shexj_to_shexc(
                &CompactWriter,
                &schema,
                args.base.as_deref(),
                namespaces.as_ref(),
                &comments,
            );
            println!("{}", text);
        }
        Commands::Roundtrip(args) => {
            let text = std::fs::read_to_string(&args.input)?;
            let restored = Converter::minimal().roundtrip(&text)?;
            println!("{}", restored);
        }
        Commands::Graphviz(args) => {
            let conversion = load_conversion(&args.input)?;
            let dot_string = SchemaGraph::build(&conversion.schema).to_graphviz();
            println!("{}", dot_string);
        }
        Commands::Pdf(args) => {
            let conversion = load_conversion(&args.input)?;
            let dot_string = SchemaGraph::build(&conversion.schema).to_graphviz();
            render_dot(dot_string, &args.output_file)?;
            println!("PDF generated at: {}", args.output_file.display());
        }
        Commands::Compare(args) => {
            let truth = load_conversion(&args.truth)?;
            let predicted = load_conversion(&args.predicted)?;

            let mut truth_tree = build_shape_tree(&truth.schema, &args.shape);
            let mut predicted_tree = build_shape_tree(&predicted.schema, &args.shape);
            canonicalize_pair(&mut truth_tree, &mut predicted_tree);
            let ted = tree_edit_distance(&truth_tree, &predicted_tree);
            println!("tree edit distance: {}", ted);
            println!("ground truth tree size: {}", truth_tree.size());
            match normalized_tree_edit_distance(ted, &truth_tree) {
                Some(normalized) => println!("normalized tree edit distance: {:.3}", normalized),
                None => println!("normalized tree edit distance: undefined (empty tree)"),
            }

            if args.graph {
                let truth_graph = SchemaGraph::build(&truth.schema);
                let predicted_graph = SchemaGraph::build(&predicted.schema);
                let timeout = args
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_GED_TIMEOUT);
                let outcome = graph_edit_distance(
                    truth_graph.graph(),
                    predicted_graph.graph(),
                    Some((truth_graph.root(), predicted_graph.root())),
                    timeout,
                );
                match outcome.distance {
                    Some(distance) if outcome.exact => {
                        println!("graph edit distance: {}", distance)
                    }
                    Some(distance) => {
                        println!("graph edit distance: {} (timed out, best effort)", distance)
                    }
                    None => println!("graph edit distance: unknown (timed out)"),
                }
            }
        }
        Commands::Evaluate(args) => {
            let listing = std::fs::read_to_string(&args.classes)?;
            let classes: Vec<ClassEntry> = listing
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| {
                    let (url, label) = line
                        .split_once('\t')
                        .or_else(|| line.split_once(','))
                        .ok_or_else(|| format!("Malformed class line: '{}'", line))?;
                    Ok(ClassEntry {
                        url: url.trim().to_string(),
                        label: label.trim().to_string(),
                    })
                })
                .collect::<Result<_, String>>()?;

            let engine = CompactReader;
            let evaluator = Evaluator::new(
                &engine,
                &args.dataset,
                &args.ground_truth_dir,
                &args.predicted_dir,
            );
            let summary = evaluator.run(&classes)?;
            println!(
                "compared {} classes ({} skipped)",
                summary.results.len(),
                summary.skipped
            );
            println!("mean tree edit distance: {:.3}", summary.mean_ted);
            println!(
                "mean normalized tree edit distance: {:.3}",
                summary.mean_normalized_ted
            );
        }
    }
    Ok(())
}
