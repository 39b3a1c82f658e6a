use shexdiff::evaluate::{ClassEntry, Evaluator};
use shexdiff::{CompactReader, ConvertError, Converter};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> Result<PathBuf, Box<dyn Error>> {
    let mut dir = std::env::temp_dir();
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    dir.push(format!("{}_{}", prefix, timestamp));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn write(path: &Path, content: &str) -> Result<(), Box<dyn Error>> {
    fs::write(path, content)?;
    Ok(())
}

const HUMAN: &str = "\
# induced from wikidata instances
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
PREFIX wd: <http://www.wikidata.org/entity/>

start = @<Human>

<Human> {
  wdt:P31 [wd:Q5] ;  # instance of
  wdt:P569 . ?
}";

const CITY_TRUTH: &str = "\
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
PREFIX wd: <http://www.wikidata.org/entity/>

start = @<City>

<City> {
  wdt:P31 [wd:Q515] *
}";

const CITY_PREDICTED: &str = "\
PREFIX wdt: <http://www.wikidata.org/prop/direct/>
PREFIX wd: <http://www.wikidata.org/entity/>

start = @<City>

<City> {
  wdt:P31 [wd:Q515]
}";

#[test]
fn file_round_trip_preserves_text_and_comments() -> Result<(), Box<dyn Error>> {
    let dir = unique_temp_dir("shexdiff_roundtrip")?;
    let path = dir.join("Q5.shex");
    write(&path, HUMAN)?;

    let text = fs::read_to_string(&path)?;
    let restored = Converter::minimal().roundtrip(&text)?;
    assert_eq!(restored, HUMAN);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn unrecoverable_input_fails_after_exactly_one_retry() -> Result<(), Box<dyn Error>> {
    let dir = unique_temp_dir("shexdiff_unrecoverable")?;
    let path = dir.join("broken.shex");
    // The opening line is the offending one; removing it strands the
    // constraint outside any shape, so the retry fails too.
    write(&path, "<S> {\n  wdt:P31 .")?;

    let text = fs::read_to_string(&path)?;
    let err = Converter::minimal().forward(&text).unwrap_err();
    assert!(matches!(err, ConvertError::UnrecoverableParse { lines } if lines == vec![1]));

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn batch_skips_missing_predictions_and_aggregates_the_rest() -> Result<(), Box<dyn Error>> {
    let dir = unique_temp_dir("shexdiff_batch")?;
    let truth_dir = dir.join("truth");
    let predicted_dir = dir.join("predicted");
    fs::create_dir_all(&truth_dir)?;
    fs::create_dir_all(&predicted_dir)?;

    write(&truth_dir.join("Q5.shex"), HUMAN)?;
    write(&predicted_dir.join("Q5.shex"), HUMAN)?;
    write(&truth_dir.join("Q515.shex"), CITY_TRUTH)?;
    write(&predicted_dir.join("Q515.shex"), CITY_PREDICTED)?;
    // Q8502 has ground truth but no prediction.
    write(&truth_dir.join("Q8502.shex"), HUMAN)?;

    let classes = vec![
        ClassEntry {
            url: "http://www.wikidata.org/entity/Q5".to_string(),
            label: "Human".to_string(),
        },
        ClassEntry {
            url: "http://www.wikidata.org/entity/Q515".to_string(),
            label: "City".to_string(),
        },
        ClassEntry {
            url: "http://www.wikidata.org/entity/Q8502".to_string(),
            label: "Mountain".to_string(),
        },
    ];

    let engine = CompactReader;
    let evaluator = Evaluator::new(&engine, "wikidata", &truth_dir, &predicted_dir);
    let summary = evaluator.run(&classes)?;

    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.skipped, 1);

    // Q5 compares equal; Q515 differs only in the cardinality leaf.
    assert_eq!(summary.results[0].ted, 0);
    assert_eq!(summary.results[1].ted, 1);
    assert_eq!(summary.results[1].tree_size, 3);
    assert!((summary.mean_ted - 0.5).abs() < 1e-12);
    assert!((summary.mean_normalized_ted - 1.0 / 18.0).abs() < 1e-12);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn empty_batch_is_an_error_not_a_panic() -> Result<(), Box<dyn Error>> {
    let dir = unique_temp_dir("shexdiff_empty_batch")?;
    let truth_dir = dir.join("truth");
    let predicted_dir = dir.join("predicted");
    fs::create_dir_all(&truth_dir)?;
    fs::create_dir_all(&predicted_dir)?;

    let classes = vec![ClassEntry {
        url: "http://www.wikidata.org/entity/Q5".to_string(),
        label: "Human".to_string(),
    }];

    let engine = CompactReader;
    let evaluator = Evaluator::new(&engine, "wikidata", &truth_dir, &predicted_dir);
    let err = evaluator.run(&classes).unwrap_err();
    assert_eq!(err.skipped, 1);

    fs::remove_dir_all(&dir)?;
    Ok(())
}
