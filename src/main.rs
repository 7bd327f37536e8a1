// Loanbook matching CLI
// `match` runs the matching engine over two CSV files; `prioritize` collapses
// a previously exported match result. The manual-review round-trip is:
// export the match output, hand-edit it, re-supply it with --overwrite.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};

use loanbook_match::{
    match_name, Frame, JoinId, MatchOptions, MatchOutcome, OverwriteRule, Priority,
    SectorClassification, SectorLookup, SimilarityMethod,
};

#[derive(Serialize)]
struct RunReport {
    command: String,
    input_rows: usize,
    output_rows: usize,
    perfect_rows: usize,
    warnings: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("match") => run_match(&args[1..]),
        Some("prioritize") => run_prioritize(&args[1..]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("loanbook-match {}", loanbook_match::VERSION);
    println!();
    println!("USAGE:");
    println!("  loanbook-match match <loanbook.csv> <abcd.csv> [out.csv] [flags]");
    println!("      --min-score <0..1>        minimum fuzzy score (default 0.8)");
    println!("      --method <name>           jaro_winkler | jaro | levenshtein |");
    println!("                                damerau_levenshtein | sorensen_dice");
    println!("      --no-sector               score across sectors");
    println!("      --join-id <col[=abcd]>    explicit identifier join");
    println!("      --overwrite <rules.csv>   manual correction table");
    println!("      --sector-table <csv>      replace the bundled classification table");
    println!("      --allow-reserved          permit reserved columns on the loanbook");
    println!("      --report <out.json>       write a JSON run report");
    println!();
    println!("  loanbook-match prioritize <matched.csv> [out.csv] [flags]");
    println!("      --priority <l1,l2,...>    explicit level priority");
    println!("      --report <out.json>       write a JSON run report");
}

fn run_match(args: &[String]) -> Result<()> {
    let mut positional: Vec<&str> = Vec::new();
    let mut options = MatchOptions::default();
    let mut report_path: Option<PathBuf> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--min-score" => {
                let value = expect_value(&mut iter, "--min-score")?;
                options.min_score = value
                    .parse()
                    .with_context(|| format!("Invalid --min-score: {}", value))?;
            }
            "--method" => {
                options.method = parse_method(&expect_value(&mut iter, "--method")?)?;
            }
            "--no-sector" => options.by_sector = false,
            "--allow-reserved" => options.allow_reserved_columns = true,
            "--join-id" => {
                let value = expect_value(&mut iter, "--join-id")?;
                options.join_id = Some(match value.split_once('=') {
                    Some((loanbook, abcd)) => JoinId::pair(loanbook, abcd),
                    None => JoinId::same(&value),
                });
            }
            "--overwrite" => {
                let path = PathBuf::from(expect_value(&mut iter, "--overwrite")?);
                options.overwrite = Some(load_overwrite_rules(&path)?);
            }
            "--sector-table" => {
                let path = PathBuf::from(expect_value(&mut iter, "--sector-table")?);
                options.sector_lookup = Some(load_sector_table(&path)?);
            }
            "--report" => report_path = Some(PathBuf::from(expect_value(&mut iter, "--report")?)),
            other if other.starts_with("--") => bail!("Unknown flag: {}", other),
            other => positional.push(other),
        }
    }

    let [loanbook_path, abcd_path, rest @ ..] = positional.as_slice() else {
        bail!("match needs a loanbook CSV and an ABCD CSV; see --help");
    };
    let out_path = rest.first().copied();

    println!("🔗 Loanbook Matching");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading inputs...");
    let loanbook = Frame::from_csv_path(Path::new(loanbook_path))?;
    let abcd = Frame::from_csv_path(Path::new(abcd_path))?;
    println!("✓ Loaded {} loans, {} ABCD rows", loanbook.len(), abcd.len());

    println!("\n🔍 Matching ({} method)...", options.method.name());
    let outcome = match_name(&loanbook, &abcd, &options)?;
    let perfect = outcome.rows.iter().filter(|r| r.score == 1.0).count();
    println!(
        "✓ {} match row(s), {} with score = 1",
        outcome.rows.len(),
        perfect
    );
    print_warnings(&outcome);

    if let Some(out) = out_path {
        outcome.to_frame().write_csv_path(Path::new(out))?;
        println!("\n💾 Wrote {}", out);
    }
    write_report(&report_path, "match", loanbook.len(), &outcome)?;

    Ok(())
}

fn run_prioritize(args: &[String]) -> Result<()> {
    let mut positional: Vec<&str> = Vec::new();
    let mut priority = Priority::Default;
    let mut report_path: Option<PathBuf> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--priority" => {
                let value = expect_value(&mut iter, "--priority")?;
                priority =
                    Priority::Explicit(value.split(',').map(|l| l.trim().to_string()).collect());
            }
            "--report" => report_path = Some(PathBuf::from(expect_value(&mut iter, "--report")?)),
            other if other.starts_with("--") => bail!("Unknown flag: {}", other),
            other => positional.push(other),
        }
    }

    let [matched_path, rest @ ..] = positional.as_slice() else {
        bail!("prioritize needs a matched CSV; see --help");
    };
    let out_path = rest.first().copied();

    println!("🏅 Loanbook Match Prioritization");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading matched rows...");
    let frame = Frame::from_csv_path(Path::new(matched_path))?;
    let outcome = MatchOutcome::from_frame(&frame)?;
    println!("✓ Loaded {} match row(s)", outcome.rows.len());

    let collapsed = loanbook_match::prioritize(&outcome, &priority)?;
    println!("\n✓ Collapsed to {} row(s)", collapsed.rows.len());
    print_warnings(&collapsed);

    if let Some(out) = out_path {
        collapsed.to_frame().write_csv_path(Path::new(out))?;
        println!("\n💾 Wrote {}", out);
    }
    write_report(&report_path, "prioritize", outcome.rows.len(), &collapsed)?;

    Ok(())
}

fn expect_value(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> Result<String> {
    match iter.next() {
        Some(value) => Ok(value.clone()),
        None => bail!("{} needs a value", flag),
    }
}

fn parse_method(name: &str) -> Result<SimilarityMethod> {
    let method = match name {
        "jaro_winkler" => SimilarityMethod::default(),
        "jaro" => SimilarityMethod::Jaro,
        "levenshtein" => SimilarityMethod::Levenshtein,
        "damerau_levenshtein" => SimilarityMethod::DamerauLevenshtein,
        "sorensen_dice" => SimilarityMethod::SorensenDice,
        other => bail!("Unknown similarity method: {}", other),
    };
    Ok(method)
}

/// Loads a correction table. When the file is a hand-edited match export,
/// only the rows whose score was set to 1 are taken as rules.
fn load_overwrite_rules(path: &Path) -> Result<Vec<OverwriteRule>> {
    let frame = Frame::from_csv_path(path)?;

    let filtered = if let Some(score_col) = frame.column_index("score") {
        let mut kept = Frame::new(frame.columns().to_vec());
        for i in 0..frame.len() {
            let score = frame.row(i)[score_col]
                .as_deref()
                .and_then(|s| s.parse::<f64>().ok());
            if score == Some(1.0) {
                kept.push_row(frame.row(i).to_vec());
            }
        }
        kept
    } else {
        frame
    };

    Ok(OverwriteRule::from_frame(&filtered)?)
}

fn load_sector_table(path: &Path) -> Result<SectorLookup> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open sector table: {}", path.display()))?;
    let classifications: Vec<SectorClassification> = rdr
        .deserialize()
        .collect::<Result<_, _>>()
        .with_context(|| format!("Failed to parse sector table: {}", path.display()))?;
    Ok(SectorLookup::from_classifications(classifications))
}

fn print_warnings(outcome: &MatchOutcome) {
    for warning in &outcome.warnings {
        println!("⚠️  {}", warning);
    }
}

fn write_report(
    path: &Option<PathBuf>,
    command: &str,
    input_rows: usize,
    outcome: &MatchOutcome,
) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let report = RunReport {
        command: command.to_string(),
        input_rows,
        output_rows: outcome.rows.len(),
        perfect_rows: outcome.rows.iter().filter(|r| r.score == 1.0).count(),
        warnings: outcome.warnings.iter().map(|w| w.to_string()).collect(),
    };
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    println!("📊 Wrote report {}", path.display());

    Ok(())
}
