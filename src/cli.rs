use crate::adapters::corpus::loader::{self, LiteIndex};
use crate::adapters::response::records;
use crate::app::dto::{GroupSummary, Report};
use crate::app::engine::EvalEngine;
use crate::domain::edge::DepKind;
use crate::domain::query::QueryMode;
use crate::domain::score::EvaluationResult;
use anyhow::{Context as _, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::Path;

#[allow(clippy::too_many_arguments)]
pub fn run_evaluate(
    corpus: &Path,
    responses: &Path,
    task: Option<DepKind>,
    language: Option<&str>,
    mode: Option<QueryMode>,
    lite: Option<&Path>,
    out: Option<&Path>,
    csv: Option<&Path>,
) -> Result<()> {
    let store = loader::load(corpus).context("Failed to load corpus")?;
    println!("Loaded corpus: {} programs", store.len());

    let mut records = records::read_path(responses)?;
    if let Some(task) = task {
        records.retain(|r| r.task == task);
    }
    if let Some(language) = language {
        records.retain(|r| r.language == language);
    }
    if let Some(mode) = mode {
        records.retain(|r| r.mode == mode);
    }
    println!("Scoring {} response records", records.len());

    let lite = lite
        .map(LiteIndex::load)
        .transpose()
        .context("Failed to load lite subset file")?;

    let engine = EvalEngine::new(store);
    let evaluation = engine.evaluate(&records, lite.as_ref());

    if let Some(out_path) = out {
        write_results(out_path, &evaluation.results)?;
        println!(
            "Wrote {} result records to {}",
            evaluation.results.len(),
            out_path.display()
        );
    }
    if let Some(csv_path) = csv {
        fs::write(csv_path, evaluation.report.to_csv())
            .with_context(|| format!("Failed to write CSV report: {}", csv_path.display()))?;
        println!("Wrote CSV report to {}", csv_path.display());
    }

    print_report(&evaluation.report);
    Ok(())
}

fn write_results(path: &Path, results: &[EvaluationResult]) -> Result<()> {
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create result file: {}", path.display()))?;
    for result in results {
        serde_json::to_writer(&mut file, result)?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

pub fn run_inspect(corpus: &Path) -> Result<()> {
    let store = loader::load(corpus).context("Failed to load corpus")?;

    // language -> (programs, edges per kind)
    let mut by_language: BTreeMap<&str, (usize, BTreeMap<DepKind, usize>)> = BTreeMap::new();
    for (_, ann) in store.programs() {
        let entry = by_language.entry(ann.language.as_str()).or_default();
        entry.0 += 1;
        for (&kind, graph) in &ann.edges {
            *entry.1.entry(kind).or_default() += graph.edge_count();
        }
    }

    println!("Corpus: {} programs", store.len());
    println!("{}", "=".repeat(60));
    for (language, (programs, edges)) in &by_language {
        println!("\n  {language}: {programs} program(s)");
        for kind in DepKind::ALL {
            let count = edges.get(&kind).copied().unwrap_or(0);
            println!("    {kind:<10} {count:>6} edge(s)");
        }
    }
    Ok(())
}

fn print_report(report: &Report) {
    println!("\n{}", "=".repeat(96));
    println!(
        "{:<10} {:<10} {:<8} {:>6} {:>7} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "task", "language", "mode", "n", "fail", "prec", "recall", "f1", "acc", "chain"
    );
    println!("{}", "-".repeat(96));
    for row in &report.groups {
        println!(
            "{:<10} {:<10} {:<8} {}",
            row.key.task.to_string(),
            row.key.language,
            row.key.mode.to_string(),
            summary_line(&row.summary)
        );
    }
    println!("{}", "-".repeat(96));
    println!(
        "{:<10} {:<10} {:<8} {}",
        "overall", "all", "all",
        summary_line(&report.overall)
    );
    if report.unmatched_responses > 0 {
        println!(
            "\nWarning: {} response record(s) matched no query instance",
            report.unmatched_responses
        );
    }
}

fn summary_line(s: &GroupSummary) -> String {
    format!(
        "{:>6} {:>7} {:>8} {:>8} {:>8} {:>8} {:>8}",
        s.instances,
        metric(s.extraction_failure_rate),
        metric(s.precision),
        metric(s.recall),
        metric(s.f1),
        metric(s.accuracy),
        metric(s.chain_exact_rate)
    )
}

fn metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "-".to_string(),
    }
}
