use crate::format::{
    format_duration, format_optional_date, format_score, render_value, truncate_text,
};
use crate::models::{RunData, RunIndex, RunMeta, Sample};
use crate::view::{AggregationView, display_name};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use std::path::Path;

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Samples of one dataset, as emitted in JSON mode
#[derive(Debug, Serialize)]
struct SamplesReport<'a> {
    run_id: &'a str,
    dataset: &'a str,
    total: usize,
    samples: &'a [Sample],
}

/// Print the run list
pub fn print_runs(index: &RunIndex, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print_plain(|out| render_runs(out, index)),
        OutputFormat::Json => print_json(index),
    }
}

/// Print the detail view of one run
pub fn print_run(run_id: &str, data: &RunData, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print_plain(|out| render_run(out, run_id, data)),
        OutputFormat::Json => print_json(data),
    }
}

/// Print the sample browser for one dataset; `truncate_at` of `None` shows full fields
pub fn print_samples(
    run_id: &str,
    meta: &RunMeta,
    dataset: &str,
    samples: &[Sample],
    truncate_at: Option<usize>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Plain => print_plain(|out| {
            render_samples(out, run_id, meta, dataset, samples, truncate_at)
        }),
        OutputFormat::Json => print_json(&SamplesReport {
            run_id,
            dataset,
            total: samples.len(),
            samples,
        }),
    }
}

/// Print setup instructions to stderr when the store has no index yet
pub fn print_setup_instructions(data_root: &Path) {
    let mut out = String::new();
    match render_setup_instructions(&mut out, data_root) {
        Ok(()) => eprint!("{}", out),
        Err(e) => eprintln!("Error formatting instructions: {}", e),
    }
}

pub fn render_setup_instructions(out: &mut impl Write, data_root: &Path) -> fmt::Result {
    let data_root = data_root.display();
    writeln!(out, "No Data Available")?;
    writeln!(out, "-----------------")?;
    writeln!(out, "No evaluation runs found in {data_root}.")?;
    writeln!(out, "Run the ETL step to generate data, for example:")?;
    writeln!(out)?;
    writeln!(out, "  python tools/etl/build_static_data.py \\")?;
    writeln!(out, "    --framework evalscope \\")?;
    writeln!(out, "    --raw-dir ./outputs \\")?;
    writeln!(out, "    --out-dir {data_root}")
}

/// Plain-text run list
pub fn render_runs(out: &mut impl Write, index: &RunIndex) -> fmt::Result {
    let count = index.runs.len();

    writeln!(out, "📋 EVALUATION RUNS")?;
    writeln!(out, "------------------")?;
    let plural = if count == 1 { "" } else { "s" };
    match &index.last_updated {
        Some(updated) => writeln!(
            out,
            "{count} run{plural} found (Updated: {})",
            format_optional_date(Some(updated))
        )?,
        None => writeln!(out, "{count} run{plural} found")?,
    }
    writeln!(out)?;

    if index.runs.is_empty() {
        return writeln!(out, "No evaluation runs available");
    }

    for run in &index.runs {
        writeln!(out, "{} [{}]", run.model.name, run.status)?;
        writeln!(out, "  Run ID:        {}", run.run_id)?;
        writeln!(out, "  Framework:     {}", run.framework)?;
        writeln!(
            out,
            "  Model Type:    {}",
            run.model.model_type.as_deref().unwrap_or("N/A")
        )?;
        writeln!(out, "  Overall Score: {}", format_score(run.overall_score))?;
        writeln!(out, "  Duration:      {}", format_duration(run.duration_seconds))?;
        writeln!(out, "  Datasets:      {}", run.datasets.join(", "))?;
        writeln!(
            out,
            "  Started:       {}",
            format_optional_date(run.start_time.as_deref())
        )?;
        writeln!(out)?;
    }

    Ok(())
}

/// Plain-text run detail with the benchmark rollup
pub fn render_run(out: &mut impl Write, run_id: &str, data: &RunData) -> fmt::Result {
    let meta = &data.meta;
    let summary = &data.summary;

    writeln!(out, "=== {} ===", meta.model.name)?;
    writeln!(out, "{run_id} [{}]", meta.status)?;
    writeln!(out)?;

    let framework = match &meta.framework_version {
        Some(version) => format!("{} {version}", meta.framework),
        None => meta.framework.clone(),
    };
    writeln!(out, "Framework:      {framework}")?;
    writeln!(
        out,
        "Model Type:     {}",
        meta.model.model_type.as_deref().unwrap_or("N/A")
    )?;
    writeln!(
        out,
        "Overall Score:  {}",
        format_score(Some(summary.overall.avg_score))
    )?;
    writeln!(out, "Total Samples:  {}", summary.overall.total_samples)?;
    writeln!(out)?;

    writeln!(out, "🕒 RUN INFORMATION")?;
    writeln!(out, "------------------")?;
    writeln!(
        out,
        "Start Time:     {}",
        format_optional_date(meta.start_time.as_deref())
    )?;
    writeln!(
        out,
        "End Time:       {}",
        format_optional_date(meta.end_time.as_deref())
    )?;
    writeln!(out, "Duration:       {}", format_duration(meta.duration_seconds))?;
    writeln!(
        out,
        "Model Revision: {}",
        meta.model.revision.as_deref().unwrap_or("N/A")
    )?;
    writeln!(out)?;

    if !meta.config.is_empty() {
        writeln!(out, "⚙️  CONFIGURATION")?;
        writeln!(out, "----------------")?;
        if let Some(batch_size) = meta.config.eval_batch_size {
            writeln!(out, "Batch Size:     {batch_size}")?;
        }
        if let Some(seed) = meta.config.seed {
            writeln!(out, "Seed:           {seed}")?;
        }
        for (key, value) in &meta.config.extra {
            writeln!(out, "{key}: {value}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "📊 EVALUATION RESULTS")?;
    writeln!(out, "---------------------")?;
    let view = AggregationView::new(data.summary.clone());
    render_results(out, &view)?;

    let reconciliation = view.reconcile(meta);
    if !reconciliation.missing_from_summary.is_empty() {
        writeln!(
            out,
            "⚠️  No results for: {}",
            reconciliation.missing_from_summary.join(", ")
        )?;
        writeln!(out)?;
    }

    writeln!(out, "📝 SAMPLE PREDICTIONS")?;
    writeln!(out, "---------------------")?;
    for dataset in &meta.datasets {
        writeln!(out, "  evalview samples {run_id} --dataset {dataset}")?;
    }

    Ok(())
}

fn render_results(out: &mut impl Write, view: &AggregationView) -> fmt::Result {
    let mut results = view.results().peekable();
    if results.peek().is_none() {
        writeln!(out, "No evaluation results available")?;
        return writeln!(out);
    }

    for result in results {
        writeln!(
            out,
            "{} ({}): {}",
            display_name(result),
            result.dataset,
            format_score(Some(result.overall_score))
        )?;

        // Datasets come from the view itself, so lookups by name always resolve
        if let Ok(Some((primary, _))) = view.primary_metric(&result.dataset) {
            writeln!(out, "  Primary Metric: {primary}")?;
        }

        writeln!(out, "  Metrics:")?;
        for (name, metric) in &result.metrics {
            write!(out, "    • {name}: {}", format_score(Some(metric.score)))?;
            if let Some(macro_score) = metric.macro_score {
                write!(out, " (macro {})", format_score(Some(macro_score)))?;
            }
            writeln!(out, ", {} samples", metric.num_samples)?;
        }

        let categories = view.categories(&result.dataset).unwrap_or_default();
        if !categories.is_empty() {
            writeln!(out, "  Category Breakdown:")?;
        }
        for category in categories {
            writeln!(
                out,
                "    {}: {}",
                category.display_name(),
                format_score(Some(category.score()))
            )?;
            for subset in category.subsets() {
                writeln!(
                    out,
                    "      - {}: {} (n={})",
                    subset.name,
                    format_score(Some(subset.score)),
                    subset.num
                )?;
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Plain-text sample browser
pub fn render_samples(
    out: &mut impl Write,
    run_id: &str,
    meta: &RunMeta,
    dataset: &str,
    samples: &[Sample],
    truncate_at: Option<usize>,
) -> fmt::Result {
    let clip = |text: String| match truncate_at {
        Some(max) => truncate_text(&text, max),
        None => text,
    };

    writeln!(out, "=== Sample Predictions ===")?;
    writeln!(out, "{} - {dataset} ({run_id})", meta.model.name)?;
    writeln!(out, "Total Samples: {}", samples.len())?;

    let datasets: Vec<String> = meta
        .datasets
        .iter()
        .map(|d| if d == dataset { format!("[{d}]") } else { d.clone() })
        .collect();
    writeln!(out, "Datasets: {}", datasets.join(" "))?;
    writeln!(out)?;

    if samples.is_empty() {
        return writeln!(out, "No samples available");
    }

    for sample in samples {
        writeln!(out, "Sample #{}", sample.id)?;
        writeln!(out, "Input:      {}", clip(render_value(&sample.input)))?;
        writeln!(out, "Target:     {}", clip(render_value(&sample.target)))?;
        writeln!(out, "Prediction: {}", clip(render_value(&sample.prediction)))?;
        if !sample.scores.is_empty() {
            writeln!(out, "Scores:")?;
            for (metric, score) in &sample.scores {
                writeln!(out, "  • {metric}: {}", format_score(Some(*score)))?;
            }
        }

        // Details are only shown in full mode
        if truncate_at.is_none() {
            if let Some(choices) = sample.choices.as_ref().filter(|c| !c.is_empty()) {
                writeln!(out, "Choices:")?;
                for choice in choices {
                    writeln!(out, "  - {choice}")?;
                }
            }
            if !sample.metadata.is_empty() {
                let metadata = serde_json::to_string_pretty(&sample.metadata)
                    .map_err(|_| fmt::Error)?;
                writeln!(out, "Metadata:\n{metadata}")?;
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Render into a buffer and print it, reporting formatting failures on stderr
fn print_plain(render: impl FnOnce(&mut String) -> fmt::Result) {
    let mut out = String::new();
    match render(&mut out) {
        Ok(()) => print!("{}", out),
        Err(e) => eprintln!("Error formatting results: {}", e),
    }
}

/// Print any serializable value as pretty JSON
fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results to JSON: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BenchmarkResult, Category, Metric, ModelInfo, Overall, RunConfig, RunIndexEntry,
        RunStatus, SampleId, SampleValue, Subset, Summary,
    };
    use indexmap::IndexMap;
    use serde_json::json;
    use std::sync::Arc;

    fn render(f: impl FnOnce(&mut String) -> fmt::Result) -> String {
        let mut out = String::new();
        f(&mut out).unwrap();
        out
    }

    fn create_test_meta() -> RunMeta {
        RunMeta {
            run_id: Some("run_1".to_string()),
            schema_version: Some("1.0".to_string()),
            model: ModelInfo {
                name: "qwen2.5-7b".to_string(),
                model_type: Some("checkpoint".to_string()),
                revision: None,
            },
            framework: "evalscope".to_string(),
            framework_version: Some("0.17.1".to_string()),
            status: RunStatus::Completed,
            timestamp: None,
            start_time: Some("2025-01-01T10:00:00".to_string()),
            end_time: None,
            duration_seconds: Some(125.0),
            datasets: vec!["mmlu".to_string(), "gsm8k".to_string()],
            config: RunConfig {
                eval_batch_size: Some(8),
                seed: Some(42),
                extra: Default::default(),
            },
            tags: Vec::new(),
        }
    }

    fn create_test_run_data() -> RunData {
        let mmlu = BenchmarkResult {
            dataset: "mmlu".to_string(),
            dataset_pretty_name: Some("MMLU".to_string()),
            overall_score: 0.82,
            metrics: IndexMap::from([
                (
                    "accuracy".to_string(),
                    Metric {
                        score: 0.82,
                        macro_score: Some(0.8),
                        num_samples: 500,
                    },
                ),
                (
                    "f1".to_string(),
                    Metric {
                        score: 0.79,
                        macro_score: None,
                        num_samples: 500,
                    },
                ),
            ]),
            categories: vec![Category {
                name: vec!["math".to_string(), "algebra".to_string()],
                score: 0.91,
                macro_score: None,
                num_samples: None,
                subsets: vec![Subset {
                    name: "linear".to_string(),
                    score: 0.95,
                    num: 40,
                }],
            }],
        };

        RunData {
            meta: Arc::new(create_test_meta()),
            summary: Arc::new(Summary {
                run_id: Some("run_1".to_string()),
                schema_version: None,
                overall: Overall {
                    avg_score: 0.82,
                    total_samples: 500,
                },
                datasets: vec![mmlu],
            }),
        }
    }

    fn create_test_samples() -> Vec<Sample> {
        vec![Sample {
            id: SampleId::Number(3),
            input: SampleValue::Text("x".repeat(150)),
            target: SampleValue::TextList(vec!["A".to_string(), "B".to_string()]),
            prediction: SampleValue::Text("A".to_string()),
            scores: IndexMap::from([("accuracy".to_string(), 1.0)]),
            choices: Some(vec!["A".to_string(), "B".to_string()]),
            metadata: json!({"subset": "easy"}).as_object().unwrap().clone(),
        }]
    }

    fn create_test_index() -> RunIndex {
        RunIndex {
            last_updated: Some("2025-01-01T11:00:00Z".to_string()),
            runs: vec![RunIndexEntry {
                run_id: "run_1".to_string(),
                model: ModelInfo {
                    name: "qwen2.5-7b".to_string(),
                    model_type: Some("checkpoint".to_string()),
                    revision: None,
                },
                framework: "evalscope".to_string(),
                status: RunStatus::Completed,
                overall_score: None,
                duration_seconds: Some(45.0),
                datasets: vec!["mmlu".to_string(), "gsm8k".to_string()],
                start_time: None,
                end_time: None,
                timestamp: None,
                num_samples: None,
                tags: Vec::new(),
            }],
            total: Some(1),
        }
    }

    #[test]
    fn test_render_runs() {
        let text = render(|out| render_runs(out, &create_test_index()));
        assert!(text.contains("1 run found (Updated: 2025-01-01 11:00:00)"));
        assert!(text.contains("qwen2.5-7b [completed]"));
        assert!(text.contains("Overall Score: N/A"));
        assert!(text.contains("Duration:      45.0s"));
        assert!(text.contains("Datasets:      mmlu, gsm8k"));
    }

    #[test]
    fn test_render_runs_empty() {
        let index = RunIndex {
            last_updated: None,
            runs: Vec::new(),
            total: None,
        };
        let text = render(|out| render_runs(out, &index));
        assert!(text.contains("0 runs found"));
        assert!(text.contains("No evaluation runs available"));
    }

    #[test]
    fn test_render_run() {
        let text = render(|out| render_run(out, "run_1", &create_test_run_data()));
        assert!(text.contains("Framework:      evalscope 0.17.1"));
        assert!(text.contains("Overall Score:  82.0%"));
        assert!(text.contains("Duration:       2m 5s"));
        assert!(text.contains("Batch Size:     8"));
        assert!(text.contains("MMLU (mmlu): 82.0%"));
        assert!(text.contains("• accuracy: 82.0% (macro 80.0%), 500 samples"));
        assert!(text.contains("• f1: 79.0%, 500 samples"));
        assert!(text.contains("math > algebra: 91.0%"));
        assert!(text.contains("- linear: 95.0% (n=40)"));
        assert!(text.contains("Primary Metric: accuracy"));
        assert!(text.contains("No results for: gsm8k"));
        assert!(text.contains("evalview samples run_1 --dataset gsm8k"));
    }

    #[test]
    fn test_render_run_metric_order() {
        let text = render(|out| render_run(out, "run_1", &create_test_run_data()));
        let accuracy = text.find("• accuracy").unwrap();
        let f1 = text.find("• f1").unwrap();
        assert!(accuracy < f1);
    }

    #[test]
    fn test_render_samples_truncated() {
        let meta = create_test_meta();
        let samples = create_test_samples();
        let text = render(|out| render_samples(out, "run_1", &meta, "mmlu", &samples, Some(100)));
        assert!(text.contains("Total Samples: 1"));
        assert!(text.contains("Datasets: [mmlu] gsm8k"));
        assert!(text.contains(&format!("Input:      {}...", "x".repeat(100))));
        assert!(text.contains("Target:     A, B"));
        assert!(text.contains("• accuracy: 100.0%"));
        assert!(!text.contains("Choices:"));
    }

    #[test]
    fn test_render_samples_full() {
        let meta = create_test_meta();
        let samples = create_test_samples();
        let text = render(|out| render_samples(out, "run_1", &meta, "mmlu", &samples, None));
        assert!(text.contains(&"x".repeat(150)));
        assert!(text.contains("Choices:"));
        assert!(text.contains("\"subset\": \"easy\""));
    }

    #[test]
    fn test_render_samples_empty() {
        let meta = create_test_meta();
        let text = render(|out| render_samples(out, "run_1", &meta, "gsm8k", &[], Some(100)));
        assert!(text.contains("No samples available"));
    }

    #[test]
    fn test_setup_instructions_name_data_root() {
        let text = render(|out| render_setup_instructions(out, Path::new("./public/data")));
        assert!(text.contains("No Data Available"));
        assert!(text.contains("--out-dir ./public/data"));
    }

    #[test]
    fn test_json_output() {
        // Serialization must not panic for any view
        print_runs(&create_test_index(), OutputFormat::Json);
        print_run("run_1", &create_test_run_data(), OutputFormat::Json);
        let meta = create_test_meta();
        print_samples("run_1", &meta, "mmlu", &create_test_samples(), None, OutputFormat::Json);
    }

    #[test]
    fn test_run_data_json_keeps_metric_order() {
        let json = serde_json::to_string(&create_test_run_data()).unwrap();
        let accuracy = json.find("\"accuracy\"").unwrap();
        let f1 = json.find("\"f1\"").unwrap();
        assert!(accuracy < f1);
    }
}
