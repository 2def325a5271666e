//! Read-only view over a run's benchmark summary.
//!
//! Nothing here recomputes a score: category and subset scores are whatever
//! the ETL step stored, and the view only indexes and labels them.

use crate::error::{LoaderError, LoaderResult};
use crate::models::{BenchmarkResult, Category, Metric, RunMeta, Subset, Summary};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Separator between category path segments in display names
pub const CATEGORY_SEPARATOR: &str = " > ";

/// Dataset lookup and breakdown traversal for one summary
#[derive(Debug, Clone)]
pub struct AggregationView {
    summary: Arc<Summary>,
    by_dataset: HashMap<String, usize>,
}

impl AggregationView {
    pub fn new(summary: Arc<Summary>) -> Self {
        let mut by_dataset = HashMap::with_capacity(summary.datasets.len());
        for (position, result) in summary.datasets.iter().enumerate() {
            // First occurrence wins if the ETL wrote a dataset twice
            by_dataset.entry(result.dataset.clone()).or_insert(position);
        }
        Self {
            summary,
            by_dataset,
        }
    }

    /// Results in stored order
    pub fn results(&self) -> impl Iterator<Item = &BenchmarkResult> {
        self.summary.datasets.iter()
    }

    /// Rollup of one dataset; absent datasets are a data error
    pub fn result(&self, dataset: &str) -> LoaderResult<&BenchmarkResult> {
        self.by_dataset
            .get(dataset)
            .map(|&position| &self.summary.datasets[position])
            .ok_or_else(|| LoaderError::MalformedData {
                key: self.summary_key(),
                path: "datasets".to_string(),
                message: format!("dataset `{dataset}` is not in the summary"),
            })
    }

    /// The first metric in stored order
    pub fn primary_metric(&self, dataset: &str) -> LoaderResult<Option<(&str, &Metric)>> {
        self.result(dataset).map(|result| {
            result
                .metrics
                .first()
                .map(|(name, metric)| (name.as_str(), metric))
        })
    }

    /// Category breakdown; empty when the dataset has none
    pub fn categories(&self, dataset: &str) -> LoaderResult<Vec<CategoryView<'_>>> {
        self.result(dataset)
            .map(|result| result.categories.iter().map(CategoryView::new).collect())
    }

    /// Compare the summary's datasets against those listed in the run metadata
    pub fn reconcile(&self, meta: &RunMeta) -> DatasetReconciliation {
        DatasetReconciliation::between(meta, &self.summary)
    }

    fn summary_key(&self) -> String {
        match &self.summary.run_id {
            Some(run_id) => format!("{run_id}/summary"),
            None => "summary".to_string(),
        }
    }
}

/// Pretty name if stored, otherwise the dataset key
pub fn display_name(result: &BenchmarkResult) -> &str {
    result
        .dataset_pretty_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&result.dataset)
}

/// One category with its display label and leaves
#[derive(Debug, Clone, Copy)]
pub struct CategoryView<'a> {
    category: &'a Category,
}

impl<'a> CategoryView<'a> {
    pub fn new(category: &'a Category) -> Self {
        Self { category }
    }

    /// Path segments joined for display, e.g. `math > algebra`
    pub fn display_name(&self) -> String {
        self.category.name.join(CATEGORY_SEPARATOR)
    }

    /// Stored score, never derived from the subsets
    pub fn score(&self) -> f64 {
        self.category.score
    }

    pub fn subsets(&self) -> &'a [Subset] {
        &self.category.subsets
    }

    pub fn has_subsets(&self) -> bool {
        !self.category.subsets.is_empty()
    }
}

/// Datasets that appear on only one side of meta vs. summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetReconciliation {
    /// Listed in the run metadata but without a rollup
    pub missing_from_summary: Vec<String>,
    /// Rolled up but not listed in the run metadata
    pub not_in_meta: Vec<String>,
}

impl DatasetReconciliation {
    pub fn between(meta: &RunMeta, summary: &Summary) -> Self {
        let in_summary: HashSet<&str> = summary
            .datasets
            .iter()
            .map(|r| r.dataset.as_str())
            .collect();
        let in_meta: HashSet<&str> = meta.datasets.iter().map(String::as_str).collect();

        Self {
            missing_from_summary: meta
                .datasets
                .iter()
                .filter(|d| !in_summary.contains(d.as_str()))
                .cloned()
                .collect(),
            not_in_meta: summary
                .datasets
                .iter()
                .filter(|r| !in_meta.contains(r.dataset.as_str()))
                .map(|r| r.dataset.clone())
                .collect(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.missing_from_summary.is_empty() && self.not_in_meta.is_empty()
    }
}
