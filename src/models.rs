use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Treat an explicit `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Category paths are stored as a list of segments or as a single string
fn path_segments<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Segments {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Segments::deserialize(deserializer)? {
        Segments::One(segment) => vec![segment],
        Segments::Many(segments) => segments,
    })
}

/// Lifecycle state of an evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
    Running,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model identity as recorded by the evaluation framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// One row of the run index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunIndexEntry {
    /// Unique key of the run across the store
    pub run_id: String,
    pub model: ModelInfo,
    pub framework: String,
    pub status: RunStatus,
    /// Absent when the run produced no aggregate score
    pub overall_score: Option<f64>,
    pub duration_seconds: Option<f64>,
    /// Evaluated datasets, in stored order
    pub datasets: Vec<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub timestamp: Option<String>,
    pub num_samples: Option<u64>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
}

/// Top-level listing of all runs in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunIndex {
    pub last_updated: Option<String>,
    /// Presentation order, not sorted
    pub runs: Vec<RunIndexEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Run configuration keys the viewer knows how to show
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub eval_batch_size: Option<u64>,
    pub seed: Option<i64>,
    /// Any other configuration key, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RunConfig {
    pub fn is_empty(&self) -> bool {
        self.eval_batch_size.is_none() && self.seed.is_none() && self.extra.is_empty()
    }
}

/// Metadata describing a single run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: Option<String>,
    pub schema_version: Option<String>,
    pub model: ModelInfo,
    pub framework: String,
    pub framework_version: Option<String>,
    pub status: RunStatus,
    pub timestamp: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_seconds: Option<f64>,
    /// Dataset identifiers evaluated in this run
    pub datasets: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: RunConfig,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
}

impl RunMeta {
    pub fn has_dataset(&self, dataset: &str) -> bool {
        self.datasets.iter().any(|d| d == dataset)
    }
}

/// Score for one metric of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_score: Option<f64>,
    pub num_samples: u64,
}

/// Finest breakdown level below a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subset {
    pub name: String,
    pub score: f64,
    /// Number of samples contributing to this leaf
    pub num: u64,
}

/// Score breakdown node; `name` holds the path segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "path_segments")]
    pub name: Vec<String>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_samples: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subsets: Vec<Subset>,
}

/// Rolled-up results of one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub dataset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_pretty_name: Option<String>,
    pub overall_score: f64,
    /// Display order follows the stored order; the first metric is primary
    pub metrics: IndexMap<String, Metric>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overall {
    pub avg_score: f64,
    pub total_samples: u64,
}

/// Benchmark summary of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub run_id: Option<String>,
    pub schema_version: Option<String>,
    pub overall: Overall,
    pub datasets: Vec<BenchmarkResult>,
}

/// Identifier of a sample, as stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleId {
    Text(String),
    Number(i64),
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(id) => f.write_str(id),
            Self::Number(id) => write!(f, "{id}"),
        }
    }
}

/// Shape of a sample's input, target or prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Text(String),
    TextList(Vec<String>),
    Record(Map<String, Value>),
    /// Anything else (numbers, booleans, null, mixed arrays); key order of
    /// records follows the stored document
    Opaque(Value),
}

/// One evaluated input/target/prediction triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    pub input: SampleValue,
    pub target: SampleValue,
    pub prediction: SampleValue,
    /// Per-sample metric values, in stored order
    #[serde(default, deserialize_with = "null_as_default")]
    pub scores: IndexMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
}

/// Metadata and summary of one run, loaded together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunData {
    pub meta: Arc<RunMeta>,
    pub summary: Arc<Summary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_value(value: Value) -> SampleValue {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_sample_value_classification() {
        assert_eq!(
            sample_value(json!("hello")),
            SampleValue::Text("hello".to_string())
        );
        assert_eq!(
            sample_value(json!(["a", "b"])),
            SampleValue::TextList(vec!["a".to_string(), "b".to_string()])
        );
        assert!(matches!(
            sample_value(json!({"role": "user"})),
            SampleValue::Record(_)
        ));
        assert_eq!(
            sample_value(json!(["a", 1])),
            SampleValue::Opaque(json!(["a", 1]))
        );
        assert_eq!(sample_value(json!(42)), SampleValue::Opaque(json!(42)));
        assert_eq!(sample_value(json!(null)), SampleValue::Opaque(Value::Null));
    }

    #[test]
    fn test_sample_value_serializes_to_stored_shape() {
        let value = sample_value(json!(["x", "y"]));
        assert_eq!(serde_json::to_value(&value).unwrap(), json!(["x", "y"]));
    }

    #[test]
    fn test_run_status_round_trip() {
        let status: RunStatus = serde_json::from_value(json!("running")).unwrap();
        assert_eq!(status, RunStatus::Running);
        assert!(serde_json::from_value::<RunStatus>(json!("paused")).is_err());
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_sample_id_display() {
        assert_eq!(SampleId::Number(7).to_string(), "7");
        assert_eq!(SampleId::Text("q-1".to_string()).to_string(), "q-1");
    }

    #[test]
    fn test_metrics_keep_stored_order() {
        let result: BenchmarkResult = serde_json::from_str(
            r#"{"dataset": "mmlu", "overall_score": 0.8, "metrics": {
                "pass_rate": {"score": 0.8, "num_samples": 10},
                "f1": {"score": 0.7, "num_samples": 10}
            }}"#,
        )
        .unwrap();

        let names: Vec<_> = result.metrics.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["pass_rate", "f1"]);
        let json = serde_json::to_string(&result.metrics).unwrap();
        assert!(json.find("pass_rate").unwrap() < json.find("f1").unwrap());
    }

    #[test]
    fn test_null_collections_default_to_empty() {
        let category: Category =
            serde_json::from_value(json!({"name": "geometry", "score": 0.5, "subsets": null}))
                .unwrap();
        assert_eq!(category.name, vec!["geometry"]);
        assert!(category.subsets.is_empty());

        let config: RunConfig =
            serde_json::from_value(json!({"eval_batch_size": 8, "limit": 100})).unwrap();
        assert_eq!(config.eval_batch_size, Some(8));
        assert_eq!(config.extra.get("limit"), Some(&json!(100)));
        assert!(!config.is_empty());
    }
}
