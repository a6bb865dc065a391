//! System instruction assembly.
//!
//! The instruction embeds the survey records as JSON, two workload metrics and the
//! conversation history. Output is a pure function of its inputs.

use survey_core::Result;
use survey_data::{Aggregation, Dataset, MetricRequest, Record, compute};

/// Survey question the built-in metrics are computed over.
pub const WORKLOAD_FIELD: &str = "How often do you feel overwhelmed by your academic workload?";

/// Answers counted as "overwhelmed".
pub const OVERWHELMED_ANSWERS: [&str; 2] = ["Often", "Always"];

/// Share and number of students overwhelmed by their workload often or always.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadMetrics {
    pub percentage: f64,
    pub count: f64,
}

impl WorkloadMetrics {
    pub fn compute(records: &[Record]) -> Self {
        let request = MetricRequest::new(WORKLOAD_FIELD).one_of(OVERWHELMED_ANSWERS);
        Self {
            percentage: compute(records, &request.clone().with_aggregation(Aggregation::Percentage)),
            count: compute(records, &request.with_aggregation(Aggregation::Count)),
        }
    }
}

/// Optional caps on what goes into the prompt. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptLimits {
    pub max_history_turns: Option<usize>,
    pub max_records: Option<usize>,
}

impl PromptLimits {
    #[must_use]
    pub fn with_max_history_turns(mut self, turns: usize) -> Self {
        self.max_history_turns = Some(turns);
        self
    }

    #[must_use]
    pub fn with_max_records(mut self, records: usize) -> Self {
        self.max_records = Some(records);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    limits: PromptLimits,
}

impl PromptComposer {
    pub fn new(limits: PromptLimits) -> Self {
        Self { limits }
    }

    pub fn compose(
        &self,
        dataset: &Dataset,
        metrics: &WorkloadMetrics,
        history: &[String],
    ) -> Result<String> {
        let records = match self.limits.max_records {
            Some(max) => &dataset.records()[..max.min(dataset.len())],
            None => dataset.records(),
        };
        let history = match self.limits.max_history_turns {
            Some(max) => &history[history.len().saturating_sub(max)..],
            None => history,
        };
        let records = serde_json::to_string(records)?;

        Ok(format!(
            "The dataset contains responses from university students about their academic stress and mental health management.\n\
             Here are some example responses: {records}.\n\
             A percentage of {percentage}% of students reported feeling overwhelmed by their workload often or always, \
             with a total count of {count} students.\n\
             Please answer the following query based on these responses:\n\
             \n\
             --- Conversation history ---\n\
             {history}\n",
            percentage = metrics.percentage,
            count = metrics.count,
            history = history.join("\n"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_data::parse_csv;

    fn dataset() -> Dataset {
        parse_csv(&format!("{WORKLOAD_FIELD},Year\nOften,1\nNever,2\nAlways,3\n")).unwrap()
    }

    #[test]
    fn test_workload_metrics() {
        let metrics = WorkloadMetrics::compute(dataset().records());
        assert_eq!(metrics.count, 2.0);
        assert!((metrics.percentage - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_workload_metrics_on_empty_dataset() {
        let metrics = WorkloadMetrics::compute(&[]);
        assert_eq!(metrics, WorkloadMetrics { percentage: 0.0, count: 0.0 });
    }

    #[test]
    fn test_compose_embeds_everything() {
        let dataset = dataset();
        let metrics = WorkloadMetrics { percentage: 50.0, count: 2.0 };
        let history = vec!["User: hi".to_string(), "AI: hello".to_string()];

        let prompt = PromptComposer::default().compose(&dataset, &metrics, &history).unwrap();

        assert!(prompt.contains(&format!(r#"{{"{WORKLOAD_FIELD}":"Often","Year":1}}"#)));
        assert!(prompt.contains("A percentage of 50% of students"));
        assert!(prompt.contains("with a total count of 2 students."));
        assert!(prompt.ends_with("--- Conversation history ---\nUser: hi\nAI: hello\n"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let dataset = dataset();
        let metrics = WorkloadMetrics::compute(dataset.records());
        let history = vec!["User: a".to_string()];
        let composer = PromptComposer::default();

        assert_eq!(
            composer.compose(&dataset, &metrics, &history).unwrap(),
            composer.compose(&dataset, &metrics, &history).unwrap()
        );
    }

    #[test]
    fn test_limits_trim_history_and_records() {
        let dataset = dataset();
        let metrics = WorkloadMetrics::compute(dataset.records());
        let history: Vec<String> = (0..4).map(|i| format!("User: q{i}")).collect();
        let composer =
            PromptComposer::new(PromptLimits::default().with_max_history_turns(2).with_max_records(1));

        let prompt = composer.compose(&dataset, &metrics, &history).unwrap();
        assert!(!prompt.contains("User: q1"));
        assert!(prompt.contains("User: q2\nUser: q3"));
        assert!(prompt.contains(r#""Year":1"#));
        assert!(!prompt.contains(r#""Year":2"#));
        // Metrics still describe the whole dataset.
        assert!(prompt.contains("total count of 2 students"));
    }

    #[test]
    fn test_record_limit_larger_than_dataset() {
        let dataset = dataset();
        let metrics = WorkloadMetrics::compute(dataset.records());
        let composer = PromptComposer::new(PromptLimits::default().with_max_records(100));
        assert!(composer.compose(&dataset, &metrics, &[]).is_ok());
    }
}
