//! Metric Calculator: a single linear scan over the records.

use crate::record::Record;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use survey_core::SurveyError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Count,
    #[default]
    Percentage,
}

impl FromStr for Aggregation {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(Aggregation::Count),
            "percentage" => Ok(Aggregation::Percentage),
            other => Err(SurveyError::InvalidArgument(format!(
                "unknown aggregation mode '{other}' (expected 'count' or 'percentage')"
            ))),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Count => f.write_str("count"),
            Aggregation::Percentage => f.write_str("percentage"),
        }
    }
}

/// Which records a metric counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Filter {
    /// Every record, whether or not it has the field.
    #[default]
    Any,
    Equals(FieldValue),
    OneOf(Vec<FieldValue>),
}

impl Filter {
    pub fn matches(&self, record: &Record, field: &str) -> bool {
        match self {
            Filter::Any => true,
            Filter::Equals(expected) => record.get(field) == Some(expected),
            Filter::OneOf(expected) => {
                record.get(field).is_some_and(|value| expected.contains(value))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRequest {
    pub field: String,
    pub filter: Filter,
    pub aggregation: Aggregation,
}

impl MetricRequest {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into(), filter: Filter::Any, aggregation: Aggregation::default() }
    }

    pub fn equals(mut self, value: impl Into<FieldValue>) -> Self {
        self.filter = Filter::Equals(value.into());
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.filter = Filter::OneOf(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }
}

pub fn count_matching(records: &[Record], field: &str, filter: &Filter) -> usize {
    records.iter().filter(|record| filter.matches(record, field)).count()
}

/// Count of matching records, or their share of all records in percent.
/// The percentage of an empty record set is `0`.
pub fn compute(records: &[Record], request: &MetricRequest) -> f64 {
    let matching = count_matching(records, &request.field, &request.filter);
    match request.aggregation {
        Aggregation::Count => matching as f64,
        Aggregation::Percentage if records.is_empty() => 0.0,
        Aggregation::Percentage => matching as f64 / records.len() as f64 * 100.0,
    }
}
