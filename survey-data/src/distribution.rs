use crate::record::Record;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const NO_ANSWER: &str = "(no answer)";

/// One slice of a categorical distribution, shaped for a pie chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub name: String,
    pub count: usize,
    /// Percentage of all records.
    pub value: f64,
}

/// Share of each distinct answer to `field`, in order of first appearance.
pub fn distribution(records: &[Record], field: &str) -> Vec<CategoryShare> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for record in records {
        let name = match record.get(field) {
            Some(value) if !value.is_null() => value.to_string(),
            _ => NO_ANSWER.to_string(),
        };
        *counts.entry(name).or_default() += 1;
    }

    let total = records.len();
    counts
        .into_iter()
        .map(|(name, count)| CategoryShare {
            name,
            count,
            value: count as f64 / total as f64 * 100.0,
        })
        .collect()
}
