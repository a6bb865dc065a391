//! # survey-data
//!
//! Survey responses as typed records: loading from CSV, an explicitly owned cache,
//! the Metric Calculator, and categorical distributions for charting.
//!
//! ```rust
//! use survey_data::{Aggregation, MetricRequest, compute, parse_csv};
//!
//! let dataset = parse_csv("workload\nOften\nNever\nAlways\n").unwrap();
//! let request = MetricRequest::new("workload")
//!     .one_of(["Often", "Always"])
//!     .with_aggregation(Aggregation::Count);
//! assert_eq!(compute(dataset.records(), &request), 2.0);
//! ```

pub mod cache;
pub mod distribution;
pub mod loader;
pub mod metric;
pub mod record;
pub mod value;

pub use cache::DatasetCache;
pub use distribution::{CategoryShare, NO_ANSWER, distribution};
pub use loader::{CsvFileSource, CsvTextSource, DatasetSource, parse_csv};
pub use metric::{Aggregation, Filter, MetricRequest, compute, count_matching};
pub use record::{Dataset, Record};
pub use value::FieldValue;
