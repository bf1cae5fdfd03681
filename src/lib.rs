//! CohortLens: compare anonymous and identified customers across offer events
//!
//! This library splits a customer/offer dataset into cohorts by completeness of
//! the demographic fields, aggregates offer events per cohort and renders the
//! comparison and age/income distribution charts.

pub mod aggregate;
pub mod cli;
pub mod cohort;
pub mod data;
pub mod error;
pub mod report;
pub mod viz;

// Re-export public items for easier access
pub use aggregate::{
    category_distribution, category_slice, cohort_stats, sum_events, summarize, AggregateSummary,
    CategoryDistribution, CategorySlice, CohortStats, DistributionField, EventTotals,
};
pub use cli::Args;
pub use cohort::{overlap_count, split_cohorts, Cohort, CohortKind};
pub use data::{load_dataset, Dataset, DemographicField, EventType, Record};
pub use error::{CohortError, CohortResult};
pub use report::{build_report, Advisory, ChartKind, OutputFormat, RenderOptions, Report, ReportConfig};
pub use viz::render_report;

/// Common result type used by the rendering and CLI layers
pub type Result<T> = anyhow::Result<T>;
