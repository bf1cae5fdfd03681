//! Report pipeline: one configurable pass from dataset to renderable summaries

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::aggregate::{category_distribution, summarize, AggregateSummary, CategoryDistribution, DistributionField};
use crate::cohort::{overlap_count, split_cohorts, CohortKind};
use crate::data::Dataset;
use crate::error::CohortResult;

/// Chart kinds a report can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    /// Event totals of the anonymous vs identified cohort
    CohortComparison,
    /// Age histogram per event type for each offer type
    AgeDistribution,
    /// Income histogram per event type for each offer type
    IncomeDistribution,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::CohortComparison,
        ChartKind::AgeDistribution,
        ChartKind::IncomeDistribution,
    ];

    /// Field drawn by a distribution chart, `None` for the cohort comparison
    pub fn distribution_field(self) -> Option<DistributionField> {
        match self {
            ChartKind::CohortComparison => None,
            ChartKind::AgeDistribution => Some(DistributionField::Age),
            ChartKind::IncomeDistribution => Some(DistributionField::Income),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

/// Presentation options handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub bins: usize,
}

impl RenderOptions {
    /// Pixel dimensions after scaling
    pub fn dimensions(&self) -> (u32, u32) {
        let scale = |value: u32| ((value as f64 * self.scale).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("plots"),
            format: OutputFormat::Png,
            width: 1000,
            height: 600,
            scale: 1.0,
            bins: 20,
        }
    }
}

/// Selects which charts a run produces and how they are drawn
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub charts: Vec<ChartKind>,
    pub offer_types: Vec<String>,
    pub distribution_cohort: CohortKind,
    pub render: RenderOptions,
}

impl ReportConfig {
    pub fn wants(&self, chart: ChartKind) -> bool {
        self.charts.contains(&chart)
    }

    fn distribution_fields(&self) -> Vec<DistributionField> {
        self.charts
            .iter()
            .filter_map(|chart| chart.distribution_field())
            .collect()
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            charts: ChartKind::ALL.to_vec(),
            offer_types: vec!["bogo".to_string(), "discount".to_string()],
            distribution_cohort: CohortKind::Identified,
            render: RenderOptions::default(),
        }
    }
}

/// Non-fatal observations made while building a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// A cohort has no records; its summary is zero-filled
    EmptyCohort { cohort: CohortKind },
    /// Records with partially missing demographics count towards both cohorts
    OverlappingCohorts { records: usize },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::EmptyCohort { cohort } => {
                write!(f, "the {} cohort is empty; its summary is all zeros", cohort)
            }
            Advisory::OverlappingCohorts { records } => write!(
                f,
                "{} records have partially missing demographics and are counted in both cohorts",
                records
            ),
        }
    }
}

/// Everything a renderer needs, as plain data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub dataset_size: usize,
    pub anonymous: AggregateSummary,
    pub identified: AggregateSummary,
    pub overlap: usize,
    pub distributions: Vec<CategoryDistribution>,
    pub advisories: Vec<Advisory>,
}

impl Report {
    pub fn summary(&self, cohort: CohortKind) -> &AggregateSummary {
        match cohort {
            CohortKind::Anonymous => &self.anonymous,
            CohortKind::Identified => &self.identified,
        }
    }

    pub fn distributions_for(&self, field: DistributionField) -> impl Iterator<Item = &CategoryDistribution> {
        self.distributions
            .iter()
            .filter(move |distribution| distribution.field == field)
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> crate::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create summary file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer
            .flush()
            .with_context(|| format!("failed to write summary file {}", path.display()))?;
        Ok(())
    }
}

/// Split the dataset, aggregate both cohorts and collect the distributions the
/// selected charts need
///
/// # Errors
/// * `CohortError::Schema` if a demographic column is missing
/// * `CohortError::UnknownOfferType` if a configured offer type has no records
///   in the distribution cohort
pub fn build_report(dataset: &Dataset, config: &ReportConfig) -> CohortResult<Report> {
    let (anonymous, identified) = split_cohorts(dataset)?;

    let mut advisories = Vec::new();
    for cohort in [&anonymous, &identified] {
        if cohort.is_empty() {
            advisories.push(Advisory::EmptyCohort { cohort: cohort.kind });
        }
    }

    let overlap = overlap_count(&anonymous, &identified);
    if overlap > 0 {
        advisories.push(Advisory::OverlappingCohorts { records: overlap });
    }

    let source = match config.distribution_cohort {
        CohortKind::Anonymous => &anonymous,
        CohortKind::Identified => &identified,
    };

    let mut distributions = Vec::new();
    for field in config.distribution_fields() {
        for offer_type in &config.offer_types {
            distributions.push(category_distribution(source, offer_type, field)?);
        }
    }

    for advisory in &advisories {
        log::warn!("{}", advisory);
    }

    Ok(Report {
        dataset_size: dataset.len(),
        anonymous: summarize(&anonymous),
        identified: summarize(&identified),
        overlap,
        distributions,
        advisories,
    })
}
