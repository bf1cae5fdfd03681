//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::cohort::CohortKind;
use crate::report::{ChartKind, OutputFormat, RenderOptions, ReportConfig};
use crate::viz::offer_file_stem;

/// Compare anonymous and identified customers across offer events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the cleaned input CSV file
    #[arg(short, long, default_value = "data/data_clean.csv")]
    pub input: PathBuf,

    /// Directory the charts are written to
    #[arg(short, long, default_value = "plots")]
    pub output_dir: PathBuf,

    /// Chart to produce; repeat for several (default: all)
    #[arg(short, long = "chart", value_enum)]
    pub charts: Vec<ChartKind>,

    /// Offer type to draw distributions for; repeat for several (default: bogo, discount)
    #[arg(long = "offer-type")]
    pub offer_types: Vec<String>,

    /// Cohort the age/income distributions are drawn from
    #[arg(long, value_enum, default_value = "identified")]
    pub distribution_cohort: CohortKind,

    /// Image format of the charts
    #[arg(long, value_enum, default_value = "png")]
    pub format: OutputFormat,

    /// Chart width in pixels before scaling
    #[arg(long, default_value = "1000")]
    pub width: u32,

    /// Chart height in pixels before scaling
    #[arg(long, default_value = "600")]
    pub height: u32,

    /// Scale factor applied to width and height
    #[arg(long, default_value = "1.0")]
    pub scale: f64,

    /// Number of histogram bins for distribution charts
    #[arg(long, default_value = "20")]
    pub bins: usize,

    /// Write the aggregated report as JSON to this path
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Skip chart rendering; print statistics (and the summary) only
    #[arg(long)]
    pub no_charts: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Validate the arguments and turn them into a report configuration
    pub fn report_config(&self) -> crate::Result<ReportConfig> {
        if self.bins == 0 {
            anyhow::bail!("Number of bins must be at least 1");
        }
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("Chart width and height must be positive");
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            anyhow::bail!("Scale must be a positive number, got {}", self.scale);
        }

        let defaults = ReportConfig::default();

        let charts = if self.charts.is_empty() {
            defaults.charts
        } else {
            let mut charts = Vec::with_capacity(self.charts.len());
            for &chart in &self.charts {
                if !charts.contains(&chart) {
                    charts.push(chart);
                }
            }
            charts
        };

        let offer_types: Vec<String> = if self.offer_types.is_empty() {
            defaults.offer_types
        } else {
            let mut offer_types: Vec<String> = Vec::with_capacity(self.offer_types.len());
            for offer in self.offer_types.iter().map(|offer| offer.trim()) {
                if offer.is_empty() || offer_types.iter().any(|known| known == offer) {
                    continue;
                }
                if let Some(known) = offer_types
                    .iter()
                    .find(|known| offer_file_stem(known) == offer_file_stem(offer))
                {
                    anyhow::bail!(
                        "Offer types '{}' and '{}' would write to the same chart files",
                        known,
                        offer
                    );
                }
                offer_types.push(offer.to_string());
            }
            offer_types
        };

        let config = ReportConfig {
            charts,
            offer_types,
            distribution_cohort: self.distribution_cohort,
            render: RenderOptions {
                output_dir: self.output_dir.clone(),
                format: self.format,
                width: self.width,
                height: self.height,
                scale: self.scale,
                bins: self.bins,
            },
        };

        let wants_distribution = config.wants(ChartKind::AgeDistribution)
            || config.wants(ChartKind::IncomeDistribution);
        if wants_distribution && config.offer_types.is_empty() {
            anyhow::bail!("Distribution charts need at least one --offer-type");
        }

        Ok(config)
    }
}
