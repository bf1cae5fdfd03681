//! Chart rendering with Plotters for cohort comparisons and offer distributions

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::aggregate::CategoryDistribution;
use crate::cohort::CohortKind;
use crate::data::EventType;
use crate::report::{OutputFormat, RenderOptions, Report, ReportConfig};

/// One color per event type, in `EventType::ALL` order
const EVENT_COLORS: [RGBColor; 3] = [BLUE, RED, GREEN];

/// One color per cohort: anonymous, identified
const COHORT_COLORS: [RGBColor; 2] = [RGBColor(128, 128, 128), RGBColor(31, 119, 180)];

fn cohort_color(cohort: CohortKind) -> RGBColor {
    match cohort {
        CohortKind::Anonymous => COHORT_COLORS[0],
        CohortKind::Identified => COHORT_COLORS[1],
    }
}

/// File name for the cohort comparison chart
pub fn comparison_file_name(format: OutputFormat) -> String {
    format!("cohort_events.{}", format.extension())
}

/// File-name stem of an offer type: lowercase ASCII alphanumerics, everything else `_`
pub fn offer_file_stem(offer_type: &str) -> String {
    offer_type
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// File name for a distribution chart, e.g. `bogo_age_distribution.png`
pub fn distribution_file_name(distribution: &CategoryDistribution, format: OutputFormat) -> String {
    format!(
        "{}_{}_distribution.{}",
        offer_file_stem(&distribution.offer_type),
        distribution.field,
        format.extension()
    )
}

/// Equal-width bin edges covering every value; `None` when there are no values
///
/// A single distinct value gets a unit-wide range centred on it.
pub fn bin_edges<'a>(values: impl IntoIterator<Item = &'a f64>, bins: usize) -> Option<Vec<f64>> {
    let bins = bins.max(1);
    let (min, max) = values
        .into_iter()
        .fold(None, |bounds: Option<(f64, f64)>, &value| match bounds {
            None => Some((value, value)),
            Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
        })?;

    let (min, max) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
    let width = (max - min) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();
    // min + width * bins can round below max
    edges[bins] = max;
    Some(edges)
}

/// Count values per bin; the last bin includes its upper edge
///
/// Values below the first edge or clearly above the last are ignored; values
/// a rounding error past the last edge land in the last bin.
pub fn bin_counts(values: &[f64], edges: &[f64]) -> Vec<usize> {
    let bins = edges.len().saturating_sub(1);
    let mut counts = vec![0; bins];
    if bins == 0 {
        return counts;
    }

    let min = edges[0];
    let max = edges[bins];
    let width = (max - min) / bins as f64;
    let tolerance = width * 1e-9;
    for &value in values {
        if value < min || value > max + tolerance {
            continue;
        }
        let index = (((value - min) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
}

/// Create a grouped bar chart of event totals, one bar per cohort
pub fn create_cohort_comparison_chart(
    report: &Report,
    output_path: &Path,
    options: &RenderOptions,
) -> crate::Result<()> {
    let dimensions = options.dimensions();
    match options.format {
        OutputFormat::Png => {
            let root = BitMapBackend::new(output_path, dimensions).into_drawing_area();
            draw_cohort_comparison(&root, report)?;
            root.present()?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(output_path, dimensions).into_drawing_area();
            draw_cohort_comparison(&root, report)?;
            root.present()?;
        }
    }

    log::info!("cohort comparison saved to {}", output_path.display());
    Ok(())
}

fn draw_cohort_comparison<DB>(root: &DrawingArea<DB, Shift>, report: &Report) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let cohorts = [CohortKind::Anonymous, CohortKind::Identified];
    let max_total = cohorts
        .iter()
        .flat_map(|&cohort| report.summary(cohort).events.values().copied())
        .fold(0.0, f64::max);
    let y_max = (max_total * 1.1).max(1.0);
    let groups = EventType::ALL.len() as f64;

    let mut chart = ChartBuilder::on(root)
        .caption("Offer Events: Anonymous vs Identified Customers", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(groups - 0.5), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(2 * EventType::ALL.len() + 1)
        .x_label_formatter(&|x| {
            let index = x.round();
            if (x - index).abs() > 1e-6 || index < 0.0 {
                return String::new();
            }
            EventType::ALL
                .get(index as usize)
                .map(|event| event.to_string())
                .unwrap_or_default()
        })
        .x_desc("Event")
        .y_desc("Count")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let bar_width = 0.4;
    for (slot, &cohort) in cohorts.iter().enumerate() {
        let color = cohort_color(cohort);
        let summary = report.summary(cohort);
        let offset = -bar_width + slot as f64 * bar_width;

        chart
            .draw_series(EventType::ALL.iter().enumerate().map(|(i, &event)| {
                let left = i as f64 + offset;
                Rectangle::new(
                    [(left, 0.0), (left + bar_width, summary.event_total(event))],
                    color.filled(),
                )
            }))?
            .label(format!("{} ({} records)", cohort, summary.stats.record_count))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

/// Create a stacked histogram of a distribution, one layer per event type
pub fn create_distribution_chart(
    distribution: &CategoryDistribution,
    output_path: &Path,
    options: &RenderOptions,
) -> crate::Result<()> {
    let dimensions = options.dimensions();
    match options.format {
        OutputFormat::Png => {
            let root = BitMapBackend::new(output_path, dimensions).into_drawing_area();
            draw_distribution(&root, distribution, options.bins)?;
            root.present()?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(output_path, dimensions).into_drawing_area();
            draw_distribution(&root, distribution, options.bins)?;
            root.present()?;
        }
    }

    log::info!(
        "{} {} distribution saved to {}",
        distribution.offer_type,
        distribution.field,
        output_path.display()
    );
    Ok(())
}

fn draw_distribution<DB>(
    root: &DrawingArea<DB, Shift>,
    distribution: &CategoryDistribution,
    bins: usize,
) -> crate::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let title = format!(
        "{} Distribution for '{}' Offers ({} cohort)",
        capitalize(distribution.field.column()),
        distribution.offer_type,
        distribution.cohort
    );

    let all_values = EventType::ALL
        .into_iter()
        .flat_map(|event| distribution.values_for(event));
    let edges = bin_edges(all_values, bins).unwrap_or_else(|| vec![0.0, 1.0]);

    let layers: Vec<Vec<usize>> = EventType::ALL
        .iter()
        .map(|&event| bin_counts(distribution.values_for(event), &edges))
        .collect();

    let bin_count = edges.len() - 1;
    let stacked_max = (0..bin_count)
        .map(|bin| layers.iter().map(|layer| layer[bin]).sum::<usize>())
        .max()
        .unwrap_or(0);
    let y_max = (stacked_max as f64 * 1.1).max(1.0);

    let x_min = edges[0];
    let x_max = edges[bin_count];

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 26))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc(capitalize(distribution.field.column()))
        .y_desc("Records")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let mut baseline = vec![0usize; bin_count];
    for (layer, (&event, color)) in layers.iter().zip(EventType::ALL.iter().zip(EVENT_COLORS)) {
        let bars: Vec<Rectangle<(f64, f64)>> = (0..bin_count)
            .filter(|&bin| layer[bin] > 0)
            .map(|bin| {
                let bottom = baseline[bin] as f64;
                let top = (baseline[bin] + layer[bin]) as f64;
                Rectangle::new([(edges[bin], bottom), (edges[bin + 1], top)], color.filled())
            })
            .collect();

        chart
            .draw_series(bars)?
            .label(event.to_string())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));

        for (base, count) in baseline.iter_mut().zip(layer) {
            *base += count;
        }
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Print cohort statistics to console
pub fn print_cohort_statistics(report: &Report) {
    println!("\n=== Cohort Statistics ===");
    println!("Total records: {}", report.dataset_size);
    println!("Records in both cohorts: {}", report.overlap);

    println!("\n  Cohort     | Records | Transactions | Received | Viewed   | Completed");
    println!("  -----------|---------|--------------|----------|----------|----------");
    for summary in [&report.anonymous, &report.identified] {
        println!(
            "  {:10} | {:7} | {:12.2} | {:8} | {:8} | {:8}",
            summary.cohort.label(),
            summary.stats.record_count,
            summary.stats.transaction_total,
            summary.event_total(EventType::OfferReceived),
            summary.event_total(EventType::OfferViewed),
            summary.event_total(EventType::OfferCompleted),
        );
    }

    if !report.distributions.is_empty() {
        println!("\nDistributions:");
        for distribution in &report.distributions {
            let counts: Vec<String> = EventType::ALL
                .iter()
                .map(|&event| format!("{}={}", event, distribution.values_for(event).len()))
                .collect();
            println!(
                "  {} / {} ({}): {}",
                distribution.offer_type,
                distribution.field,
                distribution.cohort,
                counts.join(", ")
            );
        }
    }

    for advisory in &report.advisories {
        println!("\nNote: {}", advisory);
    }
}

/// Draw every chart selected in `config` into its output directory
///
/// # Returns
/// * Paths of the files written, in drawing order
pub fn render_report(report: &Report, config: &ReportConfig) -> crate::Result<Vec<PathBuf>> {
    let options = &config.render;
    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!("failed to create output directory {}", options.output_dir.display())
    })?;

    let mut written = Vec::new();
    let mut seen = HashSet::new();
    for &chart in &config.charts {
        match chart.distribution_field() {
            None => {
                let path = options.output_dir.join(comparison_file_name(options.format));
                create_cohort_comparison_chart(report, &path, options)?;
                written.push(path);
            }
            Some(field) => {
                for distribution in report.distributions_for(field) {
                    let path = options
                        .output_dir
                        .join(distribution_file_name(distribution, options.format));
                    if !seen.insert(path.clone()) {
                        anyhow::bail!(
                            "offer type '{}' maps to {}, which another offer type already uses",
                            distribution.offer_type,
                            path.display()
                        );
                    }
                    create_distribution_chart(distribution, &path, options)?;
                    written.push(path);
                }
            }
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, Record};
    use crate::report::{build_report, ChartKind};
    use tempfile::tempdir;

    fn create_test_report(config: &ReportConfig) -> Report {
        let records = vec![
            Record {
                age: Some(25.0),
                gender: Some("M".to_string()),
                income: Some(50000.0),
                offer_type: Some("bogo".to_string()),
                offer_received: 1.0,
                offer_viewed: 1.0,
                ..Record::default()
            },
            Record {
                age: Some(61.0),
                gender: Some("F".to_string()),
                income: Some(98000.0),
                offer_type: Some("discount".to_string()),
                offer_received: 1.0,
                offer_completed: 1.0,
                transaction: 20.0,
                ..Record::default()
            },
            Record {
                offer_type: Some("bogo".to_string()),
                offer_received: 1.0,
                ..Record::default()
            },
        ];
        build_report(&Dataset::from_records(records), config).unwrap()
    }

    fn test_config(dir: &Path, format: OutputFormat) -> ReportConfig {
        ReportConfig {
            render: RenderOptions {
                output_dir: dir.to_path_buf(),
                format,
                width: 400,
                height: 300,
                bins: 5,
                ..RenderOptions::default()
            },
            ..ReportConfig::default()
        }
    }

    #[test]
    fn test_bin_edges() {
        let edges = bin_edges(&[0.0, 10.0, 5.0], 5).unwrap();
        assert_eq!(edges, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);

        let single = bin_edges(&[3.0], 2).unwrap();
        assert_eq!(single, vec![2.5, 3.0, 3.5]);

        assert!(bin_edges(&[], 4).is_none());
    }

    #[test]
    fn test_bin_counts_include_upper_edge() {
        let edges = vec![0.0, 5.0, 10.0];
        let counts = bin_counts(&[0.0, 4.9, 5.0, 10.0, 11.0], &edges);
        assert_eq!(counts, vec![2, 2]);
    }

    #[test]
    fn test_largest_value_is_binned() {
        let values = [0.0, 30.0, 61.0];
        let edges = bin_edges(&values, 7).unwrap();
        assert_eq!(edges.last(), Some(&61.0));

        let counts = bin_counts(&values, &edges);
        assert_eq!(counts.iter().sum::<usize>(), 3);
        assert_eq!(counts[6], 1);
    }

    #[test]
    fn test_offer_file_stem() {
        assert_eq!(offer_file_stem("BOGO"), "bogo");
        assert_eq!(offer_file_stem("a-b"), "a_b");
        assert_eq!(offer_file_stem("a_b"), "a_b");
    }

    #[test]
    fn test_render_report_rejects_colliding_file_names() {
        let temp_dir = tempdir().unwrap();
        let mut config = test_config(temp_dir.path(), OutputFormat::Svg);
        config.charts = vec![ChartKind::AgeDistribution];
        config.offer_types = vec!["bogo".to_string()];
        let mut report = create_test_report(&config);

        let mut shouted = report.distributions[0].clone();
        shouted.offer_type = "BOGO".to_string();
        report.distributions.push(shouted);

        let result = render_report(&report, &config);
        assert!(result.is_err());
    }

    #[test]
    fn test_distribution_file_name() {
        let config = ReportConfig::default();
        let report = create_test_report(&config);
        let names: Vec<String> = report
            .distributions
            .iter()
            .map(|distribution| distribution_file_name(distribution, OutputFormat::Png))
            .collect();

        assert_eq!(
            names,
            vec![
                "bogo_age_distribution.png",
                "discount_age_distribution.png",
                "bogo_income_distribution.png",
                "discount_income_distribution.png",
            ]
        );
    }

    #[test]
    fn test_create_cohort_comparison_chart() {
        let temp_dir = tempdir().unwrap();
        let config = test_config(temp_dir.path(), OutputFormat::Png);
        let report = create_test_report(&config);
        let output_path = temp_dir.path().join("comparison.png");

        let result = create_cohort_comparison_chart(&report, &output_path, &config.render);
        assert!(result.is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_render_report_svg() {
        let temp_dir = tempdir().unwrap();
        let config = test_config(&temp_dir.path().join("charts"), OutputFormat::Svg);
        let report = create_test_report(&config);

        let written = render_report(&report, &config).unwrap();
        assert_eq!(written.len(), 5);
        for path in &written {
            assert!(path.exists(), "missing {}", path.display());
        }
        assert!(temp_dir.path().join("charts").join("cohort_events.svg").exists());
    }
}
