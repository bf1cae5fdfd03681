//! CohortLens: anonymous vs identified customer comparison CLI
//!
//! This is the main entrypoint that orchestrates data loading, cohort
//! aggregation, chart rendering and the optional JSON summary.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use cohortlens::{build_report, load_dataset, viz, Args};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if args.verbose {
        println!("CohortLens - Anonymous vs Identified Customers");
        println!("==============================================\n");
    }

    run_pipeline(&args)
}

/// Run the load -> aggregate -> render pipeline
fn run_pipeline(args: &Args) -> Result<()> {
    let config = args.report_config()?;
    let start_time = Instant::now();

    // Step 1: Load data
    if args.verbose {
        println!("Step 1: Loading data");
        println!("  Input file: {}", args.input.display());
    }

    let data_start = Instant::now();
    let dataset = load_dataset(&args.input)
        .with_context(|| format!("failed to load dataset from {}", args.input.display()))?;
    let data_time = data_start.elapsed();

    println!("✓ Data loaded: {} records", dataset.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", data_time.as_secs_f64());
        println!("  Columns: {}", dataset.columns().join(", "));
    }

    // Step 2: Split cohorts and aggregate
    if args.verbose {
        println!("\nStep 2: Aggregating cohorts");
        let charts: Vec<String> = config.charts.iter().map(|chart| format!("{:?}", chart)).collect();
        println!("  Charts: {}", charts.join(", "));
        println!("  Offer types: {}", config.offer_types.join(", "));
        println!("  Distribution cohort: {}", config.distribution_cohort);
    }

    let report = build_report(&dataset, &config)?;
    println!(
        "✓ Cohorts aggregated: {} anonymous, {} identified",
        report.anonymous.stats.record_count, report.identified.stats.record_count
    );

    viz::print_cohort_statistics(&report);

    // Step 3: Render charts
    if args.no_charts {
        log::debug!("chart rendering disabled");
    } else {
        if args.verbose {
            println!("\nStep 3: Rendering charts");
            println!("  Output directory: {}", config.render.output_dir.display());
        }

        let viz_start = Instant::now();
        let written = viz::render_report(&report, &config)?;
        println!("\n✓ {} charts written", written.len());
        for path in &written {
            println!("  {}", path.display());
        }
        if args.verbose {
            println!("  Rendering time: {:.2}s", viz_start.elapsed().as_secs_f64());
        }
    }

    // Step 4: JSON summary
    if let Some(path) = &args.summary {
        report.write_json(path)?;
        println!("✓ Summary saved to: {}", path.display());
    }

    println!("\n=== Report Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}
