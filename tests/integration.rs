//! Integration tests for CohortLens

use cohortlens::{
    build_report, load_dataset, render_report, split_cohorts, sum_events, Advisory, ChartKind,
    CohortError, CohortKind, EventType, OutputFormat, RenderOptions, ReportConfig,
};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const HEADER: &str =
    "person,age,gender,income,offer_type,offer_received,offer_viewed,offer_completed,transaction";

/// Create a test CSV file with sample data
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();

    // Fully identified customers
    writeln!(file, "p1,25,M,50000,bogo,1,1,0,0").unwrap();
    writeln!(file, "p2,48,F,82000,bogo,1,1,1,0").unwrap();
    writeln!(file, "p3,63,F,97000,discount,1,0,0,0").unwrap();
    writeln!(file, "p4,35,O,61000,discount,1,1,1,0").unwrap();

    // Transaction rows carry no offer
    writeln!(file, "p1,25,M,50000,,0,0,0,14.25").unwrap();

    // Fully anonymous customers
    writeln!(file, "p5,,,,bogo,1,0,0,0").unwrap();
    writeln!(file, "p6,,,,discount,1,1,0,3.5").unwrap();

    // Partially known customer: counted in both cohorts
    writeln!(file, "p7,,F,,bogo,1,0,0,0").unwrap();

    file
}

#[test]
fn test_end_to_end_cohort_split() {
    let test_file = create_test_csv();
    let dataset = load_dataset(test_file.path()).unwrap();
    assert_eq!(dataset.len(), 8);

    let (anonymous, identified) = split_cohorts(&dataset).unwrap();
    assert_eq!(anonymous.len(), 3);
    assert_eq!(identified.len(), 6);

    let anon_events = sum_events(&anonymous);
    assert_eq!(anon_events[&EventType::OfferReceived], 3.0);
    assert_eq!(anon_events[&EventType::OfferViewed], 1.0);
    assert_eq!(anon_events[&EventType::OfferCompleted], 0.0);

    let ident_events = sum_events(&identified);
    assert_eq!(ident_events[&EventType::OfferReceived], 5.0);
    assert_eq!(ident_events[&EventType::OfferViewed], 3.0);
    assert_eq!(ident_events[&EventType::OfferCompleted], 2.0);
}

#[test]
fn test_report_from_csv() {
    let test_file = create_test_csv();
    let dataset = load_dataset(test_file.path()).unwrap();

    let report = build_report(&dataset, &ReportConfig::default()).unwrap();
    assert_eq!(report.dataset_size, 8);
    assert_eq!(report.overlap, 1);
    assert_eq!(report.advisories, vec![Advisory::OverlappingCohorts { records: 1 }]);
    assert_eq!(report.identified.stats.transaction_total, 14.25);
    assert_eq!(report.anonymous.stats.transaction_total, 3.5);

    let bogo_age = report
        .distributions
        .iter()
        .find(|d| d.offer_type == "bogo" && d.field.column() == "age")
        .unwrap();
    assert_eq!(bogo_age.cohort, CohortKind::Identified);
    // p7 has no age, so only p1 and p2 contribute
    assert_eq!(bogo_age.values_for(EventType::OfferReceived), &[25.0, 48.0]);
    assert_eq!(bogo_age.values_for(EventType::OfferCompleted), &[48.0]);
}

#[test]
fn test_missing_demographic_column() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "age,income,offer_type,offer_received,offer_viewed,offer_completed,transaction"
    )
    .unwrap();
    writeln!(file, "25,50000,bogo,1,1,0,0").unwrap();

    let dataset = load_dataset(file.path()).unwrap();
    match split_cohorts(&dataset) {
        Err(CohortError::Schema { field }) => assert_eq!(field, "gender"),
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[test]
fn test_unknown_offer_type_in_anonymous_cohort() {
    let test_file = create_test_csv();
    let dataset = load_dataset(test_file.path()).unwrap();

    let config = ReportConfig {
        offer_types: vec!["informational".to_string()],
        distribution_cohort: CohortKind::Anonymous,
        ..ReportConfig::default()
    };

    match build_report(&dataset, &config) {
        Err(CohortError::UnknownOfferType { offer_type, cohort }) => {
            assert_eq!(offer_type, "informational");
            assert_eq!(cohort, CohortKind::Anonymous);
        }
        other => panic!("expected unknown offer type, got {:?}", other),
    }
}

#[test]
fn test_render_and_summary() {
    let test_file = create_test_csv();
    let dataset = load_dataset(test_file.path()).unwrap();
    let temp_dir = tempdir().unwrap();

    let config = ReportConfig {
        charts: vec![ChartKind::CohortComparison, ChartKind::IncomeDistribution],
        render: RenderOptions {
            output_dir: temp_dir.path().join("plots"),
            format: OutputFormat::Png,
            width: 500,
            height: 300,
            bins: 4,
            ..RenderOptions::default()
        },
        ..ReportConfig::default()
    };

    let report = build_report(&dataset, &config).unwrap();
    let written = render_report(&report, &config).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "cohort_events.png",
            "bogo_income_distribution.png",
            "discount_income_distribution.png",
        ]
    );
    assert!(written.iter().all(|path| path.exists()));

    let summary_path = temp_dir.path().join("summary.json");
    report.write_json(&summary_path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(json["overlap"], 1);
    assert_eq!(json["anonymous"]["events"]["offer_received"], 3.0);
    assert_eq!(json["advisories"][0]["kind"], "overlapping_cohorts");
}
