//! Per-cohort aggregation: event totals, cohort statistics and category distributions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cohort::{Cohort, CohortKind};
use crate::data::{EventType, Record};
use crate::error::{CohortError, CohortResult};

/// Summed count per event type; always holds all three event types
pub type EventTotals = BTreeMap<EventType, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortStats {
    pub record_count: usize,
    pub transaction_total: f64,
}

/// Terminal aggregate for one cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub cohort: CohortKind,
    pub events: EventTotals,
    pub stats: CohortStats,
}

impl AggregateSummary {
    pub fn event_total(&self, event: EventType) -> f64 {
        self.events.get(&event).copied().unwrap_or(0.0)
    }
}

/// Numeric demographic fields a distribution can be drawn over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionField {
    Age,
    Income,
}

impl DistributionField {
    pub fn column(self) -> &'static str {
        match self {
            DistributionField::Age => "age",
            DistributionField::Income => "income",
        }
    }

    pub fn value(self, record: &Record) -> Option<f64> {
        match self {
            DistributionField::Age => record.age,
            DistributionField::Income => record.income,
        }
    }
}

impl std::fmt::Display for DistributionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Cohort records carrying one offer type
#[derive(Debug, Clone)]
pub struct CategorySlice<'a> {
    pub cohort: CohortKind,
    pub offer_type: String,
    pub records: Vec<&'a Record>,
}

/// Field values per event type for one (cohort, offer type) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub cohort: CohortKind,
    pub offer_type: String,
    pub field: DistributionField,
    pub values: BTreeMap<EventType, Vec<f64>>,
}

impl CategoryDistribution {
    pub fn values_for(&self, event: EventType) -> &[f64] {
        self.values.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(Vec::is_empty)
    }
}

/// Sum the three event-count fields across a cohort
pub fn sum_events(cohort: &Cohort<'_>) -> EventTotals {
    let mut totals: EventTotals = EventType::ALL.into_iter().map(|event| (event, 0.0)).collect();
    for record in cohort.iter() {
        for event in EventType::ALL {
            *totals.entry(event).or_insert(0.0) += record.event_count(event);
        }
    }
    totals
}

pub fn cohort_stats(cohort: &Cohort<'_>) -> CohortStats {
    CohortStats {
        record_count: cohort.len(),
        transaction_total: cohort.iter().map(|record| record.transaction).sum(),
    }
}

pub fn summarize(cohort: &Cohort<'_>) -> AggregateSummary {
    AggregateSummary {
        cohort: cohort.kind,
        events: sum_events(cohort),
        stats: cohort_stats(cohort),
    }
}

pub fn category_slice<'a>(cohort: &Cohort<'a>, offer_type: &str) -> CategorySlice<'a> {
    CategorySlice {
        cohort: cohort.kind,
        offer_type: offer_type.to_string(),
        records: cohort
            .iter()
            .filter(|record| record.has_offer_type(offer_type))
            .collect(),
    }
}

/// Collect `field` values per event type for the cohort's records of one offer type
///
/// A record contributes its value to an event type's list when its count for
/// that event is non-zero. Records without a value for `field` are skipped.
///
/// # Errors
/// * `CohortError::UnknownOfferType` if no record in the cohort has `offer_type`
pub fn category_distribution(
    cohort: &Cohort<'_>,
    offer_type: &str,
    field: DistributionField,
) -> CohortResult<CategoryDistribution> {
    let slice = category_slice(cohort, offer_type);
    if slice.records.is_empty() {
        return Err(CohortError::UnknownOfferType {
            offer_type: offer_type.to_string(),
            cohort: cohort.kind,
        });
    }

    let mut values: BTreeMap<EventType, Vec<f64>> = EventType::ALL
        .into_iter()
        .map(|event| (event, Vec::new()))
        .collect();

    for record in &slice.records {
        let Some(value) = field.value(record) else {
            continue;
        };
        for event in EventType::ALL {
            if record.event_count(event) != 0.0 {
                values.entry(event).or_default().push(value);
            }
        }
    }

    Ok(CategoryDistribution {
        cohort: slice.cohort,
        offer_type: slice.offer_type,
        field,
        values,
    })
}
