//! Cohort splitting by completeness of the demographic fields

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, DemographicField, Record};
use crate::error::{CohortError, CohortResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CohortKind {
    /// At least one of age, gender, income is missing
    Anonymous,
    /// At least one of age, gender, income is present
    Identified,
}

impl CohortKind {
    pub fn label(self) -> &'static str {
        match self {
            CohortKind::Anonymous => "anonymous",
            CohortKind::Identified => "identified",
        }
    }

    pub fn contains(self, record: &Record) -> bool {
        match self {
            CohortKind::Anonymous => record.is_anonymous(),
            CohortKind::Identified => record.is_identified(),
        }
    }
}

impl std::fmt::Display for CohortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Record {
    pub fn is_anonymous(&self) -> bool {
        DemographicField::ALL
            .into_iter()
            .any(|field| !self.has_demographic(field))
    }

    pub fn is_identified(&self) -> bool {
        DemographicField::ALL
            .into_iter()
            .any(|field| self.has_demographic(field))
    }
}

/// Records of a dataset matching one membership predicate, in dataset order
#[derive(Debug, Clone)]
pub struct Cohort<'a> {
    pub kind: CohortKind,
    pub records: Vec<&'a Record>,
}

impl<'a> Cohort<'a> {
    pub fn new(kind: CohortKind, records: Vec<&'a Record>) -> Self {
        Self { kind, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }
}

/// Split a dataset into (anonymous, identified) cohorts
///
/// A record with some demographic fields missing and others present lands in
/// both cohorts.
///
/// # Errors
/// * `CohortError::Schema` if age, gender or income is not a dataset column
pub fn split_cohorts(dataset: &Dataset) -> CohortResult<(Cohort<'_>, Cohort<'_>)> {
    for field in DemographicField::ALL {
        if !dataset.has_column(field.column()) {
            return Err(CohortError::schema(field.column()));
        }
    }

    let mut anonymous = Vec::new();
    let mut identified = Vec::new();
    for record in dataset.records() {
        if record.is_anonymous() {
            anonymous.push(record);
        }
        if record.is_identified() {
            identified.push(record);
        }
    }

    log::debug!(
        "split {} records into {} anonymous / {} identified",
        dataset.len(),
        anonymous.len(),
        identified.len()
    );

    Ok((
        Cohort::new(CohortKind::Anonymous, anonymous),
        Cohort::new(CohortKind::Identified, identified),
    ))
}

/// Number of records of `a` that also satisfy the membership predicate of `b`
pub fn overlap_count(a: &Cohort<'_>, b: &Cohort<'_>) -> usize {
    a.iter().filter(|record| b.kind.contains(record)).count()
}
