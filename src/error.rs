//! Error types for loading, splitting and aggregating the dataset

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::cohort::CohortKind;

#[derive(Error, Debug)]
pub enum CohortError {
    #[error("Schema error: required field '{field}' is not a column of the dataset")]
    Schema { field: String },

    #[error("Unknown offer type '{offer_type}': no matching records in the {cohort} cohort")]
    UnknownOfferType { offer_type: String, cohort: CohortKind },

    #[error("Data error: {0}")]
    Polars(#[from] PolarsError),
}

impl CohortError {
    pub fn schema(field: impl Into<String>) -> Self {
        CohortError::Schema { field: field.into() }
    }
}

pub type CohortResult<T> = Result<T, CohortError>;
