//! Dataset loading and record types using Polars

use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CohortError, CohortResult};

/// Column holding the offer category ("bogo", "discount", ...)
pub const OFFER_TYPE: &str = "offer_type";
/// Column holding the transaction amount
pub const TRANSACTION: &str = "transaction";

/// Offer event kinds counted per record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    OfferReceived,
    OfferViewed,
    OfferCompleted,
}

impl EventType {
    pub const ALL: [EventType; 3] = [
        EventType::OfferReceived,
        EventType::OfferViewed,
        EventType::OfferCompleted,
    ];

    pub fn column(self) -> &'static str {
        match self {
            EventType::OfferReceived => "offer_received",
            EventType::OfferViewed => "offer_viewed",
            EventType::OfferCompleted => "offer_completed",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Demographic fields that decide cohort membership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemographicField {
    Age,
    Gender,
    Income,
}

impl DemographicField {
    pub const ALL: [DemographicField; 3] = [
        DemographicField::Age,
        DemographicField::Gender,
        DemographicField::Income,
    ];

    pub fn column(self) -> &'static str {
        match self {
            DemographicField::Age => "age",
            DemographicField::Gender => "gender",
            DemographicField::Income => "income",
        }
    }
}

/// One customer-offer interaction row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub income: Option<f64>,
    pub offer_type: Option<String>,
    pub offer_received: f64,
    pub offer_viewed: f64,
    pub offer_completed: f64,
    pub transaction: f64,
}

impl Record {
    /// Count recorded for the given event type
    pub fn event_count(&self, event: EventType) -> f64 {
        match event {
            EventType::OfferReceived => self.offer_received,
            EventType::OfferViewed => self.offer_viewed,
            EventType::OfferCompleted => self.offer_completed,
        }
    }

    pub fn has_demographic(&self, field: DemographicField) -> bool {
        match field {
            DemographicField::Age => self.age.is_some(),
            DemographicField::Gender => self.gender.is_some(),
            DemographicField::Income => self.income.is_some(),
        }
    }

    pub fn has_offer_type(&self, offer_type: &str) -> bool {
        self.offer_type.as_deref() == Some(offer_type)
    }
}

/// Immutable in-memory table: the columns present in the source plus typed rows
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    /// Build a dataset whose schema carries every known column
    pub fn from_records(records: Vec<Record>) -> Self {
        let columns = all_columns().map(str::to_owned).collect();
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn all_columns() -> impl Iterator<Item = &'static str> {
    DemographicField::ALL
        .into_iter()
        .map(DemographicField::column)
        .chain(std::iter::once(OFFER_TYPE))
        .chain(EventType::ALL.into_iter().map(EventType::column))
        .chain(std::iter::once(TRANSACTION))
}

/// Columns every input file must carry; demographic columns are checked by the splitter
fn required_columns() -> impl Iterator<Item = &'static str> {
    std::iter::once(OFFER_TYPE)
        .chain(EventType::ALL.into_iter().map(EventType::column))
        .chain(std::iter::once(TRANSACTION))
}

/// Load a cleaned customer/offer CSV into a `Dataset`
///
/// # Arguments
/// * `file_path` - Path to the CSV file (header row required)
///
/// # Returns
/// * `Dataset` with the file's columns and one `Record` per row
pub fn load_dataset(file_path: impl AsRef<Path>) -> CohortResult<Dataset> {
    let file_path = file_path.as_ref();

    let df = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .finish()?
        .collect()?;

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    if let Some(missing) = required_columns().find(|name| !columns.iter().any(|c| c == name)) {
        return Err(CohortError::schema(missing));
    }

    let present = |name: &str| columns.iter().any(|c| c == name);

    // Normalise types: counts and amounts to Float64 (null -> 0), text to String
    let mut exprs = vec![col(OFFER_TYPE).cast(DataType::String)];
    for name in EventType::ALL
        .into_iter()
        .map(EventType::column)
        .chain(std::iter::once(TRANSACTION))
    {
        exprs.push(col(name).cast(DataType::Float64).fill_null(lit(0.0)));
    }
    for field in DemographicField::ALL {
        let name = field.column();
        if !present(name) {
            continue;
        }
        let dtype = match field {
            DemographicField::Gender => DataType::String,
            DemographicField::Age | DemographicField::Income => DataType::Float64,
        };
        exprs.push(col(name).cast(dtype));
    }

    let df = df.lazy().select(exprs).collect()?;
    let height = df.height();

    let ages = optional_float_column(&df, DemographicField::Age.column(), present)?;
    let genders = optional_text_column(&df, DemographicField::Gender.column(), present)?;
    let incomes = optional_float_column(&df, DemographicField::Income.column(), present)?;
    let offer_types = text_column(&df, OFFER_TYPE)?;
    let received = count_column(&df, EventType::OfferReceived.column())?;
    let viewed = count_column(&df, EventType::OfferViewed.column())?;
    let completed = count_column(&df, EventType::OfferCompleted.column())?;
    let transactions = count_column(&df, TRANSACTION)?;

    let mut records = Vec::with_capacity(height);
    for i in 0..height {
        records.push(Record {
            age: ages.as_ref().and_then(|values| values[i]),
            gender: genders.as_ref().and_then(|values| values[i].clone()),
            income: incomes.as_ref().and_then(|values| values[i]),
            offer_type: offer_types[i].clone(),
            offer_received: received[i],
            offer_viewed: viewed[i],
            offer_completed: completed[i],
            transaction: transactions[i],
        });
    }

    log::debug!(
        "loaded {} rows with {} columns from {}",
        records.len(),
        columns.len(),
        file_path.display()
    );

    Ok(Dataset::new(columns, records))
}

fn float_column(df: &DataFrame, name: &str) -> CohortResult<Vec<Option<f64>>> {
    Ok(df.column(name)?.f64()?.into_iter().collect())
}

fn count_column(df: &DataFrame, name: &str) -> CohortResult<Vec<f64>> {
    Ok(float_column(df, name)?
        .into_iter()
        .map(|value| value.unwrap_or(0.0))
        .collect())
}

fn text_column(df: &DataFrame, name: &str) -> CohortResult<Vec<Option<String>>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_owned)
        })
        .collect())
}

fn optional_float_column(
    df: &DataFrame,
    name: &str,
    present: impl Fn(&str) -> bool,
) -> CohortResult<Option<Vec<Option<f64>>>> {
    if present(name) {
        float_column(df, name).map(Some)
    } else {
        Ok(None)
    }
}

fn optional_text_column(
    df: &DataFrame,
    name: &str,
    present: impl Fn(&str) -> bool,
) -> CohortResult<Option<Vec<Option<String>>>> {
    if present(name) {
        text_column(df, name).map(Some)
    } else {
        Ok(None)
    }
}
