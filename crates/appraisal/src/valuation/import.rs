use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::domain::{AreaBreakdown, ComparableId, ComparableListing};
use super::error::ValuationError;
use super::session::ValuationSession;

#[derive(Debug)]
pub enum ComparableImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Valuation { row: usize, source: ValuationError },
}

impl std::fmt::Display for ComparableImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparableImportError::Io(err) => write!(f, "failed to read comparables file: {}", err),
            ComparableImportError::Csv(err) => write!(f, "invalid comparables CSV data: {}", err),
            ComparableImportError::Valuation { row, source } => {
                write!(f, "comparable on row {} rejected: {}", row, source)
            }
        }
    }
}

impl std::error::Error for ComparableImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ComparableImportError::Io(err) => Some(err),
            ComparableImportError::Csv(err) => Some(err),
            ComparableImportError::Valuation { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ComparableImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ComparableImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Bulk loader for comparable sales exported as CSV.
pub struct ComparableImporter;

impl ComparableImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<ComparableListing>, ComparableImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse and validate every row. Row numbers in errors count data rows from 1.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ComparableListing>, ComparableImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut listings = Vec::new();

        for (index, record) in csv_reader.deserialize::<ComparableRow>().enumerate() {
            let row = index + 1;
            let listing = record?
                .into_listing()
                .and_then(|listing| listing.validate().map(|_| listing))
                .map_err(|source| ComparableImportError::Valuation { row, source })?;
            listings.push(listing);
        }

        Ok(listings)
    }

    /// Parse `reader` and add every row to `session`. Nothing is added if any row fails.
    pub fn into_session<R: Read>(
        session: &mut ValuationSession,
        reader: R,
    ) -> Result<Vec<ComparableId>, ComparableImportError> {
        let listings = Self::from_reader(reader)?;
        let mut staged = session.clone();
        let mut ids = Vec::with_capacity(listings.len());

        for (index, listing) in listings.into_iter().enumerate() {
            let id = staged
                .add_comparable(listing)
                .map_err(|source| ComparableImportError::Valuation {
                    row: index + 1,
                    source,
                })?;
            ids.push(id);
        }

        *session = staged;
        Ok(ids)
    }
}

#[derive(Debug, Deserialize)]
struct ComparableRow {
    #[serde(rename = "Address", default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    #[serde(rename = "Sale Price")]
    sale_price: String,
    #[serde(rename = "Covered Area", default, deserialize_with = "empty_string_as_none")]
    covered_area: Option<String>,
    #[serde(rename = "Semi-Covered Area", default, deserialize_with = "empty_string_as_none")]
    semi_covered_area: Option<String>,
    #[serde(rename = "Uncovered Area", default, deserialize_with = "empty_string_as_none")]
    uncovered_area: Option<String>,
    #[serde(rename = "Balcony Area", default, deserialize_with = "empty_string_as_none")]
    balcony_area: Option<String>,
    #[serde(rename = "Land Area", default, deserialize_with = "empty_string_as_none")]
    land_area: Option<String>,
    #[serde(rename = "Sold On", default, deserialize_with = "empty_string_as_none")]
    sold_on: Option<String>,
    #[serde(rename = "Weight", default)]
    weight: Option<f64>,
}

impl ComparableRow {
    fn into_listing(self) -> Result<ComparableListing, ValuationError> {
        let sold_on = self
            .sold_on
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| {
                    ValuationError::invalid(
                        "sold_on",
                        format!("'{raw}' is not a YYYY-MM-DD date ({err})"),
                    )
                })
            })
            .transpose()?;

        let covered = match self.covered_area.as_deref() {
            Some(raw) => parse_area("covered_area", raw)?,
            None => {
                return Err(ValuationError::invalid(
                    "covered_area",
                    "covered area is required",
                ))
            }
        };

        let mut listing = ComparableListing::new(
            parse_amount(&self.sale_price)?,
            AreaBreakdown {
                covered,
                semi_covered: optional_area("semi_covered_area", self.semi_covered_area)?,
                uncovered: optional_area("uncovered_area", self.uncovered_area)?,
                balcony: optional_area("balcony_area", self.balcony_area)?,
                land: optional_area("land_area", self.land_area)?,
            },
        );
        listing.address = self.address.unwrap_or_default();
        listing.sold_on = sold_on;
        if let Some(weight) = self.weight {
            listing.weight = weight;
        }
        Ok(listing)
    }
}

/// Accept exported amounts such as `$ 125,000.00`.
fn parse_amount(raw: &str) -> Result<f64, ValuationError> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '$' | ',' | '_') && !ch.is_whitespace())
        .collect();
    cleaned.parse::<f64>().map_err(|_| {
        ValuationError::invalid("sale_price", format!("'{raw}' is not a numeric amount"))
    })
}

fn parse_area(field: &'static str, raw: &str) -> Result<f64, ValuationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ValuationError::invalid(field, format!("'{raw}' is not a numeric area")))
}

fn optional_area(field: &'static str, raw: Option<String>) -> Result<f64, ValuationError> {
    raw.as_deref()
        .map(|value| parse_area(field, value))
        .transpose()
        .map(|area| area.unwrap_or(0.0))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
