use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Comparable, ComparableId, SubjectProperty};
use super::engine::{AggregationMethod, CompositionBreakdown};
use super::factors::AdjustmentFactorKind;
use super::session::{ValuationSession, MINIMUM_COMPARABLES};

/// One comparable as presented in a valuation report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparableRow {
    pub id: ComparableId,
    pub address: String,
    pub sale_price: f64,
    pub covered_area: f64,
    pub weight: f64,
    pub normalized_price: f64,
    pub factors: BTreeMap<AdjustmentFactorKind, f64>,
    pub total_adjustment: f64,
    pub adjusted_price: f64,
}

impl From<&Comparable> for ComparableRow {
    fn from(comparable: &Comparable) -> Self {
        Self {
            id: comparable.id,
            address: comparable.address.clone(),
            sale_price: comparable.sale_price,
            covered_area: comparable.areas.covered,
            weight: comparable.weight,
            normalized_price: comparable.normalized_price(),
            factors: comparable.factors().as_map().clone(),
            total_adjustment: comparable.total_adjustment(),
            adjusted_price: comparable.adjusted_price(),
        }
    }
}

/// Plain-data snapshot of a session handed to renderers and API callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationReport {
    pub prepared_on: NaiveDate,
    pub subject: SubjectProperty,
    pub discount: f64,
    pub method: AggregationMethod,
    pub method_label: &'static str,
    pub comparables: Vec<ComparableRow>,
    pub minimum_comparables: usize,
    pub quorum_met: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<CompositionBreakdown>,
}

impl ValuationReport {
    pub fn from_session(session: &ValuationSession, prepared_on: NaiveDate) -> Self {
        Self {
            prepared_on,
            subject: session.subject().clone(),
            discount: session.discount(),
            method: session.method(),
            method_label: session.method().label(),
            comparables: session.comparables().iter().map(ComparableRow::from).collect(),
            minimum_comparables: MINIMUM_COMPARABLES,
            quorum_met: session.has_quorum(),
            reference_price: session.reference_price(),
            composition: session.compose().ok(),
        }
    }

    pub fn total_value(&self) -> Option<f64> {
        self.composition.as_ref().map(|composition| composition.total)
    }

    /// Human-readable lines for terminal output.
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let subject = &self.subject;

        lines.push(format!("Appraisal prepared on {}", self.prepared_on));
        if !subject.address.is_empty() {
            let mut location = subject.address.clone();
            for part in [&subject.neighborhood, &subject.locality] {
                if !part.is_empty() {
                    location.push_str(", ");
                    location.push_str(part);
                }
            }
            lines.push(format!("Subject: {location}"));
        }
        lines.push(format!(
            "Negotiation discount: {:.2}% | Method: {}",
            self.discount, self.method_label
        ));

        lines.push(String::new());
        lines.push(format!("Comparables ({}):", self.comparables.len()));
        if self.comparables.is_empty() {
            lines.push("  (none)".to_string());
        }
        for row in &self.comparables {
            let label = if row.address.is_empty() {
                row.id.to_string()
            } else {
                format!("{} {}", row.id, row.address)
            };
            lines.push(format!(
                "  {label}: price {:.2} / {:.2} m² -> normalized {:.2}, adjustment {:+.2}%, adjusted {:.2}",
                row.sale_price,
                row.covered_area,
                row.normalized_price,
                row.total_adjustment,
                row.adjusted_price
            ));
        }
        if !self.quorum_met {
            lines.push(format!(
                "  ! at least {} comparables are required to complete the appraisal",
                self.minimum_comparables
            ));
        }

        lines.push(String::new());
        match self.reference_price {
            Some(price) => lines.push(format!("Reference price per m²: {price:.2}")),
            None => lines.push("Reference price per m²: not available".to_string()),
        }

        if let Some(composition) = &self.composition {
            lines.push("Composition:".to_string());
            for partial in &composition.partials {
                lines.push(format!(
                    "  {:<13} {:>9.2} m² x {:.2} = {:.2}",
                    partial.label, partial.area, partial.coefficient, partial.value
                ));
            }
            if composition.parking_addend > 0.0 {
                lines.push(format!(
                    "  {:<13} {:.2}",
                    composition.parking.label(),
                    composition.parking_addend
                ));
            }
            lines.push(format!("Total appraised value: {:.2}", composition.total));
        }

        lines
    }
}
