use serde::{Deserialize, Serialize};

use super::super::domain::{AreaBreakdown, ParkingCategory};

pub const COVERED_COEFFICIENT: f64 = 1.0;
pub const SEMI_COVERED_COEFFICIENT: f64 = 0.5;
pub const UNCOVERED_COEFFICIENT: f64 = 0.2;
pub const BALCONY_COEFFICIENT: f64 = 0.33;

/// Area types that contribute to the composed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    Covered,
    SemiCovered,
    Uncovered,
    Balcony,
}

impl AreaKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Covered,
            Self::SemiCovered,
            Self::Uncovered,
            Self::Balcony,
        ]
    }

    /// Usable-value proportion relative to fully covered area.
    pub const fn coefficient(self) -> f64 {
        match self {
            AreaKind::Covered => COVERED_COEFFICIENT,
            AreaKind::SemiCovered => SEMI_COVERED_COEFFICIENT,
            AreaKind::Uncovered => UNCOVERED_COEFFICIENT,
            AreaKind::Balcony => BALCONY_COEFFICIENT,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AreaKind::Covered => "Covered",
            AreaKind::SemiCovered => "Semi-covered",
            AreaKind::Uncovered => "Uncovered",
            AreaKind::Balcony => "Balcony",
        }
    }

    fn area_of(self, areas: &AreaBreakdown) -> f64 {
        match self {
            AreaKind::Covered => areas.covered,
            AreaKind::SemiCovered => areas.semi_covered,
            AreaKind::Uncovered => areas.uncovered,
            AreaKind::Balcony => areas.balcony,
        }
    }
}

/// Flat amounts added to the total for parking, independent of area and price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParkingRates {
    pub private: f64,
    pub shared: f64,
}

impl ParkingRates {
    pub fn addend(&self, category: ParkingCategory) -> f64 {
        match category {
            ParkingCategory::None => 0.0,
            ParkingCategory::Shared => self.shared,
            ParkingCategory::Private => self.private,
        }
    }
}

impl Default for ParkingRates {
    fn default() -> Self {
        Self {
            private: 10_000.0,
            shared: 5_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaPartial {
    pub area_kind: AreaKind,
    pub label: &'static str,
    pub area: f64,
    pub coefficient: f64,
    pub value: f64,
}

/// Per-area-type partial values and the grand total for the subject property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionBreakdown {
    pub reference_price: f64,
    pub partials: Vec<AreaPartial>,
    pub parking: ParkingCategory,
    pub parking_addend: f64,
    pub total: f64,
}

impl CompositionBreakdown {
    pub fn partial(&self, kind: AreaKind) -> Option<f64> {
        self.partials
            .iter()
            .find(|partial| partial.area_kind == kind)
            .map(|partial| partial.value)
    }

    /// Area expressed in covered-equivalent units.
    pub fn homogenized_area(&self) -> f64 {
        self.partials
            .iter()
            .map(|partial| partial.area * partial.coefficient)
            .sum()
    }
}

/// Weight each area type by its coefficient, price it, and add the parking addend.
///
/// Areas are expected to be validated upstream; a zero reference price yields a zero area total.
pub fn compose_value(
    areas: &AreaBreakdown,
    parking: ParkingCategory,
    reference_price: f64,
    rates: &ParkingRates,
) -> CompositionBreakdown {
    let partials: Vec<AreaPartial> = AreaKind::ordered()
        .into_iter()
        .map(|kind| {
            let area = kind.area_of(areas);
            AreaPartial {
                area_kind: kind,
                label: kind.label(),
                area,
                coefficient: kind.coefficient(),
                value: area * kind.coefficient() * reference_price,
            }
        })
        .collect();

    let parking_addend = rates.addend(parking);
    let total = partials.iter().map(|partial| partial.value).sum::<f64>() + parking_addend;

    CompositionBreakdown {
        reference_price,
        partials,
        parking,
        parking_addend,
        total,
    }
}
