use crate::infra::{configured_engine, InMemorySessionRepository};
use appraisal::config::{AppConfig, ValuationConfig};
use appraisal::error::AppError;
use appraisal::valuation::{
    AdjustmentFactorKind, AggregationMethod, AppraisalService, AreaBreakdown,
    ComparableImporter, ComparableListing, CreateAppraisal, ParkingCategory, PropertyType,
    QualityGrade, SubjectProperty, ValuationReport, ValuationRequest, ValuationSession,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct AppraiseArgs {
    /// JSON file with the subject property and optional comparables
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// CSV export of comparable sales appended after the JSON comparables
    #[arg(long)]
    pub(crate) comparables_csv: Option<PathBuf>,
    /// Aggregation method (mean, weighted-mean, median)
    #[arg(long, value_parser = crate::infra::parse_method)]
    pub(crate) method: Option<AggregationMethod>,
    /// Negotiation discount percentage applied to every sale price
    #[arg(long)]
    pub(crate) discount: Option<f64>,
    /// Report date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the report as JSON instead of plain text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Aggregation method for the sample appraisal. Defaults to weighted-mean.
    #[arg(long, value_parser = crate::infra::parse_method)]
    pub(crate) method: Option<AggregationMethod>,
    /// Report date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Also print the stored appraisal as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_appraise(args: AppraiseArgs) -> Result<(), AppError> {
    let AppraiseArgs {
        input,
        comparables_csv,
        method,
        discount,
        today,
        json,
    } = args;

    let config = AppConfig::load()?;
    let raw = std::fs::read_to_string(&input)?;
    let request: ValuationRequest = serde_json::from_str(&raw)?;

    let mut session = appraisal_session(request, &config.valuation, discount, method)?;
    if let Some(path) = comparables_csv {
        let file = File::open(path)?;
        let imported = ComparableImporter::into_session(&mut session, file)?;
        tracing::debug!(count = imported.len(), "comparables imported from csv");
    }

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let report = session.report(today);
    print_report(&report, json)
}

/// Command-line overrides win over the request body, which wins over configuration.
fn appraisal_session(
    request: ValuationRequest,
    config: &ValuationConfig,
    discount: Option<f64>,
    method: Option<AggregationMethod>,
) -> Result<ValuationSession, AppError> {
    let ValuationRequest {
        subject,
        comparables,
        discount: requested_discount,
        method: requested_method,
    } = request;

    let mut session = ValuationSession::with_engine(
        subject,
        configured_engine(config),
        discount
            .or(requested_discount)
            .unwrap_or(config.default_discount),
        method.or(requested_method).unwrap_or(config.default_method),
    )?;
    for listing in comparables {
        session.add_comparable(listing)?;
    }
    Ok(session)
}

fn print_report(report: &ValuationReport, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for line in report.render_lines() {
            println!("{line}");
        }
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        method,
        today,
        json,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let config = ValuationConfig::default();
    let service = AppraisalService::new(
        Arc::new(InMemorySessionRepository::default()),
        configured_engine(&config),
        config.session_defaults(),
    );

    println!("Comparable-sales appraisal demo");
    let record = match service.create(CreateAppraisal {
        subject: demo_subject(),
        discount: None,
        method: Some(method.unwrap_or(AggregationMethod::WeightedMean)),
    }) {
        Ok(record) => record,
        Err(err) => {
            println!("  Appraisal rejected: {}", err);
            return Ok(());
        }
    };
    let appraisal_id = record.appraisal_id;
    println!("- Opened appraisal {}", appraisal_id.0);

    for listing in demo_comparables() {
        match service.add_comparable(&appraisal_id, listing) {
            Ok((comparable_id, record)) => println!(
                "- Added comparable {} ({} of {} required)",
                comparable_id,
                record.session.comparables().len(),
                appraisal::valuation::MINIMUM_COMPARABLES
            ),
            Err(err) => println!("  Comparable rejected: {}", err),
        }
    }

    let record = match service.advance(&appraisal_id) {
        Ok(record) => record,
        Err(err) => {
            println!("  Appraisal cannot advance: {}", err);
            return Ok(());
        }
    };

    println!();
    let view = record.view(today);
    print_report(&view.report, false)?;
    if json {
        println!("\n{}", serde_json::to_string_pretty(&view)?);
    }

    Ok(())
}

fn demo_subject() -> SubjectProperty {
    SubjectProperty {
        property_type: PropertyType::Apartment,
        address: "Av. Cabildo 2040, 7A".to_string(),
        locality: "CABA".to_string(),
        neighborhood: "Belgrano".to_string(),
        age_years: Some(18),
        quality: QualityGrade::Good,
        areas: AreaBreakdown {
            covered: 78.0,
            semi_covered: 6.0,
            uncovered: 0.0,
            balcony: 8.0,
            land: 0.0,
        },
        parking: ParkingCategory::Shared,
    }
}

fn demo_comparables() -> Vec<ComparableListing> {
    let mut closest = ComparableListing::new(168_000.0, AreaBreakdown::covered(80.0))
        .with_address("Juramento 2311, 5B")
        .with_factor(AdjustmentFactorKind::Condition, -3.0);
    closest.weight = 2.0;

    vec![
        closest,
        ComparableListing::new(
            189_000.0,
            AreaBreakdown {
                covered: 85.0,
                balcony: 6.0,
                ..AreaBreakdown::default()
            },
        )
        .with_address("Mendoza 2480, 9A")
        .with_factor(AdjustmentFactorKind::Location, 5.0)
        .with_factor(AdjustmentFactorKind::Amenities, -2.0),
        ComparableListing::new(145_000.0, AreaBreakdown::covered(72.0))
            .with_address("Olazábal 1950, 2C")
            .with_factor(AdjustmentFactorKind::Age, -6.0),
        ComparableListing::new(176_500.0, AreaBreakdown::covered(81.0))
            .with_address("Virrey del Pino 2600, 4D")
            .with_factor(AdjustmentFactorKind::Quality, 4.0)
            .with_factor(AdjustmentFactorKind::Layout, -1.5),
    ]
}
