use appraisal::config::ValuationConfig;
use appraisal::valuation::{
    modify_in_place, AggregationMethod, AppraisalId, AppraisalRecord, FactorCatalog,
    RepositoryError, SessionRepository, ValuationEngine,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<AppraisalId, AppraisalRecord>>>,
}

impl InMemorySessionRepository {
    fn guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<AppraisalId, AppraisalRecord>>, RepositoryError>
    {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store lock poisoned".to_string()))
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, record: AppraisalRecord) -> Result<AppraisalRecord, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&record.appraisal_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.appraisal_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &AppraisalId) -> Result<Option<AppraisalRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard.get(id).cloned())
    }

    fn modify<T, E, F>(&self, id: &AppraisalId, apply: F) -> Result<(T, AppraisalRecord), E>
    where
        F: FnOnce(&mut AppraisalRecord) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.guard()?;
        modify_in_place(&mut guard, id, apply)
    }
}

/// Engine wired with the standard factor catalog and the configured parking rates.
pub(crate) fn configured_engine(config: &ValuationConfig) -> ValuationEngine {
    ValuationEngine::new(FactorCatalog::standard(), config.parking_rates)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_method(raw: &str) -> Result<AggregationMethod, String> {
    raw.parse::<AggregationMethod>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use appraisal::valuation::{AreaBreakdown, SubjectProperty, ValuationSession};

    fn record(id: &str) -> AppraisalRecord {
        let subject = SubjectProperty::new(AreaBreakdown::covered(60.0));
        AppraisalRecord {
            appraisal_id: AppraisalId(id.to_string()),
            created_on: NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date"),
            session: ValuationSession::new(subject).expect("valid subject"),
        }
    }

    #[test]
    fn repository_rejects_duplicate_and_unknown_records() {
        let repository = InMemorySessionRepository::default();
        repository.insert(record("apr-000010")).expect("first insert");

        assert!(matches!(
            repository.insert(record("apr-000010")),
            Err(RepositoryError::Conflict)
        ));
        let missing: Result<((), AppraisalRecord), RepositoryError> = repository.modify(
            &AppraisalId("apr-000011".to_string()),
            |_record: &mut AppraisalRecord| Ok(()),
        );
        assert!(matches!(missing, Err(RepositoryError::NotFound)));
        assert!(repository
            .fetch(&AppraisalId("apr-000010".to_string()))
            .expect("fetch")
            .is_some());
    }

    #[test]
    fn failed_modification_keeps_the_stored_record() {
        let repository = InMemorySessionRepository::default();
        let id = AppraisalId("apr-000020".to_string());
        repository.insert(record(&id.0)).expect("insert");

        let rejected: Result<((), AppraisalRecord), RepositoryError> =
            repository.modify(&id, |record: &mut AppraisalRecord| {
                record.session.set_discount(0.0).expect("valid discount");
                Err(RepositoryError::Unavailable("rejected".to_string()))
            });
        assert!(rejected.is_err());

        let stored = repository.fetch(&id).expect("fetch").expect("present");
        assert_eq!(stored.session.discount(), 10.0);

        let (_, updated) = repository
            .modify(&id, |record: &mut AppraisalRecord| {
                record.session.set_discount(5.0).map_err(|err| {
                    RepositoryError::Unavailable(err.to_string())
                })
            })
            .expect("modification stored");
        assert_eq!(updated.session.discount(), 5.0);
        assert_eq!(
            repository.fetch(&id).expect("fetch").expect("present").session.discount(),
            5.0
        );
    }

    #[test]
    fn parse_date_reports_the_raw_value() {
        assert_eq!(
            parse_date(" 2025-10-01 ").expect("valid"),
            NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date")
        );
        let err = parse_date("01/10/2025").expect_err("wrong format");
        assert!(err.contains("01/10/2025"));
    }

    #[test]
    fn parse_method_accepts_cli_spellings() {
        assert_eq!(
            parse_method("weighted-mean").expect("known"),
            AggregationMethod::WeightedMean
        );
        assert!(parse_method("mode").is_err());
    }
}
