//! Obligation lifecycle: creation, status transitions, performance records
//! and evidence-checked completion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use covenant_core::constants::CONFLICT_RETRIES;
use covenant_core::errors::{CovenantError, CovenantResult, EntityKind};
use covenant_core::models::{
    CompletionData, NewObligation, Obligation, ObligationStatus, PerformanceInput,
    PerformanceRecord,
};
use covenant_core::traits::{CompletionOutcome, IObligationStorage};
use covenant_core::validation::{require_non_empty, require_unit_interval};

pub struct ObligationLifecycle {
    store: Arc<dyn IObligationStorage>,
}

impl ObligationLifecycle {
    pub fn new(store: Arc<dyn IObligationStorage>) -> Self {
        Self { store }
    }

    pub fn create(
        &self,
        enterprise_id: &str,
        input: NewObligation,
        now: DateTime<Utc>,
    ) -> CovenantResult<Obligation> {
        require_non_empty("enterprise_id", enterprise_id)?;
        require_non_empty("contract_id", &input.contract_id)?;
        require_non_empty("title", &input.title)?;
        require_non_empty("obligation_type", &input.obligation_type)?;

        let obligation = Obligation {
            id: Uuid::new_v4().to_string(),
            enterprise_id: enterprise_id.to_string(),
            contract_id: input.contract_id,
            title: input.title,
            obligation_type: input.obligation_type,
            status: ObligationStatus::Pending,
            priority: input.priority,
            due_date: input.due_date,
            frequency: input.frequency,
            responsible_party: input.responsible_party,
            completed_at: None,
            at_risk: false,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_obligation(&obligation)?;
        debug!(obligation_id = %obligation.id, "obligation created");
        Ok(obligation)
    }

    pub fn get(&self, enterprise_id: &str, obligation_id: &str) -> CovenantResult<Obligation> {
        self.store
            .get_obligation(enterprise_id, obligation_id)?
            .ok_or_else(|| CovenantError::not_found(EntityKind::Obligation, obligation_id))
    }

    /// Soonest due first, optionally filtered by status.
    pub fn list(
        &self,
        enterprise_id: &str,
        status: Option<ObligationStatus>,
    ) -> CovenantResult<Vec<Obligation>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        self.store.list_obligations(enterprise_id, status)
    }

    /// Move an obligation along the transition table. `Completed` is only
    /// reachable through [`complete`](Self::complete).
    pub fn update_status(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
        target: ObligationStatus,
        now: DateTime<Utc>,
    ) -> CovenantResult<Obligation> {
        let _span = covenant_observability::obligation_span!(obligation_id, "update_status")
            .entered();
        require_non_empty("enterprise_id", enterprise_id)?;
        if target == ObligationStatus::Completed {
            return Err(CovenantError::ValidationError(
                "completion requires performance evidence; use complete".to_string(),
            ));
        }

        for attempt in 0..=CONFLICT_RETRIES {
            let current = self.get(enterprise_id, obligation_id)?;
            if !current.status.can_transition_to(target) {
                return Err(invalid_transition(obligation_id, current.status, target));
            }
            if self.store.update_obligation_status_if(
                enterprise_id,
                obligation_id,
                current.status,
                target,
                now,
            )? {
                info!(from = %current.status, to = %target, "obligation status changed");
                return Ok(Obligation {
                    status: target,
                    updated_at: now,
                    ..current
                });
            }
            debug!(attempt, "obligation changed concurrently; re-reading");
        }

        Err(CovenantError::conflict(
            EntityKind::Obligation,
            obligation_id,
            format!("status kept changing while moving to {target}"),
        ))
    }

    /// Record how an obligation was performed. `on_time` is derived from the
    /// due date; undated obligations are always on time.
    pub fn record_performance(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
        input: PerformanceInput,
        now: DateTime<Utc>,
    ) -> CovenantResult<PerformanceRecord> {
        require_non_empty("enterprise_id", enterprise_id)?;
        let obligation = self.get(enterprise_id, obligation_id)?;
        let record = performance_record(&obligation, input, now)?;
        self.store.insert_performance(&record)?;
        debug!(obligation_id, on_time = record.on_time, "performance recorded");
        Ok(record)
    }

    pub fn list_performance(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
    ) -> CovenantResult<Vec<PerformanceRecord>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        self.store.list_performance(enterprise_id, obligation_id)
    }

    /// Mark an obligation completed.
    ///
    /// The inline performance record (if any) and the status change are
    /// written together. Fails with `ValidationError` when the obligation
    /// has no performance record at all.
    pub fn complete(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
        data: CompletionData,
        now: DateTime<Utc>,
    ) -> CovenantResult<Obligation> {
        let _span = covenant_observability::obligation_span!(obligation_id, "complete").entered();
        require_non_empty("enterprise_id", enterprise_id)?;
        require_non_empty("completed_by", &data.completed_by)?;
        let completed_at = data.completed_at.unwrap_or(now);

        let mut current = self.get(enterprise_id, obligation_id)?;
        let record = data
            .performance
            .map(|mut input| {
                if input.recorded_by.trim().is_empty() {
                    input.recorded_by = data.completed_by.clone();
                }
                performance_record(&current, input, completed_at)
            })
            .transpose()?;

        for attempt in 0..=CONFLICT_RETRIES {
            if attempt > 0 {
                current = self.get(enterprise_id, obligation_id)?;
            }
            if !current.status.can_complete() {
                return Err(invalid_transition(
                    obligation_id,
                    current.status,
                    ObligationStatus::Completed,
                ));
            }

            match self.store.complete_obligation_if(
                enterprise_id,
                obligation_id,
                current.status,
                completed_at,
                record.as_ref(),
            )? {
                CompletionOutcome::Completed => {
                    info!(from = %current.status, completed_by = %data.completed_by, "obligation completed");
                    return Ok(Obligation {
                        status: ObligationStatus::Completed,
                        completed_at: Some(completed_at),
                        updated_at: completed_at,
                        ..current
                    });
                }
                CompletionOutcome::MissingEvidence => {
                    return Err(CovenantError::ValidationError(format!(
                        "obligation {obligation_id} has no performance record; \
                         supply one with the completion"
                    )));
                }
                CompletionOutcome::StatusChanged => {
                    debug!(attempt, "obligation changed concurrently; re-reading");
                }
            }
        }

        Err(CovenantError::conflict(
            EntityKind::Obligation,
            obligation_id,
            "status kept changing while completing",
        ))
    }

    /// Pending or in-progress obligations whose due date has passed.
    pub fn list_past_due(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<Vec<Obligation>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        self.store.list_past_due(enterprise_id, now)
    }
}

fn performance_record(
    obligation: &Obligation,
    input: PerformanceInput,
    recorded_at: DateTime<Utc>,
) -> CovenantResult<PerformanceRecord> {
    require_non_empty("recorded_by", &input.recorded_by)?;
    if let Some(score) = input.quality_score {
        require_unit_interval("quality_score", score)?;
    }
    Ok(PerformanceRecord {
        id: Uuid::new_v4().to_string(),
        enterprise_id: obligation.enterprise_id.clone(),
        obligation_id: obligation.id.clone(),
        recorded_at,
        recorded_by: input.recorded_by,
        quality_score: input.quality_score,
        on_time: obligation.due_date.map_or(true, |due| recorded_at <= due),
        notes: input.notes,
        evidence: input.evidence,
    })
}

fn invalid_transition(id: &str, from: ObligationStatus, to: ObligationStatus) -> CovenantError {
    CovenantError::InvalidTransition {
        entity: EntityKind::Obligation,
        id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use covenant_core::models::{ObligationFrequency, ObligationPriority};

    fn obligation(due: Option<DateTime<Utc>>) -> Obligation {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Obligation {
            id: "obl-1".to_string(),
            enterprise_id: "ent".to_string(),
            contract_id: "c".to_string(),
            title: "Deliver report".to_string(),
            obligation_type: "reporting".to_string(),
            status: ObligationStatus::Pending,
            priority: ObligationPriority::Medium,
            due_date: due,
            frequency: ObligationFrequency::OneTime,
            responsible_party: None,
            completed_at: None,
            at_risk: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn input(score: Option<f64>) -> PerformanceInput {
        PerformanceInput {
            recorded_by: "auditor".to_string(),
            quality_score: score,
            ..Default::default()
        }
    }

    #[test]
    fn on_time_follows_due_date() {
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();

        assert!(performance_record(&obligation(Some(due)), input(None), early).unwrap().on_time);
        assert!(!performance_record(&obligation(Some(due)), input(None), late).unwrap().on_time);
        assert!(performance_record(&obligation(None), input(None), late).unwrap().on_time);
    }

    #[test]
    fn quality_score_must_be_a_fraction() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let err = performance_record(&obligation(None), input(Some(1.5)), now).unwrap_err();
        assert!(matches!(err, CovenantError::ValidationError(_)));
    }
}
