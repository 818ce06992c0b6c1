//! Escalation levels per obligation: each escalation goes one level above
//! the highest so far, capped at `MAX_ESCALATION_LEVEL`. Levels never drop;
//! closing an escalation only changes its status.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use covenant_core::constants::{CONFLICT_RETRIES, MAX_ESCALATION_LEVEL, MIN_ESCALATION_LEVEL};
use covenant_core::errors::{CovenantError, CovenantResult, EntityKind};
use covenant_core::models::{EscalationStatus, ObligationEscalation};
use covenant_core::traits::{IEscalationStorage, IObligationStorage};
use covenant_core::validation::require_non_empty;

/// Level for the next escalation given the highest existing one (0 if none).
pub fn next_level(current_max: u8) -> u8 {
    current_max
        .saturating_add(1)
        .clamp(MIN_ESCALATION_LEVEL, MAX_ESCALATION_LEVEL)
}

pub struct EscalationManager {
    obligations: Arc<dyn IObligationStorage>,
    store: Arc<dyn IEscalationStorage>,
}

impl EscalationManager {
    pub fn new(obligations: Arc<dyn IObligationStorage>, store: Arc<dyn IEscalationStorage>) -> Self {
        Self { obligations, store }
    }

    /// Open a new escalation one level above the current maximum.
    ///
    /// The write only lands if no other escalation was recorded since the
    /// level was read; a lost race is retried once and then surfaces as
    /// `ConcurrencyConflict`.
    pub fn escalate(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
        escalated_to: &str,
        reason: &str,
        escalated_by: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<ObligationEscalation> {
        let _span = covenant_observability::obligation_span!(obligation_id, "escalate").entered();
        require_non_empty("enterprise_id", enterprise_id)?;
        require_non_empty("escalated_to", escalated_to)?;
        require_non_empty("reason", reason)?;
        require_non_empty("escalated_by", escalated_by)?;
        if self
            .obligations
            .get_obligation(enterprise_id, obligation_id)?
            .is_none()
        {
            return Err(CovenantError::not_found(EntityKind::Obligation, obligation_id));
        }

        for attempt in 0..=CONFLICT_RETRIES {
            let state = self.store.escalation_state(enterprise_id, obligation_id)?;
            let escalation = ObligationEscalation {
                id: Uuid::new_v4().to_string(),
                enterprise_id: enterprise_id.to_string(),
                obligation_id: obligation_id.to_string(),
                escalation_level: next_level(state.max_level),
                escalated_to: escalated_to.to_string(),
                escalated_by: escalated_by.to_string(),
                reason: reason.to_string(),
                status: EscalationStatus::Active,
                created_at: now,
                resolved_at: None,
            };

            if self
                .store
                .insert_escalation_if_unchanged(&escalation, state.count)?
            {
                info!(level = escalation.escalation_level, to = %escalated_to, "obligation escalated");
                return Ok(escalation);
            }
            debug!(attempt, "escalation recorded concurrently; re-reading level");
        }

        Err(CovenantError::conflict(
            EntityKind::Escalation,
            obligation_id,
            "escalation level kept changing",
        ))
    }

    pub fn get(&self, enterprise_id: &str, escalation_id: &str) -> CovenantResult<ObligationEscalation> {
        self.store
            .get_escalation(enterprise_id, escalation_id)?
            .ok_or_else(|| CovenantError::not_found(EntityKind::Escalation, escalation_id))
    }

    /// Close an active escalation. Its level is kept.
    pub fn resolve_escalation(
        &self,
        enterprise_id: &str,
        escalation_id: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<ObligationEscalation> {
        require_non_empty("enterprise_id", enterprise_id)?;
        let current = self.get(enterprise_id, escalation_id)?;
        if current.status != EscalationStatus::Active
            || !self
                .store
                .resolve_escalation_if_active(enterprise_id, escalation_id, now)?
        {
            return Err(CovenantError::InvalidTransition {
                entity: EntityKind::Escalation,
                id: escalation_id.to_string(),
                from: EscalationStatus::Resolved.to_string(),
                to: EscalationStatus::Resolved.to_string(),
            });
        }
        info!(escalation_id, level = current.escalation_level, "escalation resolved");
        Ok(ObligationEscalation {
            status: EscalationStatus::Resolved,
            resolved_at: Some(now),
            ..current
        })
    }

    /// Oldest first.
    pub fn list_escalations(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
    ) -> CovenantResult<Vec<ObligationEscalation>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        self.store.list_escalations(enterprise_id, obligation_id)
    }
}
