//! ObligationEngine: lifecycle, dependency graph and escalation over one store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use covenant_core::config::CovenantConfig;
use covenant_core::errors::CovenantResult;
use covenant_core::models::{BatchReport, Obligation, ObligationStatus};
use covenant_core::traits::{IDependencyStorage, IEscalationStorage, IObligationStorage};

use crate::dependencies::ObligationGraph;
use crate::escalation::EscalationManager;
use crate::lifecycle::ObligationLifecycle;

pub struct ObligationEngine {
    pub lifecycle: ObligationLifecycle,
    pub graph: ObligationGraph,
    pub escalations: EscalationManager,
}

impl ObligationEngine {
    pub fn new<S>(store: Arc<S>, config: &CovenantConfig) -> Self
    where
        S: IObligationStorage + IDependencyStorage + IEscalationStorage + 'static,
    {
        let obligations: Arc<dyn IObligationStorage> = store.clone();
        Self {
            lifecycle: ObligationLifecycle::new(obligations.clone()),
            graph: ObligationGraph::new(obligations.clone(), store.clone(), config.obligations.clone()),
            escalations: EscalationManager::new(obligations, store),
        }
    }

    /// Mark every pending or in-progress obligation past its due date as
    /// overdue, then cascade the delay to dependents of every overdue
    /// obligation not yet flagged.
    ///
    /// Items are the obligations moved to overdue. Cascade failures are
    /// reported against the overdue obligation and retried by the next
    /// sweep; re-running is otherwise a no-op.
    pub fn sweep_overdue(
        &self,
        enterprise_id: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<BatchReport<Obligation>> {
        let mut report = BatchReport::new();
        for obligation in self.lifecycle.list_past_due(enterprise_id, now)? {
            match self.lifecycle.update_status(
                enterprise_id,
                &obligation.id,
                ObligationStatus::Overdue,
                now,
            ) {
                Ok(marked) => report.record_success(marked),
                Err(e) => {
                    warn!(obligation_id = %obligation.id, error = %e, "overdue sweep skipped obligation");
                    report.record_failure(obligation.id, e);
                }
            }
        }

        let at_risk = match self.graph.resume_cascades(enterprise_id) {
            Ok(cascades) => {
                report.failures.extend(cascades.failures);
                cascades.items.len()
            }
            Err(e) => {
                warn!(error = %e, "delay cascade pass failed");
                report.record_failure("cascade_delay", e);
                0
            }
        };
        info!(
            overdue = report.items.len(),
            at_risk,
            failed = report.failures.len(),
            "overdue sweep finished"
        );
        Ok(report)
    }
}
