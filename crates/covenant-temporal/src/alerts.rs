//! Alert lifecycle: active → acknowledged → resolved | dismissed.
//!
//! Transitions are optimistic: the store applies an update only while the
//! alert still carries the status it was read with. A lost race is retried
//! after a re-read, which surfaces either a legal follow-up transition or an
//! `InvalidTransition` against the winner's state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use covenant_core::constants::CONFLICT_RETRIES;
use covenant_core::errors::{CovenantError, CovenantResult, EntityKind};
use covenant_core::models::{AlertAction, AlertStatus, NewAlert, TemporalAlert};
use covenant_core::traits::IAlertStorage;
use covenant_core::validation::require_non_empty;

#[derive(Clone)]
pub struct AlertLifecycle {
    store: Arc<dyn IAlertStorage>,
}

impl AlertLifecycle {
    pub fn new(store: Arc<dyn IAlertStorage>) -> Self {
        Self { store }
    }

    /// Raise a new active alert.
    ///
    /// Returns `None` when an open alert with the same dedupe key already
    /// exists; the existing alert is left untouched.
    pub fn raise(
        &self,
        enterprise_id: &str,
        alert: NewAlert,
        now: DateTime<Utc>,
    ) -> CovenantResult<Option<TemporalAlert>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        require_non_empty("alert_type", &alert.alert_type)?;

        let row = TemporalAlert {
            id: Uuid::new_v4().to_string(),
            enterprise_id: enterprise_id.to_string(),
            contract_id: alert.contract_id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            status: AlertStatus::Active,
            triggered_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
            alert_data: alert.alert_data,
            dedupe_key: alert.dedupe_key,
        };

        if self.store.insert_alert(&row)? {
            info!(alert_id = %row.id, alert_type = %row.alert_type, severity = %row.severity, "alert raised");
            Ok(Some(row))
        } else {
            debug!(dedupe_key = ?row.dedupe_key, "open alert already exists; not raised");
            Ok(None)
        }
    }

    pub fn get(&self, enterprise_id: &str, alert_id: &str) -> CovenantResult<TemporalAlert> {
        self.store
            .get_alert(enterprise_id, alert_id)?
            .ok_or_else(|| CovenantError::not_found(EntityKind::Alert, alert_id))
    }

    pub fn acknowledge(
        &self,
        enterprise_id: &str,
        alert_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<TemporalAlert> {
        self.transition(enterprise_id, alert_id, AlertAction::Acknowledge, user_id, None, now)
    }

    /// Resolve with optional notes, kept under `resolution_notes` in `alert_data`.
    pub fn resolve(
        &self,
        enterprise_id: &str,
        alert_id: &str,
        user_id: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> CovenantResult<TemporalAlert> {
        self.transition(enterprise_id, alert_id, AlertAction::Resolve, user_id, notes, now)
    }

    pub fn dismiss(
        &self,
        enterprise_id: &str,
        alert_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> CovenantResult<TemporalAlert> {
        self.transition(enterprise_id, alert_id, AlertAction::Dismiss, user_id, None, now)
    }

    /// Active alerts, most recent first.
    pub fn list_active(
        &self,
        enterprise_id: &str,
        limit: usize,
    ) -> CovenantResult<Vec<TemporalAlert>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        self.store.list_active_alerts(enterprise_id, limit)
    }

    fn transition(
        &self,
        enterprise_id: &str,
        alert_id: &str,
        action: AlertAction,
        user_id: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> CovenantResult<TemporalAlert> {
        let _span = covenant_observability::alert_span!(alert_id, action).entered();
        require_non_empty("enterprise_id", enterprise_id)?;
        require_non_empty("user_id", user_id)?;

        let target = action.target();
        for attempt in 0..=CONFLICT_RETRIES {
            let current = self.get(enterprise_id, alert_id)?;
            if !current.status.can_transition_to(target) {
                return Err(CovenantError::InvalidTransition {
                    entity: EntityKind::Alert,
                    id: alert_id.to_string(),
                    from: current.status.to_string(),
                    to: target.to_string(),
                });
            }

            let updated = apply(current.clone(), action, user_id, notes, now);
            if self.store.update_alert_if_status(&updated, current.status)? {
                info!(from = %current.status, to = %target, "alert transitioned");
                return Ok(updated);
            }
            debug!(attempt, "alert changed concurrently; re-reading");
        }

        Err(CovenantError::conflict(
            EntityKind::Alert,
            alert_id,
            format!("status kept changing while applying {target}"),
        ))
    }
}

fn apply(
    mut alert: TemporalAlert,
    action: AlertAction,
    user_id: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> TemporalAlert {
    alert.status = action.target();
    match action {
        AlertAction::Acknowledge => {
            alert.acknowledged_at = Some(now);
            alert.acknowledged_by = Some(user_id.to_string());
        }
        AlertAction::Resolve | AlertAction::Dismiss => {
            alert.resolved_at = Some(now);
            alert.resolved_by = Some(user_id.to_string());
        }
    }
    if let Some(notes) = notes {
        alert.alert_data = with_notes(alert.alert_data, notes);
    }
    alert
}

fn with_notes(data: Value, notes: &str) -> Value {
    match data {
        Value::Object(mut map) => {
            map.insert("resolution_notes".to_string(), json!(notes));
            Value::Object(map)
        }
        Value::Null => json!({ "resolution_notes": notes }),
        other => json!({ "data": other, "resolution_notes": notes }),
    }
}
