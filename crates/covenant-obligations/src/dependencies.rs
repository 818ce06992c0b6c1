//! ObligationGraph: dependency edges, graph materialization, and
//! cascade-on-delay.
//!
//! The store is the source of truth; each operation rebuilds the
//! enterprise's `IndexedGraph` from the stored edges. The cycle check runs
//! twice: here, to report the offending path, and again inside the store's
//! insert transaction so two concurrent links cannot both pass on stale reads.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use covenant_core::config::ObligationConfig;
use covenant_core::constants::{CONFLICT_RETRIES, MAX_GRAPH_DEPTH};
use covenant_core::errors::{CovenantError, CovenantResult, EntityKind};
use covenant_core::models::{
    BatchReport, DependencyGraph, DependencyType, GraphEdge, GraphNode, Obligation,
    ObligationDependency, ObligationStatus,
};
use covenant_core::traits::{DependencyInsert, IDependencyStorage, IObligationStorage};
use covenant_core::validation::require_non_empty;

use crate::graph::cascade::cascade_targets;
use crate::graph::dag_enforcement::{format_path, would_create_cycle};
use crate::graph::traversal::{neighborhood, TraversalConfig};
use crate::graph::IndexedGraph;

pub struct ObligationGraph {
    obligations: Arc<dyn IObligationStorage>,
    dependencies: Arc<dyn IDependencyStorage>,
    config: ObligationConfig,
}

impl ObligationGraph {
    pub fn new(
        obligations: Arc<dyn IObligationStorage>,
        dependencies: Arc<dyn IDependencyStorage>,
        config: ObligationConfig,
    ) -> Self {
        Self {
            obligations,
            dependencies,
            config,
        }
    }

    /// Rebuild the enterprise's graph from the store.
    pub fn load(&self, enterprise_id: &str) -> CovenantResult<IndexedGraph> {
        let edges = self.dependencies.list_dependencies(enterprise_id)?;
        Ok(IndexedGraph::from_dependencies(&edges))
    }

    /// Record that `obligation_id` depends on `depends_on_id`.
    ///
    /// Fails with `Cycle` when `obligation_id` is already reachable from
    /// `depends_on_id`; the stored edge set is unchanged in that case.
    pub fn add_dependency(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
        depends_on_id: &str,
        dependency_type: DependencyType,
        cascade_on_delay: bool,
        now: DateTime<Utc>,
    ) -> CovenantResult<ObligationDependency> {
        let _span = covenant_observability::obligation_span!(obligation_id, "add_dependency")
            .entered();
        require_non_empty("enterprise_id", enterprise_id)?;
        self.require_obligation(enterprise_id, obligation_id)?;
        self.require_obligation(enterprise_id, depends_on_id)?;

        let dependency = ObligationDependency {
            id: Uuid::new_v4().to_string(),
            enterprise_id: enterprise_id.to_string(),
            obligation_id: obligation_id.to_string(),
            depends_on_id: depends_on_id.to_string(),
            dependency_type,
            cascade_on_delay,
            created_at: now,
        };

        for attempt in 0..=CONFLICT_RETRIES {
            let graph = self.load(enterprise_id)?;
            if let Some(path) = would_create_cycle(&graph, obligation_id, depends_on_id) {
                return Err(CovenantError::Cycle {
                    obligation_id: obligation_id.to_string(),
                    depends_on_id: depends_on_id.to_string(),
                    path: format_path(&path),
                });
            }

            match self.dependencies.insert_dependency_if_acyclic(&dependency)? {
                DependencyInsert::Inserted => {
                    info!(depends_on = %depends_on_id, cascade_on_delay, "dependency added");
                    return Ok(dependency);
                }
                DependencyInsert::Duplicate => {
                    return Err(CovenantError::ValidationError(format!(
                        "{obligation_id} already depends on {depends_on_id}"
                    )));
                }
                DependencyInsert::WouldCycle => {
                    debug!(attempt, "edge set changed since read; re-checking");
                }
            }
        }

        Err(CovenantError::conflict(
            EntityKind::Dependency,
            format!("{obligation_id} -> {depends_on_id}"),
            "dependency graph kept changing during the cycle check",
        ))
    }

    pub fn remove_dependency(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
        depends_on_id: &str,
    ) -> CovenantResult<()> {
        require_non_empty("enterprise_id", enterprise_id)?;
        if !self
            .dependencies
            .delete_dependency(enterprise_id, obligation_id, depends_on_id)?
        {
            return Err(CovenantError::not_found(
                EntityKind::Dependency,
                format!("{obligation_id} -> {depends_on_id}"),
            ));
        }
        info!(obligation_id, depends_on_id, "dependency removed");
        Ok(())
    }

    pub fn list_dependencies(&self, enterprise_id: &str) -> CovenantResult<Vec<ObligationDependency>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        self.dependencies.list_dependencies(enterprise_id)
    }

    /// Materialize the neighbourhood of `obligation_id`: its dependencies and
    /// dependents up to `depth` hops (default from config, capped at
    /// `MAX_GRAPH_DEPTH`) and at most `max_graph_nodes` nodes.
    pub fn build_graph(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
        depth: Option<usize>,
    ) -> CovenantResult<DependencyGraph> {
        let _span = covenant_observability::obligation_span!(obligation_id, "build_graph")
            .entered();
        require_non_empty("enterprise_id", enterprise_id)?;
        let root = self.require_obligation(enterprise_id, obligation_id)?;

        let config = TraversalConfig {
            max_depth: depth
                .unwrap_or(self.config.default_graph_depth)
                .min(MAX_GRAPH_DEPTH),
            max_nodes: self.config.max_graph_nodes,
        };
        let graph = self.load(enterprise_id)?;
        let walked = neighborhood(&graph, obligation_id, &config);

        let mut details: HashMap<String, Obligation> = self
            .obligations
            .list_obligations(enterprise_id, None)?
            .into_iter()
            .map(|o| (o.id.clone(), o))
            .collect();
        details.insert(root.id.clone(), root);

        let nodes = walked
            .nodes
            .into_iter()
            .map(|reached| {
                let detail = details.get(&reached.obligation_id).ok_or_else(|| {
                    CovenantError::not_found(EntityKind::Obligation, &reached.obligation_id)
                })?;
                Ok(GraphNode {
                    obligation_id: reached.obligation_id,
                    title: detail.title.clone(),
                    status: detail.status,
                    due_date: detail.due_date,
                    depth: reached.depth,
                    relation: reached.relation,
                })
            })
            .collect::<CovenantResult<Vec<_>>>()?;

        let edges = walked
            .edges
            .into_iter()
            .map(|(obligation_id, depends_on_id, weight)| GraphEdge {
                obligation_id,
                depends_on_id,
                dependency_type: weight.dependency_type,
                cascade_on_delay: weight.cascade_on_delay,
            })
            .collect();

        Ok(DependencyGraph {
            root_id: obligation_id.to_string(),
            nodes,
            edges,
            max_depth_reached: walked.max_depth_reached,
            truncated: walked.truncated,
        })
    }

    /// Flag every dependent reachable through `cascade_on_delay` edges as at
    /// risk. Statuses are left alone. Returns the dependents in BFS order.
    pub fn cascade_delay(
        &self,
        enterprise_id: &str,
        obligation_id: &str,
    ) -> CovenantResult<Vec<String>> {
        let _span = covenant_observability::obligation_span!(obligation_id, "cascade_delay")
            .entered();
        require_non_empty("enterprise_id", enterprise_id)?;
        self.require_obligation(enterprise_id, obligation_id)?;

        let graph = self.load(enterprise_id)?;
        let targets = cascade_targets(&graph, obligation_id);
        if !targets.is_empty() {
            let flagged = self.obligations.mark_at_risk(enterprise_id, &targets)?;
            info!(reached = targets.len(), flagged, "delay cascaded to dependents");
        }
        Ok(targets)
    }

    /// Cascade from every overdue obligation that still has unflagged
    /// dependents, so a cascade cut short by a store failure is finished by
    /// the next call.
    ///
    /// Items are the dependents flagged by this call; failures are keyed by
    /// the overdue obligation.
    pub fn resume_cascades(&self, enterprise_id: &str) -> CovenantResult<BatchReport<String>> {
        require_non_empty("enterprise_id", enterprise_id)?;
        let obligations = self.obligations.list_obligations(enterprise_id, None)?;
        let mut flagged: HashSet<String> = obligations
            .iter()
            .filter(|o| o.at_risk)
            .map(|o| o.id.clone())
            .collect();
        let graph = self.load(enterprise_id)?;

        let mut report = BatchReport::new();
        for overdue in obligations
            .iter()
            .filter(|o| o.status == ObligationStatus::Overdue)
        {
            let unflagged: Vec<String> = cascade_targets(&graph, &overdue.id)
                .into_iter()
                .filter(|id| !flagged.contains(id))
                .collect();
            if unflagged.is_empty() {
                continue;
            }
            match self.obligations.mark_at_risk(enterprise_id, &unflagged) {
                Ok(count) => {
                    info!(obligation_id = %overdue.id, flagged = count, "delay cascaded to dependents");
                    report.processed += 1;
                    flagged.extend(unflagged.iter().cloned());
                    report.items.extend(unflagged);
                }
                Err(e) => {
                    warn!(obligation_id = %overdue.id, error = %e, "delay cascade failed");
                    report.record_failure(overdue.id.clone(), e);
                }
            }
        }
        Ok(report)
    }

    fn require_obligation(&self, enterprise_id: &str, id: &str) -> CovenantResult<Obligation> {
        self.obligations
            .get_obligation(enterprise_id, id)?
            .ok_or_else(|| CovenantError::not_found(EntityKind::Obligation, id))
    }
}
