//! # covenant-obligations
//!
//! Contract obligations: lifecycle and completion evidence, the acyclic
//! dependency graph with cascade-on-delay, and capped escalation.

pub mod dependencies;
pub mod engine;
pub mod escalation;
pub mod graph;
pub mod lifecycle;

pub use dependencies::ObligationGraph;
pub use engine::ObligationEngine;
pub use escalation::EscalationManager;
pub use lifecycle::ObligationLifecycle;
