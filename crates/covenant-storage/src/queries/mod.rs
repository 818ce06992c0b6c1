//! One module per table. Functions take a borrowed connection and never
//! open transactions themselves unless their name says so.

pub mod alert_ops;
pub mod anomaly_ops;
pub mod contract_ops;
pub mod dependency_ops;
pub mod enterprise_ops;
pub mod escalation_ops;
pub mod metric_ops;
pub mod obligation_ops;
pub mod pattern_ops;
pub mod renewal_ops;
