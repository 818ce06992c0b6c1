//! # covenant-runtime
//!
//! Opens the store, wires the engines from configuration, and runs the
//! periodic batch jobs on demand or on a schedule.

pub mod jobs;
pub mod runtime;
pub mod scheduler;

pub use jobs::{Job, JobSummary};
pub use runtime::{CovenantRuntime, RuntimeOptions};
pub use scheduler::{Scheduler, SchedulerHandle};
