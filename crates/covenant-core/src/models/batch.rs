use serde::{Deserialize, Serialize};

/// One record a batch job skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Identifies the record (id, category, or index).
    pub item: String,
    pub error: String,
}

/// Outcome of a batch job that logs and continues past bad records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport<T> {
    pub items: Vec<T>,
    pub processed: usize,
    pub failures: Vec<BatchFailure>,
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            processed: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_success(&mut self, item: T) {
        self.processed += 1;
        self.items.push(item);
    }

    /// Count a record that was processed without producing an output item.
    pub fn record_noop(&mut self) {
        self.processed += 1;
    }

    pub fn record_failure(&mut self, item: impl Into<String>, error: impl ToString) {
        self.processed += 1;
        self.failures.push(BatchFailure {
            item: item.into(),
            error: error.to_string(),
        });
    }

    pub fn merge(&mut self, other: BatchReport<T>) {
        self.processed += other.processed;
        self.items.extend(other.items);
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self::new()
    }
}
