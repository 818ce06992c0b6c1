//! Input checks shared by every engine entry point.

use crate::errors::{CovenantError, CovenantResult};

pub fn require_non_empty(field: &str, value: &str) -> CovenantResult<()> {
    if value.trim().is_empty() {
        return Err(CovenantError::ValidationError(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

pub fn require_finite(field: &str, value: f64) -> CovenantResult<()> {
    if !value.is_finite() {
        return Err(CovenantError::ValidationError(format!(
            "{field} must be a finite number, got {value}"
        )));
    }
    Ok(())
}

/// Finite and within `[0, 1]`.
pub fn require_unit_interval(field: &str, value: f64) -> CovenantResult<()> {
    require_finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(CovenantError::ValidationError(format!(
            "{field} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}
