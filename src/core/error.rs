use thiserror::Error;

/// Upper bound accepted for any annual rate input (APR, return, growth).
pub const MAX_ANNUAL_RATE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must not be negative (got {value:.2})")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero (got {value:.2})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} accepts at most {max} entries (got {count})")]
    TooMany {
        field: &'static str,
        max: usize,
        count: usize,
    },
    #[error("{field} contains duplicate entry {value:?}")]
    Duplicate { field: &'static str, value: String },
    #[error("unknown asset class {0:?}")]
    UnknownAssetClass(String),
    #[error("predicted winner {0:?} does not name a profile")]
    UnknownProfile(String),
    #[error("{field}: {reason}")]
    Inconsistent { field: &'static str, reason: String },
}

pub(crate) fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite { field })
    }
}

pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(value)
}

pub(crate) fn positive(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(value)
}

pub(crate) fn in_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    finite(field, value)?;
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(value)
}

pub(crate) fn annual_rate(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    in_range(field, value, 0.0, MAX_ANNUAL_RATE)
}

pub(crate) fn count_in_range(
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<u32, ValidationError> {
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            min: min as f64,
            max: max as f64,
            value: value as f64,
        });
    }
    Ok(value)
}
