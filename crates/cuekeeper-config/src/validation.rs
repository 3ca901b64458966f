//! Configuration validation

use crate::schema::RawConfig;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("tables.count must be at least 1")]
    NoTables,

    #[error("tables.ids and tables.count are mutually exclusive")]
    ConflictingTableSelection,

    #[error("Table ID cannot be empty")]
    EmptyTableId,

    #[error("Duplicate table ID: {0}")]
    DuplicateTableId(String),

    #[error("billing.default_rate must be a non-negative number, got {0}")]
    InvalidRate(f64),

    #[error("store.path cannot be empty")]
    EmptyStorePath,
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let tables = &config.tables;
    match (&tables.ids, tables.count) {
        (Some(_), Some(_)) => errors.push(ValidationError::ConflictingTableSelection),
        (Some(ids), None) => errors.extend(validate_ids(ids)),
        (None, Some(0)) => errors.push(ValidationError::NoTables),
        (None, _) => {}
    }

    if let Some(rate) = config.billing.default_rate
        && !(rate.is_finite() && rate >= 0.0)
    {
        errors.push(ValidationError::InvalidRate(rate));
    }

    if let Some(path) = &config.store.path
        && path.as_os_str().is_empty()
    {
        errors.push(ValidationError::EmptyStorePath);
    }

    errors
}

fn validate_ids(ids: &[String]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if ids.is_empty() {
        errors.push(ValidationError::NoTables);
    }

    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            errors.push(ValidationError::EmptyTableId);
        } else if !seen.insert(id.as_str()) {
            errors.push(ValidationError::DuplicateTableId(id.clone()));
        }
    }

    errors
}
