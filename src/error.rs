// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error types for fairness metric computation

use thiserror::Error;

/// Failures raised by the metric functions.
///
/// Both variants are correctness checks, never transient faults: callers are
/// expected to abort the evaluation rather than substitute a default value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FairnessError {
    /// Shape or domain problem with the supplied arrays
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Statistically undefined result (empty group, zero range, missing class)
    #[error("degenerate input: {0}")]
    DegenerateInput(String),
}

impl FairnessError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateInput(msg.into())
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateInput(_))
    }
}

pub type Result<T> = std::result::Result<T, FairnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FairnessError::degenerate("protected group is empty");
        assert_eq!(err.to_string(), "degenerate input: protected group is empty");
        assert!(err.is_degenerate());

        let err = FairnessError::invalid("length mismatch");
        assert_eq!(err.to_string(), "invalid input: length mismatch");
        assert!(!err.is_degenerate());
    }

    #[test]
    fn test_converts_into_anyhow() {
        fn run() -> anyhow::Result<()> {
            Err::<(), _>(FairnessError::invalid("boom"))?;
            Ok(())
        }
        let err = run().unwrap_err();
        assert!(err.downcast_ref::<FairnessError>().is_some());
    }
}
