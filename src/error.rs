//! Error types shared by the float engine and the solver.

extern crate alloc;

use alloc::string::String;
use core::fmt;
use thiserror::Error;

/// Names the part of a configuration that two operands disagree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Mantissa,
    Exponent,
    Dimension,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Mantissa => "mantissa length",
            Field::Exponent => "exponent length",
            Field::Dimension => "dimension",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("configuration mismatch: {field} differs ({lhs} vs {rhs})")]
    ConfigurationMismatch {
        field: Field,
        lhs: usize,
        rhs: usize,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    pub(crate) fn mismatch(field: Field, lhs: usize, rhs: usize) -> Self {
        Error::ConfigurationMismatch { field, lhs, rhs }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

#[test]
fn test_error_messages() {
    use alloc::string::ToString;
    let err = Error::mismatch(Field::Mantissa, 23, 52);
    assert_eq!(
        err.to_string(),
        "configuration mismatch: mantissa length differs (23 vs 52)"
    );
    let err = Error::InvalidConfiguration("exponent must be at least 2".into());
    assert!(err.to_string().starts_with("invalid configuration"));
}
