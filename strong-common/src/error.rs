//! Common error types for the converter

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal conditions of a conversion run
///
/// Field-level parse failures never show up here; they become absent values.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Header row lacks a column the grouping needs
    #[error("Missing required column in header: {0:?}")]
    MissingColumn(String),

    /// Record whose Date could not be parsed, so it has no workout key
    #[error("Row {row} (line {line}) has no parseable Date; it cannot be assigned to a workout")]
    MissingDate { row: usize, line: u64 },

    /// Output store exists and overwriting was not requested
    #[error("Output store already exists: {} (pass --force to replace it)", .0.display())]
    OutputExists(PathBuf),

    /// Invalid user input or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_date_names_row_and_line() {
        let err = Error::MissingDate { row: 3, line: 4 };
        let msg = err.to_string();
        assert!(msg.contains("Row 3"));
        assert!(msg.contains("line 4"));
    }

    #[test]
    fn test_output_exists_mentions_force() {
        let err = Error::OutputExists(PathBuf::from("/tmp/strong.db"));
        assert!(err.to_string().contains("/tmp/strong.db"));
        assert!(err.to_string().contains("--force"));
    }
}
