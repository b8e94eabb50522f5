use thiserror::Error;

/// Upload-time failures. Any of these rejects the whole file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV missing required headers: {}", .missing.join(", "))]
    HeaderMismatch { missing: Vec<String> },

    #[error("Data validation failed. {}", format_row_failures(.failures))]
    RowValidationFailure { failures: Vec<RowFailure> },
}

/// One offending field of one row. Rows are numbered from zero in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub row: usize,
    pub field: &'static str,
    pub reason: String,
}

fn format_row_failures(failures: &[RowFailure]) -> String {
    failures
        .iter()
        .map(|failure| {
            format!(
                "Row validation failed: {}.{} - {}",
                failure.row, failure.field, failure.reason
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Network error: {0}")]
    Http(String),

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Malformed classification response: {0}")]
    MalformedResponse(String),

    #[error("Classification timed out after {0} seconds")]
    Timeout(u64),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("An upload is already in progress")]
    UploadInProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_mismatch_lists_every_missing_column() {
        let err = IngestError::HeaderMismatch {
            missing: vec!["Device".to_string(), "Review Link".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "CSV missing required headers: Device, Review Link"
        );
    }

    #[test]
    fn row_failures_render_path_and_reason() {
        let err = IngestError::RowValidationFailure {
            failures: vec![
                RowFailure {
                    row: 0,
                    field: "date",
                    reason: "invalid date 'yesterday'".to_string(),
                },
                RowFailure {
                    row: 3,
                    field: "rating",
                    reason: "must be between 0 and 5".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Data validation failed. Row validation failed: 0.date - invalid date 'yesterday'; \
             Row validation failed: 3.rating - must be between 0 and 5"
        );
    }
}
