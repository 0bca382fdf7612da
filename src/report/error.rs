use thiserror::Error;

/// Errors raised while writing report files.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for report output
pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_conversion() {
        let error: ReportError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(error, ReportError::Io(_)));
        assert!(error.to_string().starts_with("IO error"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<u32>("nope").unwrap_err();
        let error: ReportError = json_error.into();
        assert!(matches!(error, ReportError::Json(_)));
    }
}
