//! User-facing error message formatting.
//!
//! Uses typed error matching (FetchError and PolarsError variants,
//! io::ErrorKind) rather than string parsing to produce short, actionable
//! status messages.

use crate::fetch::FetchError;
use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

/// Status text for a failed fetch.
pub fn user_message_from_fetch(err: &FetchError) -> String {
    match err {
        FetchError::Network(msg) => format!(
            "Could not reach the metadata service. Check your connection: {}",
            msg
        ),
        FetchError::Service { status, message } => {
            format!("Metadata service error ({}): {}", status, message)
        }
        FetchError::UnknownProject(id) => {
            format!("Project {} was not found. Check the identifier.", id)
        }
        FetchError::EmptyResult(id) => format!("Project {} has no sequencing runs.", id),
        FetchError::Parse(msg) => format!("The service returned unreadable metadata: {}", msg),
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::Duplicate(msg) => format!("Duplicate column: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::ComputeError(msg) => msg.to_string(),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check write access.".to_string(),
        ErrorKind::AlreadyExists => "File already exists.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("No space left") || msg.contains("space left") {
                return "No space left on device. Free up disk space and try again.".to_string();
            }
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return if context.is_some() {
                format!("I/O error: {}", msg)
            } else {
                msg
            };
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find a FetchError, PolarsError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let with_path = |msg: String| match path {
        Some(p) => format!("Failed to write {}: {}", p.display(), msg),
        None => msg,
    };
    for cause in report.chain() {
        if let Some(fe) = cause.downcast_ref::<FetchError>() {
            return user_message_from_fetch(fe);
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return with_path(user_message_from_polars(pe));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return with_path(user_message_from_io(io_err, None));
        }
    }

    // Fallback: use first line of display to avoid long tracebacks
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred");
    with_path(first_line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.contains("not found"),
            "expected 'not found', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_from_io_permission_denied() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied");
        let msg = user_message_from_io(&err, None);
        assert!(msg.to_lowercase().contains("permission"), "got: {}", msg);
    }

    #[test]
    fn test_user_message_from_fetch() {
        let msg = user_message_from_fetch(&FetchError::UnknownProject("PRJNA0".into()));
        assert!(msg.contains("PRJNA0"), "got: {}", msg);
        let msg = user_message_from_fetch(&FetchError::EmptyResult("PRJNA1".into()));
        assert!(msg.contains("no sequencing runs"), "got: {}", msg);
    }

    #[test]
    fn test_user_message_from_report_finds_fetch_error() {
        let report = color_eyre::eyre::Report::new(FetchError::Network("timed out".into()));
        let msg = user_message_from_report(&report, None);
        assert!(msg.contains("timed out"), "got: {}", msg);
    }

    #[test]
    fn test_user_message_from_report_io_with_path() {
        let report = color_eyre::eyre::Report::new(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let msg = user_message_from_report(&report, Some(Path::new("/x/out.csv")));
        assert!(msg.starts_with("Failed to write /x/out.csv"), "got: {}", msg);
    }
}
