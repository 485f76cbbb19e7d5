use std::path::Path;

use tessera_core::{AppError, ErrorMetadata, UploadError};
use tessera_services::TaskView;

/// Trimmed session id, or `missing-session` before any file or network I/O.
pub fn require_session(session: &str) -> Result<String, UploadError> {
    let session = session.trim();
    if session.is_empty() {
        return Err(UploadError::MissingSession);
    }
    Ok(session.to_string())
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Declared content type for a file on disk, from its extension.
///
/// Unknown extensions map to `application/octet-stream`, which intake rejects.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// One-line report for a failed command.
///
/// Errors that carry [`ErrorMetadata`] are shown by code, client message and
/// suggested action; anything else prints its context chain.
pub fn describe_error(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<UploadError>() {
        return describe(e);
    }
    if let Some(e) = err.downcast_ref::<AppError>() {
        return describe(e);
    }
    format!("{:#}", err)
}

fn describe(err: &impl ErrorMetadata) -> String {
    let mut line = format!("{}: {}", err.error_code(), err.client_message());
    if let Some(action) = err.suggested_action() {
        line.push_str(" (");
        line.push_str(action);
        line.push(')');
    }
    line
}

/// One status line per task for the terminal.
pub fn progress_line(view: &TaskView) -> String {
    let mut line = format!(
        "{:>3}% {:<11} {:<40} {:>10}",
        view.percent,
        view.label,
        truncate_string(&view.file_name, 40),
        view.size
    );
    if let Some(error) = &view.error {
        line.push_str("  ");
        line.push_str(error);
    }
    if let Some(action) = view.suggested_action {
        line.push_str(" (");
        line.push_str(action);
        line.push(')');
    }
    line
}

/// Initialize tracing for the CLI.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tessera=info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_services::StatusLabel;
    use uuid::Uuid;

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_multibyte() {
        assert_eq!(truncate_string("übungsplan-woche.pdf", 8), "übung...");
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for_path(Path::new("a/B.JPG")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("notes.pdf")), "application/pdf");
        assert_eq!(
            content_type_for_path(Path::new("setup.exe")),
            "application/octet-stream"
        );
        assert_eq!(
            content_type_for_path(Path::new("README")),
            "application/octet-stream"
        );
    }

    #[test]
    fn progress_line_includes_error() {
        let view = TaskView {
            task_id: Uuid::new_v4(),
            file_name: "plan.pdf".to_string(),
            bucket: "training-documents".to_string(),
            size: "1.5 KB".to_string(),
            caption: None,
            status: StatusLabel::Failed,
            label: "Failed".to_string(),
            percent: 30,
            error_code: Some("upload-error"),
            error: Some("Upload failed: timeout".to_string()),
            retryable: true,
            suggested_action: Some("Resubmit this file"),
        };
        let line = progress_line(&view);
        assert!(line.starts_with(" 30% Failed"));
        assert!(line.contains("plan.pdf"));
        assert!(line.ends_with("Upload failed: timeout (Resubmit this file)"));
    }

    #[test]
    fn describe_error_uses_metadata() {
        let err = anyhow::Error::new(UploadError::MissingSession);
        assert_eq!(
            describe_error(&err),
            "missing-session: Please select a training session (Select a training session)"
        );

        let err = anyhow::Error::new(AppError::InvalidInput("bad key".to_string()));
        assert_eq!(
            describe_error(&err),
            "INVALID_INPUT: bad key (Check the arguments and try again)"
        );

        let err = anyhow::anyhow!("disk full").context("Failed to write out.png");
        assert_eq!(describe_error(&err), "Failed to write out.png: disk full");
    }

    #[test]
    fn blank_session_is_rejected() {
        assert_eq!(require_session(""), Err(UploadError::MissingSession));
        assert_eq!(require_session("  \t"), Err(UploadError::MissingSession));
        assert_eq!(require_session(" session-7 ").unwrap(), "session-7");
    }
}
