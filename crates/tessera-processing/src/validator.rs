use std::path::Path;

use tessera_core::error::RejectionReason;
use tessera_core::TesseraConfig;

/// Validation errors for a single file
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Content type {content_type} does not match extension '{extension}' (expected one of: {expected})")]
    ContentTypeMismatch {
        content_type: String,
        extension: String,
        expected: String,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

impl ValidationError {
    /// The intake rejection reason reported to the user.
    pub fn reason(&self) -> RejectionReason {
        match self {
            ValidationError::FileTooLarge { .. } => RejectionReason::TooLarge,
            _ => RejectionReason::UnsupportedType,
        }
    }
}

/// Content types a known extension may legitimately carry.
fn expected_content_types(extension: &str) -> Option<&'static [&'static str]> {
    let expected: &'static [&'static str] = match extension {
        "jpg" | "jpeg" => &["image/jpeg"],
        "png" => &["image/png"],
        "gif" => &["image/gif"],
        "webp" => &["image/webp"],
        "pdf" => &["application/pdf"],
        "doc" => &["application/msword"],
        "docx" => &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
        _ => return None,
    };
    Some(expected)
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Admission rules for archive uploads.
///
/// Checks type before size, so a 20 MB `.exe` is reported as
/// `unsupported-type` rather than `too-large`.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl FileValidator {
    pub fn new(
        max_file_size: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    /// Image and document rules merged into one validator.
    pub fn from_config(config: &TesseraConfig) -> Self {
        let allowed_extensions = config
            .image_extensions
            .iter()
            .chain(config.document_extensions.iter())
            .cloned()
            .collect();
        Self::new(
            config.max_file_size_bytes,
            allowed_extensions,
            config.allowed_content_types(),
        )
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = extension_of(filename)
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }
        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.trim().to_lowercase();

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }
        Ok(())
    }

    /// Validate that the declared content type belongs to the file extension.
    ///
    /// Extensions outside the built-in table (added through configuration) are
    /// only checked individually.
    pub fn validate_extension_content_type_match(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let extension = extension_of(filename)
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;
        let normalized = content_type.trim().to_lowercase();

        let Some(expected) = expected_content_types(&extension) else {
            tracing::debug!(
                extension = %extension,
                content_type = %content_type,
                "Unknown extension, skipping content type cross-check"
            );
            return Ok(());
        };

        if !expected.iter().any(|ct| *ct == normalized) {
            return Err(ValidationError::ContentTypeMismatch {
                content_type: content_type.to_string(),
                extension,
                expected: expected.join(", "),
            });
        }
        Ok(())
    }

    /// Validate type membership, extension/type agreement, then size.
    pub fn validate(
        &self,
        filename: &str,
        content_type: &str,
        file_size: usize,
    ) -> Result<(), ValidationError> {
        self.validate_content_type(content_type)?;
        self.validate_extension(filename)?;
        self.validate_extension_content_type_match(filename, content_type)?;
        self.validate_file_size(file_size)?;
        Ok(())
    }
}
