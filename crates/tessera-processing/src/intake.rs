use tessera_core::models::{AdmissionRejection, RawFile, UploadCandidate};
use tessera_core::TesseraConfig;

use crate::validator::FileValidator;

/// Result of admitting a list of raw files.
///
/// Both lists keep the order in which the files were submitted.
#[derive(Debug, Clone, Default)]
pub struct Admission {
    pub candidates: Vec<UploadCandidate>,
    pub rejected: Vec<AdmissionRejection>,
}

impl Admission {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Turns picked or dropped files into upload candidates.
#[derive(Debug, Clone)]
pub struct FileIntake {
    validator: FileValidator,
}

impl FileIntake {
    pub fn new(validator: FileValidator) -> Self {
        Self { validator }
    }

    pub fn from_config(config: &TesseraConfig) -> Self {
        Self::new(FileValidator::from_config(config))
    }

    /// Admit every file that passes validation; report the rest with their reason.
    pub fn admit(&self, files: Vec<RawFile>) -> Admission {
        let mut admission = Admission::default();

        for (index, file) in files.into_iter().enumerate() {
            match self
                .validator
                .validate(&file.name, &file.content_type, file.size())
            {
                Ok(()) => admission.candidates.push(UploadCandidate::new(file)),
                Err(e) => {
                    let reason = e.reason();
                    tracing::debug!(
                        file_name = %file.name,
                        content_type = %file.content_type,
                        size_bytes = file.size(),
                        reason = %reason,
                        error = %e,
                        "File rejected at intake"
                    );
                    admission.rejected.push(AdmissionRejection {
                        index,
                        size: file.size(),
                        file_name: file.name,
                        content_type: file.content_type,
                        reason,
                        detail: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            admitted = admission.candidates.len(),
            rejected = admission.rejected.len(),
            "Intake complete"
        );

        admission
    }
}
