//! Upload file validation and loading

use std::path::Path;

use crate::error::ApiError;

/// Document formats the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
}

impl DocumentKind {
    /// Kind from the suffix after the last `.`, case-insensitive.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, suffix) = name.rsplit_once('.')?;
        match suffix.to_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::Txt),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Txt => "text/plain",
        }
    }
}

/// A validated file ready to be sent to the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ApiError> {
        let file_name = file_name.into();
        let kind = DocumentKind::from_file_name(&file_name)
            .ok_or_else(|| ApiError::UnsupportedFile(file_name.clone()))?;
        Ok(Self { file_name, kind, bytes })
    }

    /// Validate the suffix, then read the file. Nothing is read for a
    /// rejected kind.
    pub async fn from_path(path: &Path) -> Result<Self, ApiError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ApiError::UnsupportedFile(path.display().to_string()))?;

        let kind = DocumentKind::from_file_name(&file_name)
            .ok_or_else(|| ApiError::UnsupportedFile(file_name.clone()))?;

        let bytes = tokio::fs::read(path).await?;
        tracing::debug!(file = %file_name, size = bytes.len(), "loaded upload file");

        Ok(Self { file_name, kind, bytes })
    }
}
