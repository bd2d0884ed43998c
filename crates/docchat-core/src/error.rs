pub const NO_SESSION_MESSAGE: &str = "Please upload a document first.";
pub const UNSUPPORTED_FILE_MESSAGE: &str = "Please upload a PDF, DOCX, or TXT file.";
pub const UPLOAD_FALLBACK_MESSAGE: &str = "Failed to upload document";
pub const CHAT_FALLBACK_MESSAGE: &str = "Failed to get response";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{}", NO_SESSION_MESSAGE)]
    NoSession,
    #[error("{}", UNSUPPORTED_FILE_MESSAGE)]
    UnsupportedFile(String),
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("A request is already in progress")]
    Busy,
    #[error("{detail}")]
    Api { status: u16, detail: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Request was interrupted: {0}")]
    Interrupted(String),
}
