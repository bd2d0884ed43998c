//! Conversation controller
//!
//! Owns the session, the message store, the loading flags and the error
//! banner. Every request goes through a `begin_*` call that validates and
//! applies the optimistic state change, and a `finish_*` call that applies
//! the result. Only one request may be outstanding at a time.

use crate::api::{ChatReply, DocChatClient, UploadResponse};
use crate::document::UploadFile;
use crate::error::ApiError;
use crate::state::{ChatMessage, MessageStore, Session};

/// A chat send that passed local validation.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub message_id: String,
    pub session_id: String,
    pub text: String,
}

/// An upload that passed local validation.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file: UploadFile,
    pub session_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: MessageStore,
    session: Session,
    loading: bool,
    uploading: bool,
    error: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Waiting on a chat reply.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Waiting on an upload.
    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Input must be disabled while this is true.
    pub fn is_busy(&self) -> bool {
        self.loading || self.uploading
    }

    /// Validate `input` and append it as a user message.
    ///
    /// Without a session the banner is set and nothing else changes.
    pub fn begin_send(&mut self, input: &str) -> Result<PendingSend, ApiError> {
        if self.is_busy() {
            return Err(ApiError::Busy);
        }

        let text = input.trim();
        if text.is_empty() {
            return Err(ApiError::EmptyMessage);
        }

        let Some(session_id) = self.session.session_id.clone() else {
            let err = ApiError::NoSession;
            self.error = Some(err.to_string());
            return Err(err);
        };

        let message = ChatMessage::user(text);
        let pending = PendingSend {
            message_id: message.id.clone(),
            session_id,
            text: text.to_string(),
        };

        self.messages.push(message);
        self.loading = true;
        self.error = None;

        Ok(pending)
    }

    /// Apply the outcome of a send started with `begin_send`.
    pub fn finish_send(&mut self, pending: &PendingSend, result: Result<ChatReply, ApiError>) {
        self.loading = false;

        match result {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.response));
            }
            Err(err) => {
                tracing::error!(error = %err, "chat error");
                self.messages.remove(&pending.message_id);
                self.error = Some(err.to_string());
            }
        }
    }

    /// Start an upload of an already validated file.
    pub fn begin_upload(&mut self, file: UploadFile) -> Result<PendingUpload, ApiError> {
        if self.is_busy() {
            return Err(ApiError::Busy);
        }

        self.uploading = true;
        self.error = None;

        Ok(PendingUpload {
            file,
            session_id: self.session.session_id.clone(),
        })
    }

    /// Apply the outcome of an upload. A new document starts a fresh
    /// conversation; a failure leaves the session as it was.
    pub fn finish_upload(&mut self, result: Result<UploadResponse, ApiError>) {
        self.uploading = false;

        match result {
            Ok(upload) => {
                self.session.session_id = Some(upload.session_id);
                self.session.doc_name = Some(upload.doc_name);
                self.messages.clear();
            }
            Err(err) => {
                tracing::error!(error = %err, "upload error");
                self.error = Some(err.to_string());
            }
        }
    }

    /// Validate, send and apply the reply in one step.
    pub async fn send(&mut self, client: &DocChatClient, input: &str) -> Result<(), ApiError> {
        let pending = self.begin_send(input)?;
        let result = client.send_message(&pending.session_id, &pending.text).await;
        self.finish_send(&pending, result);
        Ok(())
    }

    /// Upload `file` and apply the result in one step.
    pub async fn upload(&mut self, client: &DocChatClient, file: UploadFile) -> Result<(), ApiError> {
        let pending = self.begin_upload(file)?;
        let result = client
            .upload_document(&pending.file, pending.session_id.as_deref())
            .await;
        self.finish_upload(result);
        Ok(())
    }
}
