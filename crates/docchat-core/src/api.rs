use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::document::UploadFile;
use crate::error::{ApiError, CHAT_FALLBACK_MESSAGE, UPLOAD_FALLBACK_MESSAGE};

#[derive(Serialize)]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub doc_name: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

/// Client for the document chat service.
#[derive(Clone)]
pub struct DocChatClient {
    client: Client,
    base_url: String,
}

impl DocChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a document, reusing `session_id` when one exists.
    pub async fn upload_document(
        &self,
        file: &UploadFile,
        session_id: Option<&str>,
    ) -> Result<UploadResponse, ApiError> {
        let url = format!("{}/upload", self.base_url);

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.kind.mime_type())?;
        let mut form = Form::new().part("file", part);
        if let Some(id) = session_id {
            form = form.text("session_id", id.to_string());
        }

        tracing::info!(file = %file.file_name, size = file.bytes.len(), "uploading document");

        let response = self.client.post(&url).multipart(form).send().await?;
        let response = check_status(response, UPLOAD_FALLBACK_MESSAGE).await?;

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        tracing::info!(session = %upload.session_id, doc = %upload.doc_name, "document uploaded");
        Ok(upload)
    }

    /// Send one chat message for an existing session.
    pub async fn send_message(&self, session_id: &str, message: &str) -> Result<ChatReply, ApiError> {
        let url = format!("{}/chat", self.base_url);

        let request = ChatRequest { session_id, message };

        tracing::debug!(session = %session_id, len = message.len(), "sending chat message");

        let response = self.client.post(&url).json(&request).send().await?;
        let response = check_status(response, CHAT_FALLBACK_MESSAGE).await?;

        response
            .json::<ChatReply>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Whether the service answers its health check.
    pub async fn health(&self) -> Result<bool, ApiError> {
        let url = format!("{}/health", self.base_url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(health.status == "ok")
    }
}

/// Turn a non-2xx response into `ApiError::Api`, preferring the server's
/// `detail` string over `fallback`.
async fn check_status(response: Response, fallback: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| fallback.to_string());

    tracing::warn!(status = status.as_u16(), %detail, "request failed");

    Err(ApiError::Api {
        status: status.as_u16(),
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_file() -> UploadFile {
        UploadFile::new("handbook.txt", b"vacation policy".to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_upload_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(body_string_contains("name=\"file\"; filename=\"handbook.txt\""))
            .and(body_string_contains("vacation policy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session_id": "abc",
                "doc_name": "handbook.txt",
                "message": "Document processed successfully."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DocChatClient::new(&server.uri());
        let upload = client.upload_document(&sample_file(), None).await.unwrap();

        assert_eq!(upload.session_id, "abc");
        assert_eq!(upload.doc_name, "handbook.txt");
        assert_eq!(upload.message.as_deref(), Some("Document processed successfully."));
    }

    #[tokio::test]
    async fn test_upload_sends_existing_session_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(body_string_contains("name=\"session_id\""))
            .and(body_string_contains("existing-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session_id": "existing-session",
                "doc_name": "handbook.txt"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DocChatClient::new(&server.uri());
        let upload = client
            .upload_document(&sample_file(), Some("existing-session"))
            .await
            .unwrap();
        assert_eq!(upload.session_id, "existing-session");
        assert_eq!(upload.message, None);
    }

    #[tokio::test]
    async fn test_upload_error_uses_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "detail": "Error processing document: bad pdf"
            })))
            .mount(&server)
            .await;

        let client = DocChatClient::new(&server.uri());
        let err = client.upload_document(&sample_file(), None).await.unwrap_err();

        assert!(matches!(err, ApiError::Api { status: 500, .. }));
        assert_eq!(err.to_string(), "Error processing document: bad pdf");
    }

    #[tokio::test]
    async fn test_upload_error_without_detail_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = DocChatClient::new(&server.uri());
        let err = client.upload_document(&sample_file(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to upload document");
    }

    #[tokio::test]
    async fn test_send_message_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(serde_json::json!({
                "session_id": "abc",
                "message": "What is the policy?"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "**Ten** days.",
                "session_id": "abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DocChatClient::new(&format!("{}/", server.uri()));
        let reply = client.send_message("abc", "What is the policy?").await.unwrap();
        assert_eq!(reply.response, "**Ten** days.");
        assert_eq!(reply.session_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_send_message_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "detail": "Session not found. Please upload a document first."
            })))
            .mount(&server)
            .await;

        let client = DocChatClient::new(&server.uri());
        let err = client.send_message("gone", "hi").await.unwrap_err();
        assert!(matches!(err, ApiError::Api { status: 404, .. }));
        assert_eq!(err.to_string(), "Session not found. Please upload a document first.");
    }

    #[tokio::test]
    async fn test_send_message_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = DocChatClient::new(&server.uri());
        let err = client.send_message("abc", "hi").await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ok" })))
            .mount(&server)
            .await;

        let client = DocChatClient::new(&server.uri());
        assert!(client.health().await.unwrap());
    }
}
