use std::path::PathBuf;
use tokio::task::JoinHandle;
use docchat_core::error::UNSUPPORTED_FILE_MESSAGE;
use docchat_core::{
    ApiError, ChatReply, Conversation, DocChatClient, PendingSend, UploadFile, UploadResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Typing a chat message
    Chat,
    /// Typing the path of a document to attach
    Attach,
}

/// The single request allowed in flight.
pub enum InFlight {
    Chat(PendingSend, JoinHandle<Result<ChatReply, ApiError>>),
    Upload(JoinHandle<Result<UploadResponse, ApiError>>),
}

impl InFlight {
    fn is_finished(&self) -> bool {
        match self {
            InFlight::Chat(_, handle) => handle.is_finished(),
            InFlight::Upload(handle) => handle.is_finished(),
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    pub conversation: Conversation,
    pub client: DocChatClient,
    pub in_flight: Option<InFlight>,

    // Message input
    pub input: String,
    pub input_cursor: usize,

    // Attach prompt
    pub attach_input: String,
    pub attach_cursor: usize,

    /// Blocking notice; all input except dismissal is ignored while shown.
    pub notice: Option<String>,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub follow_bottom: bool,

    pub animation_frame: u8,
}

impl App {
    pub fn new(client: DocChatClient) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Chat,

            conversation: Conversation::new(),
            client,
            in_flight: None,

            input: String::new(),
            input_cursor: 0,

            attach_input: String::new(),
            attach_cursor: 0,

            notice: None,

            chat_scroll: 0,
            chat_height: 0,
            follow_bottom: true,

            animation_frame: 0,
        }
    }

    /// Input is disabled while a request is outstanding.
    pub fn input_disabled(&self) -> bool {
        self.in_flight.is_some() || self.conversation.is_busy()
    }

    /// Submit the message box. Blank input and submissions while disabled
    /// are ignored.
    pub fn submit_message(&mut self) {
        if self.input.trim().is_empty() || self.input_disabled() {
            return;
        }

        let input = std::mem::take(&mut self.input);
        self.input_cursor = 0;

        let pending = match self.conversation.begin_send(&input) {
            Ok(pending) => pending,
            Err(err) => {
                tracing::debug!(error = %err, "send rejected locally");
                return;
            }
        };

        self.follow_bottom = true;

        let client = self.client.clone();
        let session_id = pending.session_id.clone();
        let text = pending.text.clone();
        let handle = tokio::spawn(async move { client.send_message(&session_id, &text).await });
        self.in_flight = Some(InFlight::Chat(pending, handle));
    }

    pub fn open_attach_prompt(&mut self) {
        if self.input_disabled() {
            return;
        }
        self.attach_input.clear();
        self.attach_cursor = 0;
        self.input_mode = InputMode::Attach;
    }

    pub fn close_attach_prompt(&mut self) {
        self.attach_input.clear();
        self.attach_cursor = 0;
        self.input_mode = InputMode::Chat;
    }

    /// Validate the typed path and start the upload. Rejected kinds and
    /// unreadable files raise the blocking notice instead.
    pub async fn submit_attachment(&mut self) {
        let raw = self.attach_input.trim().to_string();
        self.close_attach_prompt();

        if raw.is_empty() || self.input_disabled() {
            return;
        }

        let path = expand_home(&raw);
        match UploadFile::from_path(&path).await {
            Ok(file) => self.start_upload(file),
            Err(ApiError::UnsupportedFile(name)) => {
                tracing::info!(file = %name, "rejected upload file type");
                self.notice = Some(UNSUPPORTED_FILE_MESSAGE.to_string());
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not read upload file");
                self.notice = Some(format!("Could not read {}: {}", path.display(), err));
            }
        }
    }

    fn start_upload(&mut self, file: UploadFile) {
        let pending = match self.conversation.begin_upload(file) {
            Ok(pending) => pending,
            Err(err) => {
                tracing::debug!(error = %err, "upload rejected locally");
                return;
            }
        };

        let client = self.client.clone();
        let handle = tokio::spawn(async move {
            client
                .upload_document(&pending.file, pending.session_id.as_deref())
                .await
        });
        self.in_flight = Some(InFlight::Upload(handle));
    }

    /// Apply the in-flight request's result once it has completed.
    pub async fn poll_in_flight(&mut self) {
        if !self.in_flight.as_ref().is_some_and(InFlight::is_finished) {
            return;
        }

        match self.in_flight.take() {
            Some(InFlight::Chat(pending, handle)) => {
                let result = handle
                    .await
                    .unwrap_or_else(|e| Err(ApiError::Interrupted(e.to_string())));
                self.conversation.finish_send(&pending, result);
                self.follow_bottom = true;
            }
            Some(InFlight::Upload(handle)) => {
                let result = handle
                    .await
                    .unwrap_or_else(|e| Err(ApiError::Interrupted(e.to_string())));
                self.conversation.finish_upload(result);
                self.chat_scroll = 0;
                self.follow_bottom = true;
            }
            None => {}
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
    }

    /// Clamp the scroll offset to the rendered content height, pinning it to
    /// the bottom while following new messages.
    pub fn update_scroll(&mut self, total_lines: u16, visible_height: u16) {
        self.chat_height = visible_height;
        let max_scroll = total_lines.saturating_sub(visible_height);
        if self.follow_bottom || self.chat_scroll >= max_scroll {
            self.chat_scroll = max_scroll;
            self.follow_bottom = true;
        }
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(raw: &str) -> PathBuf {
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}
