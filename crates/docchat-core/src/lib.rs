pub mod api;
pub mod config;
pub mod conversation;
pub mod document;
pub mod error;
pub mod markup;
pub mod state;

// Re-export main types for convenience
pub use api::{ChatReply, DocChatClient, UploadResponse};
pub use config::Config;
pub use conversation::{Conversation, PendingSend, PendingUpload};
pub use document::{DocumentKind, UploadFile};
pub use error::ApiError;
pub use markup::{Block, Inline};
pub use state::{ChatMessage, ChatRole, MessageStore, Session};
