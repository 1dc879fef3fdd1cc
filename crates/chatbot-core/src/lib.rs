pub mod ai;
pub mod chat;
pub mod config;
pub mod export;
pub mod image;
pub mod language;
pub mod router;
pub mod session;
pub mod state;
pub mod users;

// Re-export main types for convenience
pub use ai::{GeminiClient, GenerationConfig, Responder};
pub use chat::ChatEngine;
pub use config::Config;
pub use image::Image;
pub use language::{detect_language, Translator};
pub use router::{Route, Router};
pub use session::{Page, Session, TurnOutcome, TurnRequest};
pub use state::{ChatMessage, ChatRole};
pub use users::{AuthError, UserStore};
