pub mod gemini;

pub use gemini::{GeminiClient, GenerationConfig, Part, EMPTY_INPUT_REPLY};

use anyhow::Result;
use async_trait::async_trait;

use crate::image::Image;

/// Something that turns an optional prompt and optional image into a reply.
///
/// Errors are returned unchanged to the caller; implementations must not
/// swallow transport or API failures.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn generate(&self, text: Option<&str>, image: Option<&Image>) -> Result<String>;
}
