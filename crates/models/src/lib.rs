//! Model backends behind the capability-provider traits.
//!
//! - [`bedrock`]: Claude on AWS Bedrock as the
//!   [`PromptEngine`](stolink_core::providers::PromptEngine), Nova Canvas
//!   as the [`ImageGenerator`](stolink_core::providers::ImageGenerator).
//! - [`gemini`]: Gemini image model over REST as the
//!   [`ImageEditor`](stolink_core::providers::ImageEditor).
//!
//! Request and response shapes here are backend details; the workflow only
//! sees text, bytes, or a [`ProviderError`](stolink_core::providers::ProviderError).

pub mod bedrock;
pub mod gemini;

pub use bedrock::{BedrockConfig, BedrockPromptEngine, NovaCanvasGenerator};
pub use gemini::{GeminiConfig, GeminiImageEditor};
