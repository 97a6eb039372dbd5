pub mod client;
pub mod media;
pub mod openai;
pub mod usage;
pub mod utils;

pub use client::CompletionClient;
pub use media::ImageRef;
pub use openai::{Model as OpenAIModel, OpenAIClient};
pub use usage::{GenerateResult, TokenUsage};
pub use utils::{check_response_status, handle_http_error};
