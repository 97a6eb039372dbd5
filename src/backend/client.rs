use async_trait::async_trait;

use crate::backend::{GenerateResult, ImageRef};
use crate::error::Result;

/// A multimodal chat-completion endpoint.
///
/// [`ReportRequester`](crate::ReportRequester) talks to the network only
/// through this trait, so it can be driven by a canned implementation in tests.
///
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use damage_triage::{CompletionClient, ImageRef, OpenAIClient};
///
/// let client = OpenAIClient::from_env()?;
/// let image = ImageRef::from_url("https://example.com/car.jpeg")?;
/// let result = client.complete_with_image("Describe the damage.", &image).await?;
/// println!("{}", result.text);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one user message made of `prompt` and `image`, and return the text
    /// of the first response choice.
    ///
    /// Exactly one request is made. Failures map to
    /// [`TriageError::RequestFailed`](crate::TriageError::RequestFailed) or
    /// [`TriageError::Timeout`](crate::TriageError::Timeout).
    async fn complete_with_image(&self, prompt: &str, image: &ImageRef) -> Result<GenerateResult>;

    /// Identifier of the model requests are sent to.
    fn model_name(&self) -> &str;
}
