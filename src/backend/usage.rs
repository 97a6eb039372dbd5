/// Token usage reported by the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUsage {
    /// The model that served the request
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(model: impl Into<String>, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            model: model.into(),
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens used (input + output)
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Raw completion text plus usage, when the provider reports it.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl GenerateResult {
    pub fn new(text: String, usage: Option<TokenUsage>) -> Self {
        Self { text, usage }
    }
}
