/// damage-triage: structured vehicle damage reports from a multimodal LLM
///
/// # Overview
///
/// Sends a photo of a vehicle to a vision-capable chat-completion endpoint,
/// asks for an XML damage report and validates the answer into typed Rust data.
///
/// - [`ReportRequester`] builds the prompt and makes the single network call
/// - [`parse_report`] is a pure, strict parser from text to [`DamageReport`]
/// - [`ClaimAssessment`] turns a report into a claim recommendation
///
/// # Quick Start
///
/// ```no_run
/// use damage_triage::{ImageRef, OpenAIClient, ReportRequester};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Reads OPENAI_API_KEY
///     let client = OpenAIClient::from_env()?;
///     let requester = ReportRequester::new(client);
///
///     let image = ImageRef::from_url("https://example.com/dented-door.jpeg")?;
///     let parsed = requester.analyze(&image).await?;
///
///     for entry in parsed.report.entries() {
///         println!("{} ({}): ${:.2}", entry.damage_type(), entry.severity(), entry.estimated_cost_usd());
///     }
///     Ok(())
/// }
/// ```
pub mod assessment;
mod backend;
pub mod config;
mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod prompt;
mod report;
mod requester;

// Re-exports for convenience
pub use assessment::{ClaimAssessment, RecommendedAction, VehicleInfo, estimate_vehicle_value};
pub use backend::{
    CompletionClient, GenerateResult, ImageRef, OpenAIClient, OpenAIModel, TokenUsage,
};
pub use config::TriageConfig;
pub use error::{RequestFailureKind, Result, TriageError};
pub use report::{
    DamageEntry, DamageReport, DamageType, ParsedReport, ReportWarning, Severity,
    TOTAL_TOLERANCE_USD, parse_report, parse_report_with_warnings,
};
pub use requester::ReportRequester;
