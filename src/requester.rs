use tracing::{debug, error, info, instrument, warn};

use crate::assessment::VehicleInfo;
use crate::backend::{CompletionClient, ImageRef};
use crate::error::Result;
use crate::prompt::build_prompt;
use crate::report::{ParsedReport, parse_report_with_warnings};

/// Asks a multimodal model for a damage report on one image.
///
/// Each call makes exactly one completion request; nothing is retried and no
/// state is kept between calls.
///
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use damage_triage::{ImageRef, OpenAIClient, ReportRequester};
///
/// let requester = ReportRequester::new(OpenAIClient::from_env()?);
/// let image = ImageRef::from_url("https://example.com/dented-door.jpeg")?;
/// let parsed = requester.analyze(&image).await?;
/// println!("{}", parsed.report.to_xml());
/// # Ok(())
/// # }
/// ```
pub struct ReportRequester<C> {
    client: C,
    vehicle: Option<VehicleInfo>,
}

impl<C: CompletionClient> ReportRequester<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            vehicle: None,
        }
    }

    /// Include vehicle details in the prompt so estimates account for the car.
    pub fn with_vehicle(mut self, vehicle: VehicleInfo) -> Self {
        self.vehicle = if vehicle.is_empty() { None } else { Some(vehicle) };
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// The prompt that accompanies every image.
    pub fn prompt(&self) -> String {
        build_prompt(self.vehicle.as_ref())
    }

    /// Request a report and return the model's raw text, unvalidated.
    #[instrument(
        name = "request_report",
        skip(self, image),
        fields(model = %self.client.model_name(), image = %image.describe())
    )]
    pub async fn request(&self, image: &ImageRef) -> Result<String> {
        let prompt = self.prompt();
        debug!(prompt_len = prompt.len(), "Built damage report prompt");

        let result = self.client.complete_with_image(&prompt, image).await?;
        if let Some(usage) = &result.usage {
            info!(
                model = %usage.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Damage report received"
            );
        } else {
            info!("Damage report received");
        }
        Ok(result.text)
    }

    /// Request a report and validate it.
    ///
    /// Warnings (such as a stated total that disagrees with the entries) are
    /// logged and returned; they never fail the call.
    #[instrument(
        name = "analyze_image",
        skip(self, image),
        fields(model = %self.client.model_name())
    )]
    pub async fn analyze(&self, image: &ImageRef) -> Result<ParsedReport> {
        let raw = self.request(image).await?;
        let parsed = parse_report_with_warnings(&raw).map_err(|e| {
            error!(error = %e, raw_len = raw.len(), "Model output is not a valid damage report");
            debug!(raw = %raw, "Rejected model output");
            e
        })?;

        for warning in &parsed.warnings {
            warn!(%warning, "Damage report check failed");
        }
        info!(
            entries = parsed.report.entries().len(),
            total_usd = parsed.report.total_estimated_cost_usd(),
            "Damage report validated"
        );
        Ok(parsed)
    }
}
