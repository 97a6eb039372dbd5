//! damage-triage binary
//!
//! Analyzes one vehicle photo and prints the damage report.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use damage_triage::logging::{LogLevel, init_logging};
use damage_triage::{
    ClaimAssessment, ImageRef, OpenAIClient, OpenAIModel, ReportRequester, TriageConfig,
    TriageError, VehicleInfo,
};

#[derive(Parser, Debug)]
#[command(name = "damage-triage")]
#[command(version, about = "Request a structured vehicle damage report for an image")]
struct Args {
    /// Image URL (http, https or data:) or path to a local .jpg/.png/.gif/.webp file
    image: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Xml)]
    format: OutputFormat,

    /// Model to use (overrides DAMAGE_TRIAGE_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Request timeout in seconds (overrides DAMAGE_TRIAGE_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Vehicle model year
    #[arg(long)]
    year: Option<i32>,

    /// Vehicle make, e.g. Toyota
    #[arg(long)]
    make: Option<String>,

    /// Vehicle model, e.g. Camry
    #[arg(long = "vehicle-model")]
    vehicle_model: Option<String>,

    /// Odometer reading in miles
    #[arg(long)]
    mileage: Option<u64>,

    /// Policy deductible in USD; adds a claim assessment to JSON output
    #[arg(long)]
    deductible: Option<f64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// The model's text exactly as returned, without validation
    Raw,
    /// Validated report re-serialized as XML
    Xml,
    /// Validated report (and assessment) as JSON
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();
    init_logging(LogLevel::from_verbosity(args.verbose));

    match run(args).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error [{}]: {}", e.kind_name(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<String, TriageError> {
    let mut config = TriageConfig::from_env()?;
    if let Some(model) = &args.model {
        config.model = OpenAIModel::from_string(model.as_str());
    }
    if let Some(secs) = args.timeout_secs {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(TriageError::Configuration(format!(
                "--timeout-secs must be positive, got {}",
                secs
            )));
        }
        config.timeout = Some(Duration::from_secs_f64(secs));
    }

    let vehicle = VehicleInfo {
        year: args.year,
        make: args.make.clone(),
        model: args.vehicle_model.clone(),
        mileage: args.mileage,
    };
    let requester = ReportRequester::new(OpenAIClient::from_config(config)?)
        .with_vehicle(vehicle.clone());
    let image = ImageRef::resolve(&args.image).await?;

    if args.format == OutputFormat::Raw {
        return requester.request(&image).await;
    }

    let parsed = requester.analyze(&image).await?;
    for warning in &parsed.warnings {
        eprintln!("warning: {}", warning);
    }

    match args.format {
        OutputFormat::Json => {
            let value = match args.deductible {
                Some(deductible) => {
                    let assessment = ClaimAssessment::new(parsed.report, vehicle, deductible)?;
                    serde_json::json!({ "assessment": assessment, "warnings": parsed.warnings })
                }
                None => serde_json::json!({ "report": parsed.report, "warnings": parsed.warnings }),
            };
            Ok(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
        }
        _ => Ok(parsed.report.to_xml()),
    }
}
