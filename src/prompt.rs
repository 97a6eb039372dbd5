//! Instruction prompt sent alongside the image.

use crate::assessment::VehicleInfo;

/// The XML contract the model is asked to follow; [`parse_report`](crate::parse_report)
/// enforces it.
pub const REPORT_SCHEMA: &str = r#"<damageReport>
  <damage type="Scratch" severity="Minor|Moderate|Severe" location="Front Bumper|Door|Hood|etc" estimatedCostUSD="..."/>
  <damage type="Dent" severity="Minor|Moderate|Severe" location="Front Bumper|Door|Hood|etc" estimatedCostUSD="..."/>
  <!-- one <damage> element per detected damage -->
  <totalEstimatedCostUSD>...</totalEstimatedCostUSD>
  <notes>...</notes>
</damageReport>"#;

const INSTRUCTIONS: &str = "You are an insurance claims AI. Analyze the attached image \
and detect any scratches, dents, broken lamps, shattered glass, or flat tires.
For each damage you see, output one <damage> element in EXACTLY the XML schema below. \
Use type values Scratch, Dent, BrokenLamp, ShatteredGlass or FlatTire where they apply.
Realistically and pessimistically estimate the USD cost to repair each damage as a plain \
decimal number (no currency symbol, no thousands separator), and set totalEstimatedCostUSD \
to the sum of those estimates.";

const OUTPUT_RULE: &str = "Do NOT output anything but valid XML, with no markdown fences \
and no text before or after it, matching this schema:";

/// Build the full prompt, optionally tailored to a specific vehicle.
pub fn build_prompt(vehicle: Option<&VehicleInfo>) -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    prompt.push('\n');
    if let Some(line) = vehicle.and_then(vehicle_line) {
        prompt.push_str(&line);
        prompt.push('\n');
    }
    prompt.push_str(OUTPUT_RULE);
    prompt.push_str("\n\n");
    prompt.push_str(REPORT_SCHEMA);
    prompt.push_str("\n\nHere is the image:\n");
    prompt
}

fn vehicle_line(vehicle: &VehicleInfo) -> Option<String> {
    let description = vehicle.description();
    if description.is_empty() {
        None
    } else {
        Some(format!(
            "Consider that the vehicle is a {} when estimating costs.",
            description
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_schema() {
        let prompt = build_prompt(None);
        assert!(prompt.contains(REPORT_SCHEMA));
        assert!(prompt.contains("Do NOT output anything but valid XML"));
        assert!(!prompt.contains("Consider that the vehicle"));
    }

    #[test]
    fn test_prompt_mentions_vehicle() {
        let vehicle = VehicleInfo {
            year: Some(2019),
            make: Some("Toyota".to_string()),
            model: Some("Camry".to_string()),
            mileage: None,
        };
        let prompt = build_prompt(Some(&vehicle));
        assert!(prompt.contains("the vehicle is a 2019 Toyota Camry"));
    }

    #[test]
    fn test_prompt_skips_empty_vehicle() {
        let prompt = build_prompt(Some(&VehicleInfo::default()));
        assert!(!prompt.contains("Consider that the vehicle"));
    }
}
