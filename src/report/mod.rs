//! Damage report data model.
//!
//! A [`DamageReport`] is built once per analyzed image, normally by
//! [`parse_report`], and is read-only afterwards.

mod parser;

use std::fmt;
use std::str::FromStr;

use quick_xml::escape::escape;
use serde::Serialize;

use crate::error::{Result, TriageError};

pub use parser::{parse_report, parse_report_with_warnings};

/// Largest difference between the stated and computed totals that still
/// counts as equal (half a cent).
pub const TOTAL_TOLERANCE_USD: f64 = 0.005;

/// How bad a single piece of damage is.
///
/// Parsing is case-sensitive: only `Minor`, `Moderate` and `Severe` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "Minor",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
        }
    }
}

impl FromStr for Severity {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Minor" => Ok(Severity::Minor),
            "Moderate" => Ok(Severity::Moderate),
            "Severe" => Ok(Severity::Severe),
            other => Err(TriageError::SchemaViolation(format!(
                "severity must be one of Minor, Moderate, Severe; got {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of damage detected.
///
/// The prompt suggests a fixed set of labels, but the model may answer with
/// anything; unknown labels are kept verbatim in `Other`.
///
/// ```rust
/// use damage_triage::DamageType;
///
/// assert_eq!(DamageType::from_string("Dent"), DamageType::Dent);
/// assert_eq!(
///     DamageType::from_string("Bent Rim"),
///     DamageType::Other("Bent Rim".to_string())
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum DamageType {
    Scratch,
    Dent,
    BrokenLamp,
    ShatteredGlass,
    FlatTire,
    Other(String),
}

impl DamageType {
    pub fn as_str(&self) -> &str {
        match self {
            DamageType::Scratch => "Scratch",
            DamageType::Dent => "Dent",
            DamageType::BrokenLamp => "BrokenLamp",
            DamageType::ShatteredGlass => "ShatteredGlass",
            DamageType::FlatTire => "FlatTire",
            DamageType::Other(label) => label,
        }
    }

    /// Create a damage type from a label. Always succeeds.
    pub fn from_string(label: impl Into<String>) -> Self {
        let label = label.into();
        match label.as_str() {
            "Scratch" => DamageType::Scratch,
            "Dent" => DamageType::Dent,
            "BrokenLamp" => DamageType::BrokenLamp,
            "ShatteredGlass" => DamageType::ShatteredGlass,
            "FlatTire" => DamageType::FlatTire,
            _ => DamageType::Other(label),
        }
    }
}

impl From<&str> for DamageType {
    fn from(s: &str) -> Self {
        DamageType::from_string(s)
    }
}

impl From<DamageType> for String {
    fn from(t: DamageType) -> Self {
        match t {
            DamageType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<damage>` element of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageEntry {
    #[serde(rename = "type")]
    damage_type: DamageType,
    severity: Severity,
    #[serde(rename = "estimatedCostUSD")]
    estimated_cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

impl DamageEntry {
    /// Create an entry, rejecting empty labels and negative or non-finite costs.
    pub fn new(
        damage_type: impl Into<DamageType>,
        severity: Severity,
        estimated_cost_usd: f64,
    ) -> Result<Self> {
        let damage_type = damage_type.into();
        if damage_type.as_str().trim().is_empty() {
            return Err(TriageError::SchemaViolation(
                "damage type cannot be empty".to_string(),
            ));
        }
        check_cost(estimated_cost_usd, "estimatedCostUSD")?;
        Ok(Self {
            damage_type,
            severity,
            estimated_cost_usd,
            location: None,
        })
    }

    /// Attach where on the vehicle the damage is.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        let location = location.into();
        self.location = if location.trim().is_empty() {
            None
        } else {
            Some(location)
        };
        self
    }

    pub fn damage_type(&self) -> &DamageType {
        &self.damage_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn estimated_cost_usd(&self) -> f64 {
        self.estimated_cost_usd
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

/// A validated damage report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageReport {
    #[serde(rename = "damages")]
    entries: Vec<DamageEntry>,
    #[serde(rename = "totalEstimatedCostUSD")]
    total_estimated_cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl DamageReport {
    /// Assemble a report. At least one entry is required and the total must be
    /// a non-negative amount; the total is taken as stated, see [`check_total`](Self::check_total).
    pub fn new(
        entries: Vec<DamageEntry>,
        total_estimated_cost_usd: f64,
        notes: Option<String>,
    ) -> Result<Self> {
        if entries.is_empty() {
            return Err(TriageError::SchemaViolation(
                "damageReport must contain at least one <damage> element".to_string(),
            ));
        }
        check_cost(total_estimated_cost_usd, "totalEstimatedCostUSD")?;
        let notes = notes.filter(|n| !n.trim().is_empty());
        Ok(Self {
            entries,
            total_estimated_cost_usd,
            notes,
        })
    }

    pub fn entries(&self) -> &[DamageEntry] {
        &self.entries
    }

    /// Total as stated by the model.
    pub fn total_estimated_cost_usd(&self) -> f64 {
        self.total_estimated_cost_usd
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Sum of the per-entry estimates.
    pub fn computed_total_usd(&self) -> f64 {
        self.entries.iter().map(|e| e.estimated_cost_usd).sum()
    }

    /// The most severe entry's severity.
    pub fn worst_severity(&self) -> Severity {
        self.entries
            .iter()
            .map(|e| e.severity)
            .max_by_key(|s| match s {
                Severity::Minor => 0,
                Severity::Moderate => 1,
                Severity::Severe => 2,
            })
            .unwrap_or(Severity::Minor)
    }

    /// Compare the stated total against the sum of entries.
    ///
    /// Returns a warning when they differ by more than [`TOTAL_TOLERANCE_USD`].
    pub fn check_total(&self) -> Option<ReportWarning> {
        let computed = self.computed_total_usd();
        if (computed - self.total_estimated_cost_usd).abs() > TOTAL_TOLERANCE_USD {
            Some(ReportWarning::TotalMismatch {
                stated: self.total_estimated_cost_usd,
                computed,
            })
        } else {
            None
        }
    }

    /// Serialize back to the schema XML. Parsing the result yields an equal report.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<damageReport>\n");
        for entry in &self.entries {
            xml.push_str(&format!(
                "  <damage type=\"{}\" severity=\"{}\" estimatedCostUSD=\"{}\"",
                escape(entry.damage_type.as_str()),
                entry.severity,
                format_usd(entry.estimated_cost_usd)
            ));
            if let Some(location) = &entry.location {
                xml.push_str(&format!(" location=\"{}\"", escape(location.as_str())));
            }
            xml.push_str("/>\n");
        }
        xml.push_str(&format!(
            "  <totalEstimatedCostUSD>{}</totalEstimatedCostUSD>\n",
            format_usd(self.total_estimated_cost_usd)
        ));
        if let Some(notes) = &self.notes {
            xml.push_str(&format!("  <notes>{}</notes>\n", escape(notes.as_str())));
        }
        xml.push_str("</damageReport>");
        xml
    }
}

/// Non-fatal findings about a report that parsed successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReportWarning {
    /// The stated total does not match the sum of entry estimates
    TotalMismatch { stated: f64, computed: f64 },
}

impl fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportWarning::TotalMismatch { stated, computed } => write!(
                f,
                "stated totalEstimatedCostUSD {:.2} does not match sum of damage estimates {:.2}",
                stated, computed
            ),
        }
    }
}

/// A parsed report together with any warnings found while checking it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedReport {
    pub report: DamageReport,
    pub warnings: Vec<ReportWarning>,
}

fn check_cost(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(TriageError::SchemaViolation(format!(
            "{} must be a non-negative amount, got {}",
            field, value
        )));
    }
    Ok(())
}

// Two decimals when that round-trips exactly, shortest form otherwise
fn format_usd(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    if fixed.parse::<f64>().ok() == Some(value) {
        fixed
    } else {
        value.to_string()
    }
}
