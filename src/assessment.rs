//! Claim triage on top of a parsed damage report.
//!
//! Turns repair estimates, a rough vehicle valuation and the policy deductible
//! into a recommendation on whether filing a claim is worthwhile.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::error::{Result, TriageError};
use crate::report::DamageReport;

/// Repair cost above which filing a claim is recommended.
pub const CLAIM_THRESHOLD_USD: f64 = 1000.0;

const DEFAULT_BASE_VALUE_USD: f64 = 25_000.0;
const MIN_VEHICLE_VALUE_USD: f64 = 5_000.0;
const EXPECTED_MILES_PER_YEAR: f64 = 15_000.0;
const EXCESS_MILE_PENALTY_USD: f64 = 0.10;

/// Base value of a new vehicle by make (lowercase).
const MAKE_BASE_VALUES: &[(&str, f64)] = &[
    ("mercedes-benz", 45_000.0),
    ("bmw", 42_000.0),
    ("audi", 40_000.0),
    ("lexus", 38_000.0),
    ("toyota", 25_000.0),
    ("honda", 23_000.0),
    ("ford", 22_000.0),
    ("chevrolet", 21_000.0),
    ("nissan", 20_000.0),
];

/// What we know about the damaged vehicle. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VehicleInfo {
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub mileage: Option<u64>,
}

impl VehicleInfo {
    /// "2019 Toyota Camry", skipping unknown parts.
    pub fn description(&self) -> String {
        let year = self.year.map(|y| y.to_string());
        [year.as_deref(), self.make.as_deref(), self.model.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.description().is_empty() && self.mileage.is_none()
    }
}

/// Rough market value in whole dollars.
///
/// Starts from a per-make base value, depreciates 15% a year for the first
/// five years and 10% a year after that, takes $0.10 off for every mile above
/// 15,000 a year, and never goes below $5,000.
pub fn estimate_vehicle_value(vehicle: &VehicleInfo, current_year: i32) -> u64 {
    let age = vehicle
        .year
        .map(|year| (current_year - year).max(0))
        .unwrap_or(0);

    let make = vehicle
        .make
        .as_deref()
        .map(|m| m.trim().to_lowercase())
        .unwrap_or_default();
    let mut value = MAKE_BASE_VALUES
        .iter()
        .find(|(name, _)| *name == make)
        .map(|(_, base)| *base)
        .unwrap_or(DEFAULT_BASE_VALUE_USD);

    for year_index in 0..age {
        let rate = if year_index < 5 { 0.15 } else { 0.10 };
        value *= 1.0 - rate;
    }

    let expected_miles = f64::from(age) * EXPECTED_MILES_PER_YEAR;
    let mileage = vehicle.mileage.unwrap_or(0) as f64;
    let excess_miles = (mileage - expected_miles).max(0.0);
    value -= excess_miles * EXCESS_MILE_PENALTY_USD;

    value.max(MIN_VEHICLE_VALUE_USD).round() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecommendedAction {
    /// Repair cost clearly exceeds what a deductible typically absorbs
    FileClaim,
    /// Minor damage, probably cheaper to pay out of pocket
    ConsiderSkipping,
}

impl RecommendedAction {
    pub fn for_repair_cost(total_repair_cost: f64) -> Self {
        if total_repair_cost > CLAIM_THRESHOLD_USD {
            RecommendedAction::FileClaim
        } else {
            RecommendedAction::ConsiderSkipping
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RecommendedAction::FileClaim => {
                "Recommended: File insurance claim - damage significantly exceeds deductible"
            }
            RecommendedAction::ConsiderSkipping => {
                "Consider: Minor damage, may not exceed deductible"
            }
        }
    }
}

/// Triage outcome for one analyzed image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimAssessment {
    pub analysis_id: String,
    /// RFC 3339 time the assessment was made
    pub timestamp: String,
    pub report: DamageReport,
    pub vehicle: VehicleInfo,
    pub vehicle_value_usd: u64,
    /// Sum of the per-damage estimates, recomputed locally
    pub total_repair_cost_usd: f64,
    pub deductible_usd: f64,
    pub expected_payout_usd: f64,
    pub recommended_action: RecommendedAction,
    pub recommendation: String,
}

impl ClaimAssessment {
    /// Assess a report as of now.
    pub fn new(report: DamageReport, vehicle: VehicleInfo, deductible_usd: f64) -> Result<Self> {
        Self::at(report, vehicle, deductible_usd, Utc::now())
    }

    /// Assess a report as of `now`.
    pub fn at(
        report: DamageReport,
        vehicle: VehicleInfo,
        deductible_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if !deductible_usd.is_finite() || deductible_usd < 0.0 {
            return Err(TriageError::Configuration(format!(
                "deductible must be a non-negative amount, got {}",
                deductible_usd
            )));
        }

        let total_repair_cost_usd = report.computed_total_usd();
        let recommended_action = RecommendedAction::for_repair_cost(total_repair_cost_usd);
        Ok(Self {
            analysis_id: format!("analysis_{}", now.timestamp_millis()),
            timestamp: now.to_rfc3339(),
            vehicle_value_usd: estimate_vehicle_value(&vehicle, now.year()),
            total_repair_cost_usd,
            deductible_usd,
            expected_payout_usd: (total_repair_cost_usd - deductible_usd).max(0.0),
            recommended_action,
            recommendation: recommended_action.message().to_string(),
            report,
            vehicle,
        })
    }

    /// Repairs cost more than the vehicle is worth.
    pub fn exceeds_vehicle_value(&self) -> bool {
        self.total_repair_cost_usd > self.vehicle_value_usd as f64
    }
}
