//! Project budget records

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Fields that a new project must carry, besides its id. A partial update
/// must carry at least one of them.
pub const REQUIRED_PROJECT_FIELDS: [&str; 10] = [
    "projectName",
    "year",
    "currency",
    "initialBudgetLocal",
    "budgetUsd",
    "initialScheduleEstimateMonths",
    "adjustedScheduleEstimateMonths",
    "contingencyRate",
    "escalationRate",
    "finalBudgetUsd",
];

/// Money amounts are stored with two decimal places. Rates keep the
/// precision they were given.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Missing project id")]
    MissingProjectId,
    #[error("At least one project field is required")]
    NoFields,
    #[error("Project data must be a JSON object")]
    NotAnObject,
    #[error("Malformed project data: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub project_id: i64,
    pub project_name: String,
    pub year: i32,
    pub currency: String,
    pub initial_budget_local: Decimal,
    pub budget_usd: Decimal,
    pub initial_schedule_estimate_months: i32,
    pub adjusted_schedule_estimate_months: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub contingency_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub escalation_rate: Decimal,
    pub final_budget_usd: Decimal,
}

impl ProjectRecord {
    /// Validates a create request body and builds the record it describes.
    pub fn from_request(body: &Value) -> Result<Self, ValidationError> {
        let fields = body.as_object().ok_or(ValidationError::NotAnObject)?;

        if !is_present(fields.get("projectId")) {
            return Err(ValidationError::MissingProjectId);
        }
        let missing: Vec<&'static str> = REQUIRED_PROJECT_FIELDS
            .iter()
            .copied()
            .filter(|field| !is_present(fields.get(*field)))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let record: ProjectRecord = serde_json::from_value(body.clone())
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Ok(record.with_money_scale())
    }

    /// Rescales the money amounts to the stored precision.
    pub fn with_money_scale(mut self) -> Self {
        self.initial_budget_local = to_money(self.initial_budget_local);
        self.budget_usd = to_money(self.budget_usd);
        self.final_budget_usd = to_money(self.final_budget_usd);
        self
    }
}

/// A partial update. Absent fields keep their stored value; the project id
/// is never part of an update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub project_name: Option<String>,
    pub year: Option<i32>,
    pub currency: Option<String>,
    pub initial_budget_local: Option<Decimal>,
    pub budget_usd: Option<Decimal>,
    pub initial_schedule_estimate_months: Option<i32>,
    pub adjusted_schedule_estimate_months: Option<i32>,
    pub contingency_rate: Option<Decimal>,
    pub escalation_rate: Option<Decimal>,
    pub final_budget_usd: Option<Decimal>,
}

impl ProjectPatch {
    /// Validates an update request body. At least one recognized field must
    /// be present.
    pub fn from_request(body: &Value) -> Result<Self, ValidationError> {
        let fields = body.as_object().ok_or(ValidationError::NotAnObject)?;

        let has_any = REQUIRED_PROJECT_FIELDS
            .iter()
            .any(|field| is_present(fields.get(*field)));
        if !has_any {
            return Err(ValidationError::NoFields);
        }

        serde_json::from_value(body.clone()).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Shallow-merges this patch over `existing`.
    pub fn merge_into(self, existing: ProjectRecord) -> ProjectRecord {
        ProjectRecord {
            project_id: existing.project_id,
            project_name: self.project_name.unwrap_or(existing.project_name),
            year: self.year.unwrap_or(existing.year),
            currency: self.currency.unwrap_or(existing.currency),
            initial_budget_local: self
                .initial_budget_local
                .unwrap_or(existing.initial_budget_local),
            budget_usd: self.budget_usd.unwrap_or(existing.budget_usd),
            initial_schedule_estimate_months: self
                .initial_schedule_estimate_months
                .unwrap_or(existing.initial_schedule_estimate_months),
            adjusted_schedule_estimate_months: self
                .adjusted_schedule_estimate_months
                .unwrap_or(existing.adjusted_schedule_estimate_months),
            contingency_rate: self.contingency_rate.unwrap_or(existing.contingency_rate),
            escalation_rate: self.escalation_rate.unwrap_or(existing.escalation_rate),
            final_budget_usd: self.final_budget_usd.unwrap_or(existing.final_budget_usd),
        }
        .with_money_scale()
    }
}

/// Rounds half away from zero to two places and pins the scale, so `1000`
/// becomes `1000.00`.
pub fn to_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}
