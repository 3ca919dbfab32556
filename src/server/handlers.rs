use super::AppState;
use super::response::{ApiError, ApiResult, Envelope, respond, respond_done};
use crate::core::project::{ProjectPatch, ProjectRecord};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, info};

const INVALID_PROJECT_ID: &str = "Invalid project ID";
const INVALID_PROJECT_DATA: &str = "Invalid project data";
const PROJECT_NOT_FOUND: &str = "Project not found";
const CURRENCY_FIELDS_REQUIRED: &str = "Year, Currency and projectName are required";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCurrencyRequest {
    pub project_name: Option<String>,
    pub year: Option<YearField>,
    pub currency: Option<String>,
}

/// A year sent as a number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum YearField {
    Number(i32),
    Text(String),
}

impl YearField {
    pub fn value(&self) -> Option<i32> {
        match self {
            YearField::Number(year) => Some(*year),
            YearField::Text(text) => text.trim().parse().ok(),
        }
    }
}

fn parse_project_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::validation(INVALID_PROJECT_ID))
}

fn project_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        debug!(error = %rejection, "Rejected project body");
        ApiError::validation(INVALID_PROJECT_DATA)
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")})),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "version": env!("CARGO_PKG_VERSION")})),
            )
        }
    }
}

pub async fn ok() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(Envelope::error("Not found")))
}

/// Every allowlisted project across all years, with `finalBudgetTtd`.
pub async fn ttd_budgets(State(state): State<AppState>) -> ApiResult {
    let lookups = state
        .converter
        .allowlist()
        .names()
        .map(|name| state.store.find_by_name(name));
    let mut projects: Vec<ProjectRecord> = try_join_all(lookups)
        .await?
        .into_iter()
        .flatten()
        .collect();
    if projects.is_empty() {
        return Err(ApiError::not_found(PROJECT_NOT_FOUND));
    }
    projects.sort_by_key(|p| p.project_id);

    info!(count = projects.len(), "Converting allowlisted projects to TTD");
    let converted = state.converter.convert_all_to_ttd(projects).await;
    respond(StatusCode::OK, &converted)
}

/// Projects matching a name and year, converted to the requested currency.
pub async fn budget_currency(
    State(state): State<AppState>,
    payload: Result<Json<BudgetCurrencyRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected currency request body");
        ApiError::validation(CURRENCY_FIELDS_REQUIRED)
    })?;

    let (Some(project_name), Some(year), Some(currency)) = (
        non_empty(request.project_name),
        request.year.as_ref().and_then(YearField::value),
        non_empty(request.currency),
    ) else {
        return Err(ApiError::validation(CURRENCY_FIELDS_REQUIRED));
    };

    let projects = state
        .store
        .find_by_name_and_year(&project_name, year)
        .await?;
    if projects.is_empty() {
        return Err(ApiError::not_found(PROJECT_NOT_FOUND));
    }

    info!(%project_name, year, %currency, count = projects.len(), "Converting project budgets");
    let converted = state
        .converter
        .convert_all_to_currency(projects, &currency)
        .await?;
    respond(StatusCode::OK, &converted)
}

pub async fn get_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_project_id(&id)?;
    match state.store.get_by_id(id).await? {
        Some(project) => respond(StatusCode::OK, &project),
        None => Err(ApiError::not_found(PROJECT_NOT_FOUND)),
    }
}

pub async fn create_project(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let body = project_body(body)?;
    let record = ProjectRecord::from_request(&body).map_err(|e| {
        debug!(error = %e, "Invalid new project");
        ApiError::validation(INVALID_PROJECT_DATA)
    })?;

    let created = state.store.create(record).await?;
    info!(id = created.project_id, "Project created");
    respond(StatusCode::CREATED, &created)
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult {
    let id = parse_project_id(&id)?;
    let body = project_body(body)?;
    let patch = ProjectPatch::from_request(&body).map_err(|e| {
        debug!(error = %e, "Invalid project update");
        ApiError::validation(INVALID_PROJECT_DATA)
    })?;

    if !state.store.update(id, patch).await? {
        return Err(ApiError::not_found(PROJECT_NOT_FOUND));
    }
    info!(id, "Project updated");
    respond_done()
}

pub async fn delete_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_project_id(&id)?;
    if !state.store.delete(id).await? {
        return Err(ApiError::not_found(PROJECT_NOT_FOUND));
    }
    info!(id, "Project deleted");
    respond_done()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year(body: Value) -> Option<i32> {
        let request: BudgetCurrencyRequest = serde_json::from_value(body).unwrap();
        request.year.as_ref().and_then(YearField::value)
    }

    #[test]
    fn test_year_accepts_numbers_and_numeric_strings() {
        assert_eq!(year(json!({"year": 2009})), Some(2009));
        assert_eq!(year(json!({"year": "2009"})), Some(2009));
        assert_eq!(year(json!({"year": " 2010 "})), Some(2010));
        assert_eq!(year(json!({"year": "soon"})), None);
        assert_eq!(year(json!({})), None);
    }

    #[test]
    fn test_project_id_parsing() {
        assert_eq!(parse_project_id("321").unwrap(), 321);
        assert!(parse_project_id("abc").is_err());
    }
}
