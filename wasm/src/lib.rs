//! WebAssembly module for the Condominium Management Platform
//!
//! Provides client-side checks that mirror the server rules:
//! - Document visibility resolution and access
//! - Ballot selection validation
//! - Project and maintenance status progression
//! - Budget summaries

use serde::de::DeserializeOwned;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unknown value '{}'", value))
}

fn to_js_error(message: String) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

// ============================================================================
// Documents
// ============================================================================

fn effective_visibility(
    override_visibility: Option<String>,
    folder_default: Option<String>,
) -> Result<Visibility, String> {
    let override_visibility = override_visibility
        .as_deref()
        .map(parse_enum::<Visibility>)
        .transpose()?;
    let folder_default = folder_default
        .as_deref()
        .map(parse_enum::<Visibility>)
        .transpose()?;
    Ok(resolve_visibility(override_visibility, folder_default))
}

/// Effective visibility of a document: override, else folder default, else "members"
#[wasm_bindgen]
pub fn resolve_document_visibility(
    override_visibility: Option<String>,
    folder_default: Option<String>,
) -> Result<String, JsValue> {
    effective_visibility(override_visibility, folder_default)
        .map(|v| v.as_str().to_string())
        .map_err(to_js_error)
}

fn check_access(visibility: &str, role: Option<String>) -> Result<bool, String> {
    let visibility = parse_enum::<Visibility>(visibility)?;
    let role = role.as_deref().map(parse_enum::<SystemRole>).transpose()?;
    Ok(can_access(visibility, role))
}

/// Whether a caller with `role` (none for non-members) may open a document
#[wasm_bindgen]
pub fn can_access_document(visibility: &str, role: Option<String>) -> Result<bool, JsValue> {
    check_access(visibility, role).map_err(to_js_error)
}

// ============================================================================
// Ballots
// ============================================================================

fn check_selection(
    kind: &str,
    options_json: &str,
    selection_json: &str,
    max_selections: Option<i32>,
) -> Result<(), String> {
    let kind = parse_enum::<BallotKind>(kind)?;
    let options: Vec<Uuid> =
        serde_json::from_str(options_json).map_err(|e| format!("invalid options JSON: {}", e))?;
    let selection: Vec<Uuid> = serde_json::from_str(selection_json)
        .map_err(|e| format!("invalid selection JSON: {}", e))?;

    validate_selection(kind, &options, &selection, max_selections).map_err(|e| e.to_string())
}

/// Validate a selection before submitting a vote.
/// `options_json` and `selection_json` are JSON arrays of option ids.
#[wasm_bindgen]
pub fn validate_ballot_selection(
    kind: &str,
    options_json: &str,
    selection_json: &str,
    max_selections: Option<i32>,
) -> Result<(), JsValue> {
    check_selection(kind, options_json, selection_json, max_selections).map_err(to_js_error)
}

// ============================================================================
// Status progression
// ============================================================================

fn project_successor(status: &str) -> Result<Option<String>, String> {
    let status = parse_enum::<ProjectStatus>(status)?;
    Ok(status.next().map(|s| s.as_str().to_string()))
}

/// Next project status, `undefined` once archived
#[wasm_bindgen]
pub fn next_project_status(status: &str) -> Result<Option<String>, JsValue> {
    project_successor(status).map_err(to_js_error)
}

fn maintenance_targets(status: &str) -> Result<Vec<String>, String> {
    let status = parse_enum::<MaintenanceStatus>(status)?;
    Ok(status
        .allowed_transitions()
        .iter()
        .map(|s| s.as_str().to_string())
        .collect())
}

/// Statuses a maintenance request may move to
#[wasm_bindgen]
pub fn maintenance_next_statuses(status: &str) -> Result<js_sys::Array, JsValue> {
    let targets = maintenance_targets(status).map_err(to_js_error)?;
    Ok(targets.iter().map(|s| JsValue::from_str(s)).collect())
}

// ============================================================================
// Budgets
// ============================================================================

fn budget_summary_json(fiscal_year: i32, lines_json: &str) -> Result<String, String> {
    let lines: Vec<BudgetLine> =
        serde_json::from_str(lines_json).map_err(|e| format!("invalid budget JSON: {}", e))?;
    let summary = summarize_budget(fiscal_year, &lines).map_err(|e| e.to_string())?;
    serde_json::to_string(&summary).map_err(|e| e.to_string())
}

/// Per-category totals for budget lines given as JSON
#[wasm_bindgen]
pub fn summarize_budget_lines(fiscal_year: i32, lines_json: &str) -> Result<String, JsValue> {
    budget_summary_json(fiscal_year, lines_json).map_err(to_js_error)
}
