//! Prompt construction, response schemas and response parsing.
//!
//! The service is asked for JSON only, but models occasionally wrap it in a
//! Markdown fence; that wrapper is stripped before parsing.

use serde_json::{json, Value};

use super::error::AnalysisError;
use crate::currency::{CURRENCY_CODE, CURRENCY_LABEL};
use crate::models::{BudgetEntry, Investment, Projection, RiskAnalysis};

pub const COMPANY: &str = "Applemar";
pub const MARKET: &str = "Angola";

/// Risk prompt: both collections as JSON plus currency and market context.
pub fn risk_prompt(
    budgets: &[BudgetEntry],
    investments: &[Investment],
) -> Result<String, AnalysisError> {
    let budgets_json = serde_json::to_string(budgets)?;
    let investments_json = serde_json::to_string(investments)?;

    Ok(format!(
        "Analyse the financial risk of the company {COMPANY} using the data below, in the \
context of the {MARKET} market. Operating currency: Kwanza ({CURRENCY_CODE}/{CURRENCY_LABEL}).\n\
Budgets: {budgets_json}\n\
Investments: {investments_json}\n\n\
Take into account Kwanza volatility and the Angolan macroeconomic scenario. Respond with a \
JSON object containing riskScore (number 0-100), criticalIssues (array of strings), \
recommendations (array of strings) and marketOutlook (string describing the Angolan market). \
Write all text in Portuguese."
    ))
}

/// Projection prompt: twelve months ahead from the budget history.
pub fn projection_prompt(budgets: &[BudgetEntry]) -> Result<String, AnalysisError> {
    let budgets_json = serde_json::to_string(budgets)?;

    Ok(format!(
        "Based on this historical financial data: {budgets_json}\n\
Project revenue and expenses for the next 12 months in Kwanza ({CURRENCY_LABEL}). Return an \
array of objects with month, projectedRevenue, projectedExpense and confidence (0-1)."
    ))
}

/// Response schema for [`RiskAnalysis`], all fields required.
pub fn risk_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "riskScore": { "type": "NUMBER" },
            "criticalIssues": { "type": "ARRAY", "items": { "type": "STRING" } },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } },
            "marketOutlook": { "type": "STRING" }
        },
        "required": ["riskScore", "criticalIssues", "recommendations", "marketOutlook"]
    })
}

pub fn projection_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "month": { "type": "STRING" },
                "projectedRevenue": { "type": "NUMBER" },
                "projectedExpense": { "type": "NUMBER" },
                "confidence": { "type": "NUMBER" }
            },
            "required": ["month", "projectedRevenue", "projectedExpense", "confidence"]
        }
    })
}

pub fn parse_risk_analysis(text: &str) -> Result<RiskAnalysis, AnalysisError> {
    Ok(serde_json::from_str(strip_code_fence(text))?)
}

pub fn parse_projections(text: &str) -> Result<Vec<Projection>, AnalysisError> {
    Ok(serde_json::from_str(strip_code_fence(text))?)
}

/// ```` ```json\n{..}\n``` ```` -> `{..}`
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
