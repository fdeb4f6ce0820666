// Input boundary for the create/edit forms
//
// Raw keyboard text is held as strings until submit. A submit that fails
// validation produces nothing, so the state controller never sees a
// malformed record.

use crate::models::{new_id, BudgetCategory, BudgetEntry, Department, Investment, InvestmentType};
use chrono::NaiveDate;
use thiserror::Error;

pub const DEFAULT_PERIOD: &str = "2025-01";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field}: '{input}' is not a number")]
    NotANumber { field: &'static str, input: String },

    #[error("{field} must be zero or more")]
    Negative { field: &'static str },

    #[error("period must be YYYY-MM, got '{input}'")]
    BadPeriod { input: String },

    #[error("{field} is out of range")]
    OutOfRange { field: &'static str },
}

/// Parse a currency magnitude typed by the user.
///
/// Spaces (including no-break spaces) are ignored and a decimal comma is
/// accepted. Result is finite and non-negative.
pub fn parse_amount(field: &'static str, input: &str) -> Result<f64, ValidationError> {
    let value = parse_number(field, input)?;
    if value < 0.0 {
        return Err(ValidationError::Negative { field });
    }
    Ok(value)
}

/// Signed variant, used for performance percentages
pub fn parse_number(field: &'static str, input: &str) -> Result<f64, ValidationError> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return Err(ValidationError::Missing { field });
    }

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::NotANumber {
            field,
            input: input.to_string(),
        }),
    }
}

/// `YYYY-MM` with a real month
pub fn parse_period(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    let valid = trimmed.len() == 7
        && NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d").is_ok();

    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::BadPeriod {
            input: input.to_string(),
        })
    }
}

// ============================================================================
// BUDGET FORM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetField {
    Department,
    Category,
    Amount,
    Period,
}

impl BudgetField {
    pub fn next(&self) -> Self {
        match self {
            BudgetField::Department => BudgetField::Category,
            BudgetField::Category => BudgetField::Amount,
            BudgetField::Amount => BudgetField::Period,
            BudgetField::Period => BudgetField::Department,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetForm {
    pub department: Department,
    pub category: BudgetCategory,
    pub amount: String,
    pub period: String,
    pub focus: BudgetField,
    /// Id of the record being edited; `None` creates a new one
    pub editing: Option<String>,
}

impl Default for BudgetForm {
    fn default() -> Self {
        Self {
            department: Department::Sales,
            category: BudgetCategory::Revenue,
            amount: String::new(),
            period: DEFAULT_PERIOD.to_string(),
            focus: BudgetField::Amount,
            editing: None,
        }
    }
}

impl BudgetForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit(entry: &BudgetEntry) -> Self {
        Self {
            department: entry.department,
            category: entry.category,
            amount: format!("{}", entry.amount),
            period: entry.period.clone(),
            focus: BudgetField::Amount,
            editing: Some(entry.id.clone()),
        }
    }

    pub fn next_field(&mut self) {
        self.focus = self.focus.next();
    }

    /// Space/arrow on a choice field cycles it
    pub fn cycle_choice(&mut self) {
        match self.focus {
            BudgetField::Department => self.department = self.department.next(),
            BudgetField::Category => self.category = self.category.toggle(),
            _ => {}
        }
    }

    pub fn push_char(&mut self, c: char) {
        match self.focus {
            BudgetField::Amount => self.amount.push(c),
            BudgetField::Period => self.period.push(c),
            _ => {}
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            BudgetField::Amount => {
                self.amount.pop();
            }
            BudgetField::Period => {
                self.period.pop();
            }
            _ => {}
        }
    }

    /// Build the record. New records get a fresh id; edits keep theirs.
    pub fn submit(&self) -> Result<BudgetEntry, ValidationError> {
        let amount = parse_amount("amount", &self.amount)?;
        let period = parse_period(&self.period)?;

        Ok(BudgetEntry {
            id: self.editing.clone().unwrap_or_else(new_id),
            department: self.department,
            amount,
            period,
            category: self.category,
        })
    }

    /// After a successful add only the amount is cleared
    pub fn clear_amount(&mut self) {
        self.amount.clear();
    }
}

// ============================================================================
// INVESTMENT FORM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestmentField {
    Name,
    Kind,
    Amount,
    CurrentValue,
    Performance,
}

impl InvestmentField {
    pub fn next(&self) -> Self {
        match self {
            InvestmentField::Name => InvestmentField::Kind,
            InvestmentField::Kind => InvestmentField::Amount,
            InvestmentField::Amount => InvestmentField::CurrentValue,
            InvestmentField::CurrentValue => InvestmentField::Performance,
            InvestmentField::Performance => InvestmentField::Name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentForm {
    pub name: String,
    pub kind: InvestmentType,
    pub amount: String,
    pub current_value: String,
    /// Blank means "derive from amount and current value"
    pub performance: String,
    pub focus: InvestmentField,
    pub editing: Option<String>,
}

impl Default for InvestmentForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: InvestmentType::Stock,
            amount: String::new(),
            current_value: String::new(),
            performance: String::new(),
            focus: InvestmentField::Name,
            editing: None,
        }
    }
}

impl InvestmentForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit(inv: &Investment) -> Self {
        Self {
            name: inv.name.clone(),
            kind: inv.kind,
            amount: format!("{}", inv.amount),
            current_value: format!("{}", inv.current_value),
            performance: format!("{}", inv.performance),
            focus: InvestmentField::Name,
            editing: Some(inv.id.clone()),
        }
    }

    pub fn next_field(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn cycle_choice(&mut self) {
        if self.focus == InvestmentField::Kind {
            self.kind = self.kind.next();
        }
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            InvestmentField::Name => Some(&mut self.name),
            InvestmentField::Kind => None,
            InvestmentField::Amount => Some(&mut self.amount),
            InvestmentField::CurrentValue => Some(&mut self.current_value),
            InvestmentField::Performance => Some(&mut self.performance),
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(text) = self.focused_text() {
            text.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(text) = self.focused_text() {
            text.pop();
        }
    }

    pub fn submit(&self) -> Result<Investment, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Missing { field: "name" });
        }

        let amount = parse_amount("amount", &self.amount)?;
        let current_value = parse_amount("current value", &self.current_value)?;

        let performance = if self.performance.trim().is_empty() {
            derived_performance(amount, current_value)
                .ok_or(ValidationError::OutOfRange { field: "performance" })?
        } else {
            parse_number("performance", &self.performance)?
        };

        Ok(Investment {
            id: self.editing.clone().unwrap_or_else(new_id),
            name: name.to_string(),
            kind: self.kind,
            amount,
            current_value,
            performance,
        })
    }
}

/// Percentage change from initial capital; 0 when nothing was invested.
/// `None` when the ratio overflows.
fn derived_performance(amount: f64, current_value: f64) -> Option<f64> {
    if amount > 0.0 {
        Some((current_value - amount) / amount * 100.0).filter(|p| p.is_finite())
    } else {
        Some(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_accepts_grouping_and_comma() {
        assert_eq!(parse_amount("amount", "500000").unwrap(), 500_000.0);
        assert_eq!(parse_amount("amount", "1 500 000,50").unwrap(), 1_500_000.5);
        assert_eq!(parse_amount("amount", "  42.5 ").unwrap(), 42.5);
    }

    #[test]
    fn test_parse_amount_rejects_bad_input() {
        assert_eq!(
            parse_amount("amount", ""),
            Err(ValidationError::Missing { field: "amount" })
        );
        assert!(matches!(
            parse_amount("amount", "12abc"),
            Err(ValidationError::NotANumber { .. })
        ));
        assert!(matches!(
            parse_amount("amount", "inf"),
            Err(ValidationError::NotANumber { .. })
        ));
        assert_eq!(
            parse_amount("amount", "-5"),
            Err(ValidationError::Negative { field: "amount" })
        );
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period("2025-02").unwrap(), "2025-02");
        assert!(parse_period("2025-13").is_err());
        assert!(parse_period("2025-1").is_err());
        assert!(parse_period("Jan 2025").is_err());
    }

    #[test]
    fn test_budget_form_submit_new() {
        let mut form = BudgetForm::new();
        form.amount = "750000".to_string();
        form.focus = BudgetField::Department;
        form.cycle_choice();

        let entry = form.submit().unwrap();
        assert_eq!(entry.department, Department::Marketing);
        assert_eq!(entry.amount, 750_000.0);
        assert_eq!(entry.period, DEFAULT_PERIOD);
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn test_budget_form_rejects_empty_amount() {
        let form = BudgetForm::new();
        assert!(form.submit().is_err());
    }

    #[test]
    fn test_budget_form_edit_keeps_id() {
        let original =
            BudgetEntry::new(Department::Finance, 10.0, "2025-06", BudgetCategory::Expense);
        let mut form = BudgetForm::edit(&original);
        form.amount = "20".to_string();

        let updated = form.submit().unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.amount, 20.0);
        assert_eq!(updated.period, "2025-06");
    }

    #[test]
    fn test_budget_form_typing() {
        let mut form = BudgetForm::new();
        for c in "12x".chars() {
            form.push_char(c);
        }
        form.pop_char();
        assert_eq!(form.amount, "12");

        form.next_field();
        assert_eq!(form.focus, BudgetField::Period);
    }

    #[test]
    fn test_investment_form_derives_performance() {
        let form = InvestmentForm {
            name: "Test Bond".to_string(),
            kind: InvestmentType::Bond,
            amount: "1000000".to_string(),
            current_value: "1100000".to_string(),
            ..InvestmentForm::default()
        };

        let inv = form.submit().unwrap();
        assert!((inv.performance - 10.0).abs() < 1e-9);
        assert_eq!(inv.kind, InvestmentType::Bond);
    }

    #[test]
    fn test_investment_form_rejects_overflowing_performance() {
        let form = InvestmentForm {
            name: "Tiny stake".to_string(),
            amount: "0.01".to_string(),
            current_value: "1e307".to_string(),
            ..InvestmentForm::default()
        };

        assert_eq!(
            form.submit(),
            Err(ValidationError::OutOfRange { field: "performance" })
        );
    }

    #[test]
    fn test_investment_form_requires_name() {
        let form = InvestmentForm {
            amount: "1".to_string(),
            current_value: "1".to_string(),
            ..InvestmentForm::default()
        };
        assert_eq!(form.submit(), Err(ValidationError::Missing { field: "name" }));
    }

    #[test]
    fn test_investment_form_accepts_negative_performance() {
        let form = InvestmentForm {
            name: "BODIVA".to_string(),
            amount: "100".to_string(),
            current_value: "90".to_string(),
            performance: "-10".to_string(),
            ..InvestmentForm::default()
        };
        assert_eq!(form.submit().unwrap().performance, -10.0);
    }
}
