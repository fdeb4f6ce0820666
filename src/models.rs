// Planning records - budget lines, investment positions, model output
//
// Field names on the wire match the persisted JSON exactly:
// `currentValue`, `riskScore`, `criticalIssues`, ... and `type` for the
// investment kind. Enum values serialize as their display labels.

use serde::{Deserialize, Serialize};

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Fresh record identifier (UUID v4).
///
/// Collisions would silently overwrite an existing record on update, so ids
/// come from a 122-bit random space rather than a short token.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// DEPARTMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    Sales,
    Marketing,
    Engineering,
    Operations,
    #[serde(rename = "Human Resources")]
    HumanResources,
    Finance,
}

impl Department {
    pub const ALL: [Department; 6] = [
        Department::Sales,
        Department::Marketing,
        Department::Engineering,
        Department::Operations,
        Department::HumanResources,
        Department::Finance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Sales => "Sales",
            Department::Marketing => "Marketing",
            Department::Engineering => "Engineering",
            Department::Operations => "Operations",
            Department::HumanResources => "Human Resources",
            Department::Finance => "Finance",
        }
    }

    /// Next department in the fixed list, wrapping around (form cycling)
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|d| d == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

// ============================================================================
// BUDGET ENTRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetCategory {
    Revenue,
    Expense,
}

impl BudgetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetCategory::Revenue => "Revenue",
            BudgetCategory::Expense => "Expense",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            BudgetCategory::Revenue => BudgetCategory::Expense,
            BudgetCategory::Expense => BudgetCategory::Revenue,
        }
    }
}

/// One revenue or expense allocation for a department in a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub id: String,
    pub department: Department,
    pub amount: f64,
    /// `YYYY-MM`
    pub period: String,
    pub category: BudgetCategory,
}

impl BudgetEntry {
    pub fn new(
        department: Department,
        amount: f64,
        period: impl Into<String>,
        category: BudgetCategory,
    ) -> Self {
        BudgetEntry {
            id: new_id(),
            department,
            amount,
            period: period.into(),
            category,
        }
    }

    pub fn is_revenue(&self) -> bool {
        self.category == BudgetCategory::Revenue
    }
}

// ============================================================================
// INVESTMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestmentType {
    Stock,
    Bond,
    #[serde(rename = "Real Estate")]
    RealEstate,
    Cash,
}

impl InvestmentType {
    pub const ALL: [InvestmentType; 4] = [
        InvestmentType::Stock,
        InvestmentType::Bond,
        InvestmentType::RealEstate,
        InvestmentType::Cash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentType::Stock => "Stock",
            InvestmentType::Bond => "Bond",
            InvestmentType::RealEstate => "Real Estate",
            InvestmentType::Cash => "Cash",
        }
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// A single asset holding with its initial capital and present valuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InvestmentType,
    /// Initial capital
    pub amount: f64,
    pub current_value: f64,
    /// Signed percentage, e.g. `12.5` for +12.5%
    pub performance: f64,
}

impl Investment {
    pub fn new(
        name: impl Into<String>,
        kind: InvestmentType,
        amount: f64,
        current_value: f64,
        performance: f64,
    ) -> Self {
        Investment {
            id: new_id(),
            name: name.into(),
            kind,
            amount,
            current_value,
            performance,
        }
    }

    /// Unrealised gain (negative for a loss)
    pub fn gain(&self) -> f64 {
        self.current_value - self.amount
    }
}

// ============================================================================
// MODEL OUTPUT (ephemeral, never persisted)
// ============================================================================

/// Narrative risk assessment returned by the analysis service.
///
/// All four fields are required when parsing; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub risk_score: f64,
    pub critical_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub market_outlook: String,
}

impl RiskAnalysis {
    /// Score safe to draw: clamped to `[0, 100]`, non-finite treated as 0.
    pub fn display_score(&self) -> f64 {
        if self.risk_score.is_finite() {
            self.risk_score.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// Monthly forecast point from the projection request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub month: String,
    pub projected_revenue: f64,
    pub projected_expense: f64,
    /// 0..1
    pub confidence: f64,
}
