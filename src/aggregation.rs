// Aggregation layer - pure derivations over the two collections
//
// Recomputed on every render; nothing here is cached.

use crate::models::{BudgetCategory, BudgetEntry, Department, Investment};
use serde::Serialize;

/// Fixed divisor for burn rate; not period-aware
pub const MONTHS_PER_YEAR: f64 = 12.0;

// ============================================================================
// BUDGET TOTALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FinancialSummary {
    pub total_revenue: f64,
    pub total_expense: f64,
    pub net_income: f64,
    /// `net_income / total_revenue`; `None` when revenue is zero
    pub margin: Option<f64>,
}

pub fn summarize(budgets: &[BudgetEntry]) -> FinancialSummary {
    let total_revenue = sum_category(budgets, BudgetCategory::Revenue);
    let total_expense = sum_category(budgets, BudgetCategory::Expense);
    let net_income = total_revenue - total_expense;

    let margin = if total_revenue == 0.0 {
        None
    } else {
        Some(net_income / total_revenue).filter(|m| m.is_finite())
    };

    FinancialSummary {
        total_revenue,
        total_expense,
        net_income,
        margin,
    }
}

fn sum_category(budgets: &[BudgetEntry], category: BudgetCategory) -> f64 {
    budgets
        .iter()
        .filter(|b| b.category == category)
        .map(|b| b.amount)
        .sum()
}

pub fn monthly_burn_rate(budgets: &[BudgetEntry]) -> f64 {
    sum_category(budgets, BudgetCategory::Expense) / MONTHS_PER_YEAR
}

// ============================================================================
// DEPARTMENT ROLLUP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentRollup {
    pub department: Department,
    pub revenue: f64,
    pub expense: f64,
}

impl DepartmentRollup {
    pub fn net(&self) -> f64 {
        self.revenue - self.expense
    }
}

/// Group by department in order of first appearance in `budgets`
pub fn department_rollup(budgets: &[BudgetEntry]) -> Vec<DepartmentRollup> {
    let mut rollup: Vec<DepartmentRollup> = Vec::new();

    for entry in budgets {
        let idx = match rollup.iter().position(|r| r.department == entry.department) {
            Some(idx) => idx,
            None => {
                rollup.push(DepartmentRollup {
                    department: entry.department,
                    revenue: 0.0,
                    expense: 0.0,
                });
                rollup.len() - 1
            }
        };

        match entry.category {
            BudgetCategory::Revenue => rollup[idx].revenue += entry.amount,
            BudgetCategory::Expense => rollup[idx].expense += entry.amount,
        }
    }

    rollup
}

// ============================================================================
// PORTFOLIO
// ============================================================================

pub fn total_asset_value(investments: &[Investment]) -> f64 {
    investments.iter().map(|i| i.current_value).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationShare {
    pub id: String,
    pub name: String,
    pub current_value: f64,
    /// Fraction of the portfolio, 0..=1
    pub share: f64,
}

/// Each position's share of total current value.
///
/// Empty when the portfolio total is not positive; there is nothing to chart.
pub fn allocation_shares(investments: &[Investment]) -> Vec<AllocationShare> {
    let total = total_asset_value(investments);
    if !(total > 0.0) || !total.is_finite() {
        return Vec::new();
    }

    investments
        .iter()
        .map(|i| AllocationShare {
            id: i.id.clone(),
            name: i.name.clone(),
            current_value: i.current_value,
            share: i.current_value / total,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PortfolioSummary {
    pub invested: f64,
    pub current_value: f64,
    pub gain: f64,
    /// `gain / invested`; `None` when nothing was invested
    pub return_ratio: Option<f64>,
}

pub fn portfolio_summary(investments: &[Investment]) -> PortfolioSummary {
    let invested: f64 = investments.iter().map(|i| i.amount).sum();
    let current_value = total_asset_value(investments);
    let gain = current_value - invested;
    let return_ratio = if invested == 0.0 {
        None
    } else {
        Some(gain / invested).filter(|r| r.is_finite())
    };

    PortfolioSummary {
        invested,
        current_value,
        gain,
        return_ratio,
    }
}

// ============================================================================
// RISK BANDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    /// < 30 low, < 70 moderate, otherwise high
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            RiskBand::Low
        } else if score < 70.0 {
            RiskBand::Moderate
        } else {
            RiskBand::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Moderate => "Moderate",
            RiskBand::High => "High",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvestmentType;
    use crate::seed::{default_budgets, default_investments};

    fn entry(department: Department, amount: f64, category: BudgetCategory) -> BudgetEntry {
        BudgetEntry::new(department, amount, "2025-01", category)
    }

    #[test]
    fn test_revenue_expense_margin() {
        let budgets = vec![
            entry(Department::Sales, 15_000_000.0, BudgetCategory::Revenue),
            entry(Department::Marketing, 4_500_000.0, BudgetCategory::Expense),
        ];

        let summary = summarize(&budgets);
        assert_eq!(summary.total_revenue, 15_000_000.0);
        assert_eq!(summary.total_expense, 4_500_000.0);
        assert_eq!(summary.net_income, 10_500_000.0);
        assert!((summary.margin.unwrap() - 0.70).abs() < 1e-12);
    }

    #[test]
    fn test_margin_not_applicable_without_revenue() {
        let budgets = vec![entry(Department::Operations, 2_500_000.0, BudgetCategory::Expense)];
        let summary = summarize(&budgets);

        assert_eq!(summary.margin, None);
        assert_eq!(summary.net_income, -2_500_000.0);
        assert_eq!(summarize(&[]).margin, None);
    }

    #[test]
    fn test_net_income_identity() {
        let budgets = default_budgets();
        let s = summarize(&budgets);
        assert_eq!(s.total_revenue - s.total_expense, s.net_income);
    }

    #[test]
    fn test_department_rollup_first_appearance_order() {
        let budgets = vec![
            entry(Department::Operations, 100.0, BudgetCategory::Expense),
            entry(Department::Sales, 500.0, BudgetCategory::Revenue),
            entry(Department::Operations, 40.0, BudgetCategory::Revenue),
            entry(Department::Sales, 50.0, BudgetCategory::Expense),
        ];

        let rollup = department_rollup(&budgets);
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].department, Department::Operations);
        assert_eq!(rollup[0].expense, 100.0);
        assert_eq!(rollup[0].revenue, 40.0);
        assert_eq!(rollup[1].department, Department::Sales);
        assert_eq!(rollup[1].net(), 450.0);
    }

    #[test]
    fn test_seed_rollup() {
        let rollup = department_rollup(&default_budgets());
        let names: Vec<_> = rollup.iter().map(|r| r.department).collect();
        assert_eq!(
            names,
            vec![
                Department::Sales,
                Department::Marketing,
                Department::Engineering,
                Department::Operations
            ]
        );
        assert_eq!(rollup[0].revenue, 33_000_000.0);
    }

    #[test]
    fn test_burn_rate_fixed_divisor() {
        let budgets = default_budgets();
        // 4.5M + 8M + 2.5M
        assert_eq!(monthly_burn_rate(&budgets), 15_000_000.0 / 12.0);
    }

    #[test]
    fn test_allocation_shares_sum_to_one() {
        let shares = allocation_shares(&default_investments());
        let total: f64 = shares.iter().map(|s| s.share).sum();

        assert_eq!(shares.len(), 3);
        assert!((total - 1.0).abs() < 1e-9);
        assert!((shares[2].share - 135.0 / 211.5).abs() < 1e-12);
    }

    #[test]
    fn test_allocation_empty_when_total_zero() {
        let zero = vec![Investment::new("Caixa", InvestmentType::Cash, 0.0, 0.0, 0.0)];
        assert!(allocation_shares(&zero).is_empty());
        assert!(allocation_shares(&[]).is_empty());
    }

    #[test]
    fn test_portfolio_summary() {
        let summary = portfolio_summary(&default_investments());
        assert_eq!(summary.invested, 190_000_000.0);
        assert_eq!(summary.current_value, 211_500_000.0);
        assert_eq!(summary.gain, 21_500_000.0);
        assert!(portfolio_summary(&[]).return_ratio.is_none());
    }

    #[test]
    fn test_risk_bands() {
        assert_eq!(RiskBand::from_score(0.0), RiskBand::Low);
        assert_eq!(RiskBand::from_score(29.9), RiskBand::Low);
        assert_eq!(RiskBand::from_score(30.0), RiskBand::Moderate);
        assert_eq!(RiskBand::from_score(70.0), RiskBand::High);
    }
}
