// Seed dataset - used when nothing is persisted yet and on "reset all data"

use crate::models::{BudgetCategory, BudgetEntry, Department, Investment, InvestmentType};

fn budget(
    id: &str,
    department: Department,
    amount: f64,
    period: &str,
    category: BudgetCategory,
) -> BudgetEntry {
    BudgetEntry {
        id: id.to_string(),
        department,
        amount,
        period: period.to_string(),
        category,
    }
}

fn investment(
    id: &str,
    name: &str,
    kind: InvestmentType,
    amount: f64,
    current_value: f64,
    performance: f64,
) -> Investment {
    Investment {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        amount,
        current_value,
        performance,
    }
}

/// Initial budget lines for January/February 2025
pub fn default_budgets() -> Vec<BudgetEntry> {
    use BudgetCategory::*;
    use Department::*;

    vec![
        budget("1", Sales, 15_000_000.0, "2025-01", Revenue),
        budget("2", Marketing, 4_500_000.0, "2025-01", Expense),
        budget("3", Engineering, 8_000_000.0, "2025-01", Expense),
        budget("4", Operations, 2_500_000.0, "2025-01", Expense),
        budget("5", Sales, 18_000_000.0, "2025-02", Revenue),
    ]
}

/// Initial portfolio: treasury bonds, BODIVA equities, Luanda real estate
pub fn default_investments() -> Vec<Investment> {
    vec![
        investment(
            "1",
            "Tesouro Nacional Angola",
            InvestmentType::Bond,
            50_000_000.0,
            54_000_000.0,
            8.0,
        ),
        investment(
            "2",
            "Bolsa de Valores (BODIVA)",
            InvestmentType::Stock,
            20_000_000.0,
            22_500_000.0,
            12.5,
        ),
        investment(
            "3",
            "Imobiliário Luanda Sul",
            InvestmentType::RealEstate,
            120_000_000.0,
            135_000_000.0,
            12.5,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seed_ids_unique() {
        let budget_ids: HashSet<_> = default_budgets().into_iter().map(|b| b.id).collect();
        assert_eq!(budget_ids.len(), 5);

        let investment_ids: HashSet<_> = default_investments().into_iter().map(|i| i.id).collect();
        assert_eq!(investment_ids.len(), 3);
    }

    #[test]
    fn test_seed_amounts_valid() {
        assert!(default_budgets().iter().all(|b| b.amount.is_finite() && b.amount >= 0.0));
        assert!(default_investments()
            .iter()
            .all(|i| i.amount >= 0.0 && i.current_value >= 0.0));
    }
}
