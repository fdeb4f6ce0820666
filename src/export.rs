// ERP export - both collections as CSV with Kwanza-formatted amounts

use crate::aggregation::allocation_shares;
use crate::currency::{format_kz, format_performance, format_ratio};
use crate::models::{BudgetEntry, Investment};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize)]
struct BudgetRow<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Department")]
    department: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Period")]
    period: &'a str,
    #[serde(rename = "Amount")]
    amount: String,
}

#[derive(Debug, Serialize)]
struct InvestmentRow<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Type")]
    kind: &'a str,
    #[serde(rename = "Invested")]
    invested: String,
    #[serde(rename = "Current_Value")]
    current_value: String,
    #[serde(rename = "Gain")]
    gain: String,
    #[serde(rename = "Performance")]
    performance: String,
    #[serde(rename = "Allocation")]
    allocation: String,
}

pub fn write_budgets<W: Write>(writer: W, budgets: &[BudgetEntry]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for b in budgets {
        wtr.serialize(BudgetRow {
            id: &b.id,
            department: b.department.as_str(),
            category: b.category.as_str(),
            period: &b.period,
            amount: format_kz(b.amount),
        })
        .context("Failed to write budget row")?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_investments<W: Write>(writer: W, investments: &[Investment]) -> Result<()> {
    let shares = allocation_shares(investments);
    let mut wtr = csv::Writer::from_writer(writer);

    for inv in investments {
        let share = shares.iter().find(|s| s.id == inv.id).map(|s| s.share);

        wtr.serialize(InvestmentRow {
            id: &inv.id,
            name: &inv.name,
            kind: inv.kind.as_str(),
            invested: format_kz(inv.amount),
            current_value: format_kz(inv.current_value),
            gain: format_kz(inv.gain()),
            performance: format_performance(inv.performance),
            allocation: format_ratio(share),
        })
        .context("Failed to write investment row")?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write `budgets.csv` and `investments.csv` into `dir`, returning both paths
pub fn export_all(
    dir: &Path,
    budgets: &[BudgetEntry],
    investments: &[Investment],
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export dir {}", dir.display()))?;

    let budgets_path = dir.join("budgets.csv");
    let investments_path = dir.join("investments.csv");

    let file = std::fs::File::create(&budgets_path)
        .with_context(|| format!("Failed to create {}", budgets_path.display()))?;
    write_budgets(file, budgets)?;

    let file = std::fs::File::create(&investments_path)
        .with_context(|| format!("Failed to create {}", investments_path.display()))?;
    write_investments(file, investments)?;

    info!(
        budgets = budgets.len(),
        investments = investments.len(),
        dir = %dir.display(),
        "exported collections"
    );

    Ok((budgets_path, investments_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{default_budgets, default_investments};

    #[test]
    fn test_budget_csv_uses_kz_format() {
        let mut out = Vec::new();
        write_budgets(&mut out, &default_budgets()[..1]).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "ID,Department,Category,Period,Amount");
        assert_eq!(
            lines.next().unwrap(),
            "1,Sales,Revenue,2025-01,15\u{a0}000\u{a0}000,00\u{a0}Kz"
        );
    }

    #[test]
    fn test_investment_csv_columns() {
        let mut out = Vec::new();
        write_investments(&mut out, &default_investments()).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut rdr = csv::Reader::from_reader(text.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.len(), 8);

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][1], "Tesouro Nacional Angola");
        assert_eq!(&rows[0][6], "+8,0%");
        assert!(rows[0][4].ends_with("Kz"));
    }

    #[test]
    fn test_export_all_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let (b, i) = export_all(dir.path(), &default_budgets(), &default_investments()).unwrap();

        assert!(b.exists());
        assert!(i.exists());
        let budgets = std::fs::read_to_string(b).unwrap();
        assert_eq!(budgets.lines().count(), 6);
    }
}
