// Applemar Planner - Core Library
// Budgets, investments, Kwanza reporting and AI risk analysis.
// The TUI binary and the integration tests build on these modules.

pub mod aggregation;
pub mod config;
pub mod currency;
pub mod export;
pub mod forms;
pub mod logging;
pub mod models;
pub mod risk;
pub mod seed;
pub mod state;
pub mod store;
pub mod view;

// Re-export commonly used types
pub use aggregation::{
    allocation_shares, department_rollup, monthly_burn_rate, portfolio_summary, summarize,
    total_asset_value, AllocationShare, DepartmentRollup, FinancialSummary, PortfolioSummary,
    RiskBand,
};
pub use config::Config;
pub use currency::format_kz;
pub use models::{
    BudgetCategory, BudgetEntry, Department, Investment, InvestmentType, Projection, RiskAnalysis,
};
pub use risk::{AnalysisError, Analyst, GeminiClient, RiskDesk};
pub use state::{AppState, Snapshot, StateChange, StateObserver};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use view::{View, ViewSelector};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
