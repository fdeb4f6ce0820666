//! Risk Analysis Client - narrative assessment from a hosted model.

pub mod desk;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod session;

use async_trait::async_trait;

use crate::models::{BudgetEntry, Investment, Projection, RiskAnalysis};

pub use desk::{AnalysisOutcome, RiskDesk};
pub use error::AnalysisError;
pub use gemini::GeminiClient;
pub use session::{AnalysisSession, Completion, SessionStatus, Ticket};

/// One-shot requests to the analysis service. No retry, no caching.
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(
        &self,
        budgets: &[BudgetEntry],
        investments: &[Investment],
    ) -> Result<RiskAnalysis, AnalysisError>;

    /// Twelve-month revenue/expense forecast from the budget history
    async fn project(&self, budgets: &[BudgetEntry]) -> Result<Vec<Projection>, AnalysisError>;
}
