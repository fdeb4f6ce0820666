//! Runs analysis requests off the UI thread and folds results back in.
//!
//! Requests are spawned on a tokio runtime; outcomes come back over a
//! channel tagged with their ticket and are applied on the caller's
//! thread by [`RiskDesk::poll`].

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error};

use super::error::AnalysisError;
use super::session::{AnalysisSession, Completion, Ticket};
use super::Analyst;
use crate::models::{BudgetEntry, Projection, RiskAnalysis};
use crate::state::Snapshot;

#[derive(Debug)]
pub enum AnalysisOutcome {
    Risk(Ticket, Result<RiskAnalysis, AnalysisError>),
    Projection(Ticket, Result<Vec<Projection>, AnalysisError>),
}

pub struct RiskDesk {
    analyst: Option<Arc<dyn Analyst>>,
    handle: Handle,
    tx: UnboundedSender<AnalysisOutcome>,
    rx: UnboundedReceiver<AnalysisOutcome>,
    risk: AnalysisSession<RiskAnalysis>,
    projections: AnalysisSession<Vec<Projection>>,
}

impl RiskDesk {
    /// `analyst` is `None` when no credential is configured; requests then
    /// fail immediately with a configuration error.
    pub fn new(analyst: Option<Arc<dyn Analyst>>, handle: Handle) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            analyst,
            handle,
            tx,
            rx,
            risk: AnalysisSession::new(),
            projections: AnalysisSession::new(),
        }
    }

    pub fn risk(&self) -> &AnalysisSession<RiskAnalysis> {
        &self.risk
    }

    pub fn projections(&self) -> &AnalysisSession<Vec<Projection>> {
        &self.projections
    }

    /// Start a risk analysis. A request already in flight is superseded.
    pub fn request_analysis(&mut self, snapshot: Snapshot) -> Ticket {
        let ticket = self.risk.begin();
        let tx = self.tx.clone();

        match self.analyst.clone() {
            Some(analyst) => {
                self.handle.spawn(async move {
                    let result = analyst.analyze(&snapshot.budgets, &snapshot.investments).await;
                    let _ = tx.send(AnalysisOutcome::Risk(ticket, result));
                });
            }
            None => {
                let _ = tx.send(AnalysisOutcome::Risk(ticket, Err(missing_credential())));
            }
        }

        ticket
    }

    pub fn request_projection(&mut self, budgets: Vec<BudgetEntry>) -> Ticket {
        let ticket = self.projections.begin();
        let tx = self.tx.clone();

        match self.analyst.clone() {
            Some(analyst) => {
                self.handle.spawn(async move {
                    let result = analyst.project(&budgets).await;
                    let _ = tx.send(AnalysisOutcome::Projection(ticket, result));
                });
            }
            None => {
                let _ = tx.send(AnalysisOutcome::Projection(ticket, Err(missing_credential())));
            }
        }

        ticket
    }

    /// Forget both sessions, e.g. when the view showing them goes away.
    /// Requests still running finish in the background and are discarded.
    pub fn discard(&mut self) {
        self.risk.discard();
        self.projections.discard();
        debug!("analysis sessions discarded");
    }

    /// Apply every outcome that has arrived. Returns how many changed state.
    pub fn poll(&mut self) -> usize {
        let mut changed = 0;
        while let Ok(outcome) = self.rx.try_recv() {
            if self.apply(outcome) != Completion::Stale {
                changed += 1;
            }
        }
        changed
    }

    /// Wait for the next outcome and apply it.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        let outcome = self.rx.recv().await?;
        Some(self.apply(outcome))
    }

    fn apply(&mut self, outcome: AnalysisOutcome) -> Completion {
        match outcome {
            AnalysisOutcome::Risk(ticket, result) => {
                if let Err(e) = &result {
                    error!(?ticket, code = e.code(), error = %e, "risk analysis failed");
                }
                let completion = self.risk.complete(ticket, result);
                if completion == Completion::Stale {
                    debug!(?ticket, "discarded superseded risk analysis");
                }
                completion
            }
            AnalysisOutcome::Projection(ticket, result) => {
                if let Err(e) = &result {
                    error!(?ticket, code = e.code(), error = %e, "projection failed");
                }
                let completion = self.projections.complete(ticket, result);
                if completion == Completion::Stale {
                    debug!(?ticket, "discarded superseded projection");
                }
                completion
            }
        }
    }
}

fn missing_credential() -> AnalysisError {
    AnalysisError::config("GEMINI_API_KEY not set")
}
